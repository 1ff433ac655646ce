//! Ordinary least squares through the SVD pseudo-inverse.
//!
//! Collinear regressors don't fail the fit: the minimum-norm solution is
//! used and the residual degrees of freedom follow the numerical rank.
use nalgebra::{DMatrix, DVector};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OlsError {
    #[error("need more observations than regressors ({rows} rows, {cols} columns)")]
    Underdetermined { rows: usize, cols: usize },
    #[error("SVD solve failed: {0}")]
    Decomposition(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeastSquares {
    pub coefficients: Vec<f64>,
    /// Residual sum of squares.
    pub ssr: f64,
    /// Numerical rank of the design.
    pub rank: usize,
    /// Observations minus rank.
    pub df_resid: usize,
}

/// Fit `y ≈ X β`. `design` is row-major with one `Vec` per observation.
pub fn fit(design: &[Vec<f64>], y: &[f64]) -> Result<LeastSquares, OlsError> {
    let n = design.len().min(y.len());
    let k = design.first().map_or(0, Vec::len);
    if n <= k || k == 0 {
        return Err(OlsError::Underdetermined { rows: n, cols: k });
    }

    let x = DMatrix::from_fn(n, k, |i, j| design[i][j]);
    let yv = DVector::from_column_slice(&y[..n]);

    let svd = x.clone().svd(true, true);
    // numpy's matrix_rank / pinv cutoff
    let tol = svd.singular_values.max() * n.max(k) as f64 * f64::EPSILON;
    let rank = svd.rank(tol);
    let beta = svd.solve(&yv, tol).map_err(OlsError::Decomposition)?;

    let residuals = &yv - &x * &beta;
    Ok(LeastSquares {
        coefficients: beta.iter().copied().collect(),
        ssr: residuals.norm_squared(),
        rank,
        df_resid: n - rank,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn recovers_exact_line() {
        let design: Vec<Vec<f64>> = (0..6).map(|i| vec![1.0, i as f64]).collect();
        let y: Vec<f64> = (0..6).map(|i| 3.0 + 2.0 * i as f64).collect();
        let fit = fit(&design, &y).unwrap();
        assert!(approx(fit.coefficients[0], 3.0));
        assert!(approx(fit.coefficients[1], 2.0));
        assert!(fit.ssr < 1e-12);
        assert_eq!(fit.rank, 2);
        assert_eq!(fit.df_resid, 4);
    }

    #[test]
    fn residuals_match_direct_computation() {
        let xs = [1.0, 2.0, 4.0, 5.0, 7.0];
        let ys = [1.0, 3.0, 2.0, 6.0, 5.0];
        let design: Vec<Vec<f64>> = xs.iter().map(|&x| vec![1.0, x]).collect();
        let fit = fit(&design, &ys).unwrap();
        let direct: f64 = xs
            .iter()
            .zip(ys)
            .map(|(&x, y)| {
                let r = y - (fit.coefficients[0] + fit.coefficients[1] * x);
                r * r
            })
            .sum();
        assert!(approx(fit.ssr, direct));
    }

    #[test]
    fn collinear_columns_still_fit() {
        let y: Vec<f64> = (0..8).map(|i| (i * i) as f64).collect();
        let full: Vec<Vec<f64>> = (0..8).map(|i| vec![1.0, i as f64, 2.0 * i as f64]).collect();
        let reduced: Vec<Vec<f64>> = (0..8).map(|i| vec![1.0, i as f64]).collect();

        let with_dup = fit(&full, &y).unwrap();
        let without = fit(&reduced, &y).unwrap();
        assert_eq!(with_dup.rank, 2);
        assert_eq!(with_dup.df_resid, 6);
        assert!((with_dup.ssr - without.ssr).abs() < 1e-8 * without.ssr);
    }

    #[test]
    fn too_few_rows() {
        let design = vec![vec![1.0, 2.0], vec![1.0, 3.0]];
        assert!(matches!(
            fit(&design, &[1.0, 2.0]),
            Err(OlsError::Underdetermined { rows: 2, cols: 2 })
        ));
    }
}
