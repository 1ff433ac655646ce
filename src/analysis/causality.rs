//! Pairwise Granger causality over every ordered pair of frame variables.
//!
//! For each lag depth p the test compares two regressions of the effect
//! series: one on its own p lags (restricted) and one that also sees the
//! cause's p lags (unrestricted). The ssr-based F statistic
//! `((SSR_r - SSR_u) / SSR_u) * (df_u / p)` is referred to F(p, df_u).

use super::ols::{self, OlsError};
use crate::clean::CleanedFrame;
use indexmap::IndexMap;
use rayon::prelude::*;
use statrs::distribution::{ContinuousCDF, FisherSnedecor};
use std::fmt;
use thiserror::Error;
use tracing::{debug, instrument};

/// Separator between cause and effect in result keys.
pub const CAUSES: &str = " causes ";

/// An unrestricted SSR this small relative to Σy² leaves F undefined.
const PERFECT_FIT_TOLERANCE: f64 = 1e-20;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CausalityError {
    #[error(
        "Insufficient observations. Maximum allowable lag is {max_allowed} \
         ({observations} observations, max lag {max_lag})"
    )]
    InsufficientObservations {
        observations: usize,
        max_lag: usize,
        max_allowed: i64,
    },
    #[error("singular regression at lag {lag}: {source}")]
    SingularMatrix { lag: usize, source: OlsError },
    #[error("lagged regressor {column} is constant at lag {lag}")]
    ConstantRegressor { lag: usize, column: usize },
    #[error("perfect fit at lag {lag}; F statistic is undefined")]
    PerfectFit { lag: usize },
    #[error("non-finite F statistic at lag {lag}")]
    NonFinite { lag: usize },
    #[error("F distribution: {0}")]
    Distribution(String),
}

/// Ordered (cause, effect) pair of distinct columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariablePair {
    pub cause: String,
    pub effect: String,
}

impl VariablePair {
    pub fn new(cause: impl Into<String>, effect: impl Into<String>) -> Self {
        Self {
            cause: cause.into(),
            effect: effect.into(),
        }
    }

    /// `"<cause> causes <effect>"`.
    pub fn key(&self) -> String {
        format!("{}{}{}", self.cause, CAUSES, self.effect)
    }

    /// Inverse of [`VariablePair::key`]; splits on the first `" causes "`.
    pub fn from_key(key: &str) -> Option<Self> {
        let (cause, effect) = key.split_once(CAUSES)?;
        Some(Self::new(cause, effect))
    }
}

impl fmt::Display for VariablePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.cause, CAUSES, self.effect)
    }
}

/// Outcome for one pair: p-values for lags 1..=max_lag, or why there are none.
#[derive(Debug, Clone, PartialEq)]
pub enum CausalityResult {
    PValues(Vec<f64>),
    Failed(String),
}

impl CausalityResult {
    pub fn p_values(&self) -> Option<&[f64]> {
        match self {
            CausalityResult::PValues(p) => Some(p),
            CausalityResult::Failed(_) => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, CausalityResult::Failed(_))
    }
}

impl From<Result<Vec<LagTest>, CausalityError>> for CausalityResult {
    fn from(res: Result<Vec<LagTest>, CausalityError>) -> Self {
        match res {
            Ok(tests) => CausalityResult::PValues(tests.iter().map(|t| round4(t.p_value)).collect()),
            Err(e) => CausalityResult::Failed(e.to_string()),
        }
    }
}

/// One lag depth of the ssr F test.
#[derive(Debug, Clone, PartialEq)]
pub struct LagTest {
    pub lag: usize,
    pub f_statistic: f64,
    pub p_value: f64,
    pub df_num: usize,
    pub df_denom: usize,
}

/// Does `cause` help predict `effect`? Runs lags 1..=max_lag.
///
/// Observations where either series is NaN are dropped first. Fails as a
/// whole if any lag can't be evaluated.
///
/// The pair labelled `"A causes B"` calls this with `cause = A` and
/// `effect = B`. statsmodels' `grangercausalitytests` fed the columns
/// `[A, B]` tests B → A instead, so reports built that way under the same
/// label carry different p-values.
pub fn granger_test(
    effect: &[f64],
    cause: &[f64],
    max_lag: usize,
) -> Result<Vec<LagTest>, CausalityError> {
    let (effect, cause): (Vec<f64>, Vec<f64>) = effect
        .iter()
        .zip(cause)
        .filter(|(e, c)| !e.is_nan() && !c.is_nan())
        .map(|(&e, &c)| (e, c))
        .unzip();
    let n = effect.len();

    let needed = max_lag.checked_mul(3).and_then(|m| m.checked_add(1));
    if needed.map_or(true, |needed| n <= needed) {
        return Err(CausalityError::InsufficientObservations {
            observations: n,
            max_lag,
            max_allowed: (n as i64 - 1) / 3 - 1,
        });
    }

    (1..=max_lag)
        .map(|lag| test_single_lag(&effect, &cause, lag))
        .collect()
}

fn test_single_lag(effect: &[f64], cause: &[f64], lag: usize) -> Result<LagTest, CausalityError> {
    let n = effect.len();
    let y: Vec<f64> = effect[lag..].to_vec();

    // restricted:   1, effect[t-1..t-lag]
    // unrestricted: 1, effect[t-1..t-lag], cause[t-1..t-lag]
    let mut restricted = Vec::with_capacity(n - lag);
    let mut unrestricted = Vec::with_capacity(n - lag);
    for t in lag..n {
        let mut row = Vec::with_capacity(1 + 2 * lag);
        row.push(1.0);
        row.extend((1..=lag).map(|l| effect[t - l]));
        restricted.push(row.clone());
        row.extend((1..=lag).map(|l| cause[t - l]));
        unrestricted.push(row);
    }

    // lagged columns only; the intercept sits at index 0
    let width = 1 + 2 * lag;
    if let Some(column) = (1..width).find(|&j| is_constant(unrestricted.iter().map(|row| row[j]))) {
        return Err(CausalityError::ConstantRegressor { lag, column });
    }

    let singular = |source| CausalityError::SingularMatrix { lag, source };
    let fit_u = ols::fit(&unrestricted, &y).map_err(singular)?;
    let fit_r = ols::fit(&restricted, &y).map_err(singular)?;

    let scale: f64 = y.iter().map(|v| v * v).sum();
    if fit_u.ssr <= PERFECT_FIT_TOLERANCE * scale {
        return Err(CausalityError::PerfectFit { lag });
    }

    let df_denom = fit_u.df_resid;
    let f_statistic =
        (((fit_r.ssr - fit_u.ssr) / fit_u.ssr) * (df_denom as f64 / lag as f64)).max(0.0);
    if !f_statistic.is_finite() {
        return Err(CausalityError::NonFinite { lag });
    }

    let dist = FisherSnedecor::new(lag as f64, df_denom as f64)
        .map_err(|e| CausalityError::Distribution(e.to_string()))?;
    Ok(LagTest {
        lag,
        f_statistic,
        p_value: dist.sf(f_statistic),
        df_num: lag,
        df_denom,
    })
}

fn is_constant(mut values: impl Iterator<Item = f64>) -> bool {
    match values.next() {
        Some(first) => values.all(|v| v == first),
        None => true,
    }
}

fn round4(p: f64) -> f64 {
    (p * 10_000.0).round() / 10_000.0
}

/// Runs [`granger_test`] for every ordered pair of a frame's variables.
#[derive(Debug, Clone, Copy)]
pub struct CausalityAnalyzer {
    pub max_lag: usize,
    pub parallel: bool,
}

impl CausalityAnalyzer {
    pub fn new(max_lag: usize) -> Self {
        Self {
            max_lag,
            parallel: false,
        }
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Every ordered pair of distinct non-time-axis columns, row-major over
    /// frame column order.
    pub fn pairs(frame: &CleanedFrame) -> Vec<VariablePair> {
        let vars = frame.variables();
        let mut pairs = Vec::with_capacity(vars.len() * vars.len().saturating_sub(1));
        for cause in &vars {
            for effect in &vars {
                if cause != effect {
                    pairs.push(VariablePair::new(cause.as_str(), effect.as_str()));
                }
            }
        }
        pairs
    }

    /// One entry per ordered pair, in [`CausalityAnalyzer::pairs`] order
    /// regardless of `parallel`. Keys are the pairs themselves, so column
    /// names containing `" causes "` can't collide.
    #[instrument(level = "debug", skip_all, fields(max_lag = self.max_lag, rows = frame.num_rows()))]
    pub fn analyze(&self, frame: &CleanedFrame) -> IndexMap<VariablePair, CausalityResult> {
        let columns: IndexMap<String, Vec<f64>> = frame
            .variables()
            .into_iter()
            .filter_map(|v| frame.column_values(&v).map(|vals| (v, vals)))
            .collect();
        let pairs = Self::pairs(frame);

        let run = |pair: &VariablePair| -> (VariablePair, CausalityResult) {
            let result = match (columns.get(&pair.effect), columns.get(&pair.cause)) {
                (Some(effect), Some(cause)) => granger_test(effect, cause, self.max_lag).into(),
                _ => CausalityResult::Failed(format!("missing column for {}", pair)),
            };
            if let CausalityResult::Failed(reason) = &result {
                debug!(pair = %pair, %reason, "causality test failed");
            }
            (pair.clone(), result)
        };

        let results: Vec<(VariablePair, CausalityResult)> = if self.parallel {
            pairs.par_iter().map(run).collect()
        } else {
            pairs.iter().map(run).collect()
        };
        results.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clean::clean;
    use crate::sheet::RawSheet;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use rand_distr::StandardNormal;

    fn frame(columns: &[(&str, Vec<f64>)]) -> CleanedFrame {
        let n = columns[0].1.len();
        let mut rows = vec![std::iter::once("Year".to_string())
            .chain(columns.iter().map(|(name, _)| name.to_string()))
            .collect::<Vec<_>>()];
        for i in 0..n {
            let mut row = vec![(2000 + i).to_string()];
            row.extend(columns.iter().map(|(_, vals)| vals[i].to_string()));
            rows.push(row);
        }
        clean(&RawSheet::new(Vec::new(), rows))
    }

    fn driven_series(n: usize, seed: u64) -> (Vec<f64>, Vec<f64>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let x: Vec<f64> = (0..n).map(|_| rng.sample(StandardNormal)).collect();
        let mut y = vec![0.0; n];
        for t in 1..n {
            let noise: f64 = rng.sample(StandardNormal);
            y[t] = 0.9 * x[t - 1] + 0.1 * noise;
        }
        (x, y)
    }

    fn pair(cause: &str, effect: &str) -> VariablePair {
        VariablePair::new(cause, effect)
    }

    #[test]
    fn key_round_trips() {
        let pair = VariablePair::new("Total housing units", "Occupied units");
        assert_eq!(pair.key(), "Total housing units causes Occupied units");
        assert_eq!(VariablePair::from_key(&pair.key()), Some(pair));
        assert_eq!(VariablePair::from_key("no separator"), None);
    }

    #[test]
    fn detects_lagged_driver() {
        let (x, y) = driven_series(80, 7);
        let tests = granger_test(&y, &x, 3).unwrap();
        assert_eq!(tests.iter().map(|t| t.lag).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(tests.iter().all(|t| t.p_value < 0.05));
        assert_eq!(tests[1].df_num, 2);
        assert_eq!(tests[1].df_denom, 80 - 2 - 2 * 2 - 1);
    }

    #[test]
    fn driver_direction_is_stronger() {
        let (x, y) = driven_series(80, 11);
        let forward = granger_test(&y, &x, 1).unwrap();
        let backward = granger_test(&x, &y, 1).unwrap();
        assert!(forward[0].f_statistic > backward[0].f_statistic);
    }

    #[test]
    fn too_many_lags_for_the_data() {
        let series: Vec<f64> = (0..10).map(|i| (i as f64).sin()).collect();
        let err = granger_test(&series, &series, 3).unwrap_err();
        assert_eq!(
            err,
            CausalityError::InsufficientObservations {
                observations: 10,
                max_lag: 3,
                max_allowed: 2
            }
        );
        assert!(err.to_string().starts_with("Insufficient observations"));
    }

    #[test]
    fn huge_max_lag_is_insufficient_not_a_panic() {
        let series: Vec<f64> = (0..30).map(|i| (i as f64).cos()).collect();
        let err = granger_test(&series, &series, usize::MAX).unwrap_err();
        assert!(matches!(
            err,
            CausalityError::InsufficientObservations { observations: 30, max_allowed: 8, .. }
        ));
    }

    #[test]
    fn trending_cause_is_still_tested() {
        let mut rng = StdRng::seed_from_u64(21);
        let effect: Vec<f64> = (0..20).map(|_| rng.sample::<f64, _>(StandardNormal)).collect();
        let trend: Vec<f64> = (0..20).map(|i| 1000.0 + 5.0 * i as f64).collect();

        let tests = granger_test(&effect, &trend, 3).unwrap();
        assert_eq!(tests.len(), 3);
        assert!(tests.iter().all(|t| (0.0..=1.0).contains(&t.p_value)));

        let results = CausalityAnalyzer::new(3).analyze(&frame(&[("E", effect), ("T", trend)]));
        assert!(results[&pair("T", "E")].p_values().is_some());
    }

    #[test]
    fn constant_regressor_fails_the_pair() {
        let (x, _) = driven_series(20, 2);
        let flat = vec![7.5; 20];
        assert!(matches!(
            granger_test(&x, &flat, 1),
            Err(CausalityError::ConstantRegressor { lag: 1, column: 2 })
        ));
    }

    #[test]
    fn names_containing_the_separator_do_not_collide() {
        let mut rng = StdRng::seed_from_u64(17);
        let mut col = || -> Vec<f64> { (0..30).map(|_| rng.sample(StandardNormal)).collect() };
        let columns = [
            ("A", col()),
            ("B causes C", col()),
            ("A causes B", col()),
            ("C", col()),
        ];
        let results = CausalityAnalyzer::new(1).analyze(&frame(&columns));
        assert_eq!(results.len(), 12);
        assert!(results.contains_key(&pair("A", "B causes C")));
        assert!(results.contains_key(&pair("A causes B", "C")));
        assert_eq!(pair("A", "B causes C").key(), pair("A causes B", "C").key());
    }

    #[test]
    fn analyze_covers_every_ordered_pair_in_order() {
        let (x, y) = driven_series(40, 3);
        let z: Vec<f64> = x.iter().zip(&y).map(|(a, b)| a - b).collect();
        let results = CausalityAnalyzer::new(2).analyze(&frame(&[("X", x), ("Y", y), ("Z", z)]));
        let keys: Vec<String> = results.keys().map(VariablePair::key).collect();
        assert_eq!(
            keys,
            vec![
                "X causes Y",
                "X causes Z",
                "Y causes X",
                "Y causes Z",
                "Z causes X",
                "Z causes Y"
            ]
        );
        for result in results.values() {
            if let Some(p) = result.p_values() {
                assert_eq!(p.len(), 2);
                assert!(p.iter().all(|v| (0.0..=1.0).contains(v)));
            }
        }
    }

    #[test]
    fn one_failing_pair_does_not_stop_the_rest() {
        let (x, y) = driven_series(40, 5);
        let constant = vec![4.0; 40];
        let results =
            CausalityAnalyzer::new(2).analyze(&frame(&[("X", x), ("Y", y), ("C", constant)]));
        assert_eq!(results.len(), 6);
        assert!(results[&pair("X", "C")].is_failure());
        assert!(results[&pair("C", "X")].is_failure());
        assert!(results[&pair("X", "Y")].p_values().is_some());
        assert!(results[&pair("Y", "X")].p_values().is_some());
    }

    #[test]
    fn collinear_pair_yields_both_keys() {
        let a: Vec<f64> = (1..=12).map(f64::from).collect();
        let b: Vec<f64> = a.iter().map(|v| 2.0 * v).collect();
        let results = CausalityAnalyzer::new(3).analyze(&frame(&[("A", a), ("B", b)]));
        for key in [pair("A", "B"), pair("B", "A")] {
            match &results[&key] {
                CausalityResult::PValues(p) => assert!(p.iter().all(|v| *v < 0.05)),
                CausalityResult::Failed(reason) => assert!(!reason.is_empty()),
            }
        }
    }

    #[test]
    fn parallel_matches_sequential() {
        let (x, y) = driven_series(50, 9);
        let f = frame(&[("X", x), ("Y", y)]);
        let seq = CausalityAnalyzer::new(3).analyze(&f);
        let par = CausalityAnalyzer::new(3).with_parallel(true).analyze(&f);
        assert_eq!(seq, par);
    }

    #[test]
    fn p_values_are_rounded() {
        let (x, y) = driven_series(60, 13);
        let z: Vec<f64> = y.iter().rev().copied().collect();
        let results = CausalityAnalyzer::new(2).analyze(&frame(&[("X", x), ("Z", z)]));
        for p in results.values().filter_map(CausalityResult::p_values).flatten() {
            assert_eq!(*p, round4(*p));
        }
    }
}
