//! Monte Carlo forecasts from an i.i.d. Gaussian fit of a column's history.
use crate::clean::CleanedFrame;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use tracing::warn;

pub const INSUFFICIENT_SIMULATION_DATA: &str = "Insufficient data for simulation";
pub const SIMULATION_OUT_OF_RANGE: &str = "Simulated values exceed the f64 range";

/// `num_simulations × forecast_period` trial values, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationMatrix {
    num_simulations: usize,
    forecast_period: usize,
    values: Vec<f64>,
}

impl SimulationMatrix {
    /// (rows, columns) = (trials, horizon steps).
    pub fn shape(&self) -> (usize, usize) {
        (self.num_simulations, self.forecast_period)
    }

    pub fn row(&self, trial: usize) -> Option<&[f64]> {
        if trial >= self.num_simulations {
            return None;
        }
        let start = trial * self.forecast_period;
        Some(&self.values[start..start + self.forecast_period])
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.values.chunks_exact(self.forecast_period.max(1))
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Across-trial mean and population std dev for each horizon step.
    fn step_stats(&self) -> (Vec<f64>, Vec<f64>) {
        (0..self.forecast_period)
            .map(|step| {
                let column: Vec<f64> = self.rows().map(|row| row[step]).collect();
                mean_and_std(&column)
            })
            .unzip()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    /// Fitted historical mean.
    pub historical_mean: f64,
    /// Fitted historical population std dev.
    pub historical_std_dev: f64,
    pub mean: Vec<f64>,
    pub std_dev: Vec<f64>,
    pub simulations: SimulationMatrix,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimulationResult {
    Forecast(Forecast),
    InsufficientData,
    /// The fit is finite but some trial draws overflowed to ±inf.
    OutOfRange,
}

impl SimulationResult {
    pub fn forecast(&self) -> Option<&Forecast> {
        match self {
            SimulationResult::Forecast(f) => Some(f),
            SimulationResult::InsufficientData | SimulationResult::OutOfRange => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastSimulator {
    pub num_simulations: usize,
    pub forecast_period: usize,
}

impl Default for ForecastSimulator {
    fn default() -> Self {
        Self {
            num_simulations: 1000,
            forecast_period: 10,
        }
    }
}

impl ForecastSimulator {
    pub fn new(num_simulations: usize, forecast_period: usize) -> Self {
        Self {
            num_simulations,
            forecast_period,
        }
    }

    /// Simulate from `history`. NaN / infinite entries are ignored; fewer
    /// than two remaining values gives [`SimulationResult::InsufficientData`].
    pub fn simulate<R: Rng + ?Sized>(&self, history: &[f64], rng: &mut R) -> SimulationResult {
        let observed: Vec<f64> = history.iter().copied().filter(|v| v.is_finite()).collect();
        if observed.len() < 2 {
            return SimulationResult::InsufficientData;
        }

        let (mean, std_dev) = mean_and_std(&observed);
        let normal = match Normal::new(mean, std_dev) {
            Ok(n) => n,
            Err(e) => {
                warn!(mean, std_dev, error = %e, "cannot build normal distribution");
                return SimulationResult::InsufficientData;
            }
        };

        let values: Vec<f64> = (0..self.num_simulations * self.forecast_period)
            .map(|_| normal.sample(&mut *rng))
            .collect();
        if values.iter().any(|v| !v.is_finite()) {
            warn!(mean, std_dev, "simulated values overflow f64");
            return SimulationResult::OutOfRange;
        }
        let simulations = SimulationMatrix {
            num_simulations: self.num_simulations,
            forecast_period: self.forecast_period,
            values,
        };
        let (step_mean, step_std) = simulations.step_stats();

        SimulationResult::Forecast(Forecast {
            historical_mean: mean,
            historical_std_dev: std_dev,
            mean: step_mean,
            std_dev: step_std,
            simulations,
        })
    }

    /// [`simulate`](Self::simulate) on a frame column; `None` if the column
    /// isn't in the frame.
    pub fn simulate_column<R: Rng + ?Sized>(
        &self,
        frame: &CleanedFrame,
        variable: &str,
        rng: &mut R,
    ) -> Option<SimulationResult> {
        let history = frame.column_values(variable)?;
        Some(self.simulate(&history, rng))
    }
}

/// Mean and population (ddof = 0) standard deviation of finite values.
///
/// Accumulates on values scaled by the largest magnitude, so neither sums
/// nor squares overflow even near `f64::MAX`.
fn mean_and_std(xs: &[f64]) -> (f64, f64) {
    let scale = xs.iter().fold(0.0_f64, |m, x| m.max(x.abs()));
    if scale == 0.0 {
        return (0.0, 0.0);
    }
    let n = xs.len() as f64;
    let mean = xs.iter().map(|x| x / scale).sum::<f64>() / n;
    let var = xs
        .iter()
        .map(|x| {
            let d = x / scale - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    (mean * scale, var.sqrt() * scale)
}
