//! Statistical analyzers run over a cleaned frame.
pub mod causality;
pub mod ols;
pub mod simulation;

pub use causality::{granger_test, CausalityAnalyzer, CausalityError, CausalityResult, VariablePair};
pub use simulation::{Forecast, ForecastSimulator, SimulationMatrix, SimulationResult};
