pub mod analysis;
pub mod clean;
pub mod config;
pub mod pipeline;
pub mod report;
pub mod sheet;
pub mod validate;
pub mod vulnerability;

pub use clean::{clean, clean_with_diagnostics, CleanedFrame, CleaningDiagnostics};
pub use config::{AnalysisConfig, RunConfig};
pub use pipeline::{AnalysisReport, SheetPipeline, SheetResult};
pub use sheet::RawSheet;
