// src/config.rs
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::{fs, path::Path};

/// Tuning knobs for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Deepest lag tested for every variable pair.
    pub max_lag: usize,
    /// Monte Carlo trials per variable.
    pub num_simulations: usize,
    /// Forecast horizon, in time-axis steps.
    pub forecast_period: usize,
    /// Minimum usable rows for a sheet to be analyzed.
    pub min_rows: usize,
    /// Fan sheets and variable pairs out over the rayon pool.
    pub parallel: bool,
    /// Fixed seed for reproducible simulations.
    pub seed: Option<u64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_lag: 3,
            num_simulations: 1000,
            forecast_period: 10,
            min_rows: 10,
            parallel: false,
            seed: None,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_lag == 0 {
            bail!("max_lag must be at least 1");
        }
        if self.num_simulations == 0 {
            bail!("num_simulations must be at least 1");
        }
        if self.forecast_period == 0 {
            bail!("forecast_period must be at least 1");
        }
        Ok(())
    }
}

/// What the `sheetscope` binary reads from its YAML file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Glob of CSV files; each file is one sheet.
    pub input: String,
    /// Variables to forecast wherever they survive cleaning.
    pub key_variables: Vec<String>,
    #[serde(flatten)]
    pub analysis: AnalysisConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input: "sheets/*.csv".into(),
            key_variables: vec!["Total housing units".into(), "Occupied units".into()],
            analysis: AnalysisConfig::default(),
        }
    }
}

impl RunConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let cfg: RunConfig = serde_yaml::from_str(yaml).context("Failed to parse run config")?;
        cfg.analysis.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config: {:?}", path.as_ref()))?;
        Self::from_yaml_str(&text).with_context(|| format!("Invalid config: {:?}", path.as_ref()))
    }
}
