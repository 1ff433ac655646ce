// src/pipeline.rs
//! Per-sheet orchestration: clean → validate → (causality ∧ simulation).
use crate::analysis::{
    CausalityAnalyzer, CausalityResult, ForecastSimulator, SimulationResult, VariablePair,
};
use crate::clean::{clean_with_diagnostics, CleaningDiagnostics};
use crate::config::AnalysisConfig;
use crate::sheet::RawSheet;
use crate::validate;
use anyhow::Result;
use indexmap::{IndexMap, IndexSet};
use rand::{rngs::StdRng, SeedableRng};
use rayon::prelude::*;
use std::time::Instant;
use tracing::{info, instrument, warn};

pub const INSUFFICIENT_DATA_FOR_ANALYSIS: &str = "Insufficient data for analysis";

/// Outcome for one sheet.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetResult {
    /// Too few usable rows after cleaning; neither analyzer ran.
    InsufficientData { usable_rows: usize, min_rows: usize },
    Analyzed {
        /// One entry per ordered pair, in canonical pair order.
        causality: IndexMap<VariablePair, CausalityResult>,
        /// Requested key variables that survived cleaning, in request order.
        simulations: IndexMap<String, SimulationResult>,
    },
}

impl SheetResult {
    /// The sheet-level failure message, if the sheet wasn't analyzed.
    pub fn failure(&self) -> Option<&'static str> {
        match self {
            SheetResult::InsufficientData { .. } => Some(INSUFFICIENT_DATA_FOR_ANALYSIS),
            SheetResult::Analyzed { .. } => None,
        }
    }

    pub fn causality(&self) -> Option<&IndexMap<VariablePair, CausalityResult>> {
        match self {
            SheetResult::Analyzed { causality, .. } => Some(causality),
            SheetResult::InsufficientData { .. } => None,
        }
    }

    pub fn simulations(&self) -> Option<&IndexMap<String, SimulationResult>> {
        match self {
            SheetResult::Analyzed { simulations, .. } => Some(simulations),
            SheetResult::InsufficientData { .. } => None,
        }
    }
}

/// Everything a run produced, in input sheet order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisReport {
    pub sheets: IndexMap<String, SheetResult>,
    /// What cleaning dropped from each sheet.
    pub diagnostics: IndexMap<String, CleaningDiagnostics>,
}

impl AnalysisReport {
    pub fn get(&self, sheet: &str) -> Option<&SheetResult> {
        self.sheets.get(sheet)
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SheetResult)> {
        self.sheets.iter()
    }
}

impl std::ops::Index<&str> for AnalysisReport {
    type Output = SheetResult;

    fn index(&self, sheet: &str) -> &SheetResult {
        &self.sheets[sheet]
    }
}

pub struct SheetPipeline {
    config: AnalysisConfig,
    causality: CausalityAnalyzer,
    simulator: ForecastSimulator,
}

impl SheetPipeline {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            causality: CausalityAnalyzer::new(config.max_lag).with_parallel(config.parallel),
            simulator: ForecastSimulator::new(config.num_simulations, config.forecast_period),
            config,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze every sheet. Never fails: each sheet, pair and variable
    /// failure is recorded in the report instead.
    pub fn run(&self, sheets: &IndexMap<String, RawSheet>, key_variables: &[String]) -> AnalysisReport {
        let start = Instant::now();
        let keys: Vec<String> = key_variables
            .iter()
            .cloned()
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect();
        let indexed: Vec<(usize, (&String, &RawSheet))> = sheets.iter().enumerate().collect();

        let process = |&(idx, (id, sheet)): &(usize, (&String, &RawSheet))| {
            let (result, diag) = self.run_sheet(idx, id, sheet, &keys);
            (id.clone(), result, diag)
        };
        let outcomes: Vec<(String, SheetResult, CleaningDiagnostics)> = if self.config.parallel {
            indexed.par_iter().map(process).collect()
        } else {
            indexed.iter().map(process).collect()
        };

        let mut report = AnalysisReport::default();
        for (id, result, diag) in outcomes {
            report.diagnostics.insert(id.clone(), diag);
            report.sheets.insert(id, result);
        }
        info!(sheets = report.len(), elapsed = ?start.elapsed(), "analysis complete");
        report
    }

    /// Clean, validate and analyze a single sheet. `index` is the sheet's
    /// position in the run and only feeds seed derivation.
    #[instrument(level = "info", skip(self, sheet, key_variables), fields(sheet = %id))]
    pub fn run_sheet(
        &self,
        index: usize,
        id: &str,
        sheet: &RawSheet,
        key_variables: &[String],
    ) -> (SheetResult, CleaningDiagnostics) {
        let (frame, diag) = clean_with_diagnostics(sheet);

        let usable_rows = validate::usable_rows(&frame);
        if usable_rows < self.config.min_rows {
            warn!(usable_rows, min_rows = self.config.min_rows, "{}", INSUFFICIENT_DATA_FOR_ANALYSIS);
            let result = SheetResult::InsufficientData {
                usable_rows,
                min_rows: self.config.min_rows,
            };
            return (result, diag);
        }

        let causality = self.causality.analyze(&frame);

        let mut simulations = IndexMap::new();
        for (var_idx, var) in key_variables.iter().enumerate() {
            let mut rng = self.rng_for(index, var_idx);
            if let Some(result) = self.simulator.simulate_column(&frame, var, &mut rng) {
                simulations.insert(var.clone(), result);
            }
        }

        let failed_pairs = causality.values().filter(|r| r.is_failure()).count();
        info!(
            rows = frame.num_rows(),
            variables = frame.variables().len(),
            pairs = causality.len(),
            failed_pairs,
            simulated = simulations.len(),
            "sheet analyzed"
        );
        (SheetResult::Analyzed { causality, simulations }, diag)
    }

    fn rng_for(&self, sheet_idx: usize, var_idx: usize) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(mix_seed(seed, sheet_idx, var_idx)),
            None => StdRng::from_entropy(),
        }
    }
}

fn mix_seed(seed: u64, sheet_idx: usize, var_idx: usize) -> u64 {
    seed ^ (sheet_idx as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (var_idx as u64).wrapping_add(1).wrapping_mul(0xC2B2_AE3D_27D4_EB4F)
}
