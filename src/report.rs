//! Console rendering of an [`AnalysisReport`]. Formatting only.
use crate::analysis::{CausalityResult, SimulationResult};
use crate::analysis::simulation::{INSUFFICIENT_SIMULATION_DATA, SIMULATION_OUT_OF_RANGE};
use crate::pipeline::{AnalysisReport, SheetResult};
use std::fmt;

/// p-values below this are flagged significant.
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

const WIDTH: usize = 60;

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "=".repeat(WIDTH))?;
        writeln!(f, "{:^width$}", "ANALYSIS RESULTS", width = WIDTH)?;
        writeln!(f, "{}", "=".repeat(WIDTH))?;

        for (sheet, result) in self.iter() {
            writeln!(f, "\nSheet: {}", sheet)?;
            writeln!(f, "{}", "-".repeat(WIDTH))?;

            if let Some(diag) = self.diagnostics.get(sheet) {
                for dropped in &diag.dropped_columns {
                    writeln!(f, "  Dropped column: {} ({})", dropped.name, dropped.reason)?;
                }
            }

            match result {
                SheetResult::InsufficientData { usable_rows, min_rows } => {
                    writeln!(
                        f,
                        "  Error: {} ({} usable rows, need {})",
                        crate::pipeline::INSUFFICIENT_DATA_FOR_ANALYSIS,
                        usable_rows,
                        min_rows
                    )?;
                }
                SheetResult::Analyzed { causality, simulations } => {
                    writeln!(f, "\n  Granger Causality Tests:")?;
                    for (pair, outcome) in causality {
                        writeln!(f, "    {}", pair)?;
                        write_causality(f, outcome)?;
                    }

                    writeln!(f, "\n  Monte Carlo Simulations:")?;
                    for (variable, outcome) in simulations {
                        writeln!(f, "    Variable: {}", variable)?;
                        write_simulation(f, outcome)?;
                    }
                }
            }
        }
        Ok(())
    }
}

fn write_causality(f: &mut fmt::Formatter<'_>, outcome: &CausalityResult) -> fmt::Result {
    match outcome {
        CausalityResult::Failed(reason) => writeln!(f, "      Error: {}", reason),
        CausalityResult::PValues(p_values) => {
            for (lag, p) in p_values.iter().enumerate() {
                let flag = if is_significant(*p) { " (significant)" } else { "" };
                writeln!(f, "      Lag {}: p = {:.4}{}", lag + 1, p, flag)?;
            }
            Ok(())
        }
    }
}

fn write_simulation(f: &mut fmt::Formatter<'_>, outcome: &SimulationResult) -> fmt::Result {
    match outcome {
        SimulationResult::InsufficientData => writeln!(f, "      {}", INSUFFICIENT_SIMULATION_DATA),
        SimulationResult::OutOfRange => writeln!(f, "      {}", SIMULATION_OUT_OF_RANGE),
        SimulationResult::Forecast(forecast) => {
            writeln!(f, "      Forecast Mean: {}", Rounded(&forecast.mean))?;
            writeln!(f, "      Forecast Std Dev: {}", Rounded(&forecast.std_dev))?;
            let (rows, cols) = forecast.simulations.shape();
            writeln!(f, "      Simulations Shape: ({}, {})", rows, cols)
        }
    }
}

pub fn is_significant(p_value: f64) -> bool {
    p_value < SIGNIFICANCE_LEVEL
}

/// `[1.00 2.50 3.25]`
struct Rounded<'a>(&'a [f64]);

impl fmt::Display for Rounded<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:.2}", v)?;
        }
        write!(f, "]")
    }
}

/// Print the report to stdout.
pub fn print_report(report: &AnalysisReport) {
    println!("{}", report);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ForecastSimulator, VariablePair};
    use crate::clean::{CleaningDiagnostics, DropReason, DroppedColumn};
    use indexmap::IndexMap;
    use rand::{rngs::StdRng, SeedableRng};

    fn sample_report() -> AnalysisReport {
        let forecast = ForecastSimulator::new(4, 3)
            .simulate(&[10.0, 10.0], &mut StdRng::seed_from_u64(0));
        let mut report = AnalysisReport::default();
        report.sheets.insert(
            "Table 1".into(),
            SheetResult::Analyzed {
                causality: IndexMap::from([
                    (VariablePair::new("A", "B"), CausalityResult::PValues(vec![0.0123, 0.5])),
                    (VariablePair::new("B", "A"), CausalityResult::Failed("singular".into())),
                ]),
                simulations: IndexMap::from([
                    ("A".to_string(), forecast),
                    ("B".to_string(), SimulationResult::InsufficientData),
                ]),
            },
        );
        report.sheets.insert(
            "Table 2".into(),
            SheetResult::InsufficientData { usable_rows: 3, min_rows: 10 },
        );
        report.diagnostics.insert(
            "Table 1".into(),
            CleaningDiagnostics {
                dropped_columns: vec![DroppedColumn {
                    name: "Notes".into(),
                    reason: DropReason::NonNumeric,
                }],
                ..CleaningDiagnostics::default()
            },
        );
        report
    }

    #[test]
    fn renders_every_section() {
        let text = sample_report().to_string();
        assert!(text.starts_with(&"=".repeat(60)));
        assert!(text.contains("ANALYSIS RESULTS"));
        assert!(text.contains("Sheet: Table 1"));
        assert!(text.contains("  Dropped column: Notes (no numeric values)"));
        assert!(text.contains("      Lag 1: p = 0.0123 (significant)\n"));
        assert!(text.contains("      Lag 2: p = 0.5000\n"));
        assert!(text.contains("    B causes A\n      Error: singular"));
        assert!(text.contains("      Forecast Mean: [10.00 10.00 10.00]"));
        assert!(text.contains("      Forecast Std Dev: [0.00 0.00 0.00]"));
        assert!(text.contains("      Simulations Shape: (4, 3)"));
        assert!(text.contains("    Variable: B\n      Insufficient data for simulation"));
        assert!(text.contains("  Error: Insufficient data for analysis (3 usable rows, need 10)"));
    }

    #[test]
    fn significance_threshold_is_strict() {
        assert!(is_significant(0.0499));
        assert!(!is_significant(0.05));
    }

    #[test]
    fn sheets_render_in_report_order() {
        let text = sample_report().to_string();
        let first = text.find("Sheet: Table 1").unwrap();
        let second = text.find("Sheet: Table 2").unwrap();
        assert!(first < second);
    }
}
