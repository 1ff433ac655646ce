use anyhow::{bail, Result};
use sheetscope::{report::print_report, sheet::load_sheets, RunConfig, SheetPipeline};
use std::{env, path::Path, time::Instant};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_CONFIG: &str = "sheetscope.yaml";

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .init();
    info!("startup");

    // ─── 2) load config ──────────────────────────────────────────────
    let cfg = match env::args().nth(1) {
        Some(path) => RunConfig::from_yaml_file(&path)?,
        None if Path::new(DEFAULT_CONFIG).exists() => RunConfig::from_yaml_file(DEFAULT_CONFIG)?,
        None => {
            info!("no config file; using defaults");
            RunConfig::default()
        }
    };
    info!(input = %cfg.input, key_variables = ?cfg.key_variables, "config loaded");

    // ─── 3) discover sheets ──────────────────────────────────────────
    let sheets = load_sheets(&cfg.input)?;
    if sheets.is_empty() {
        bail!("no sheets matched {}", cfg.input);
    }
    info!(sheets = sheets.len(), "sheets loaded");

    // ─── 4) analyze & report ─────────────────────────────────────────
    let start = Instant::now();
    let pipeline = SheetPipeline::new(cfg.analysis.clone())?;
    let report = pipeline.run(&sheets, &cfg.key_variables);

    let skipped = report.iter().filter(|(_, r)| r.failure().is_some()).count();
    if skipped > 0 {
        warn!(skipped, "sheets skipped for insufficient data");
    }
    print_report(&report);
    info!(elapsed = ?start.elapsed(), "done");
    Ok(())
}
