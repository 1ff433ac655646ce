//! Score households described in a YAML list.
//!
//! ```text
//! vulnerability_score households.yaml
//! ```
use anyhow::{Context, Result};
use sheetscope::vulnerability::{classify, VulnerabilityInput};
use std::{env, fs, process::exit};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut args = env::args();
    let prog = args.next().unwrap_or_else(|| "vulnerability_score".into());
    let Some(path) = args.next() else {
        eprintln!("Usage: {} <HOUSEHOLDS_YAML>", prog);
        exit(1);
    };

    let text = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path))?;
    let households: Vec<VulnerabilityInput> =
        serde_yaml::from_str(&text).with_context(|| format!("Failed to parse {}", path))?;
    info!(households = households.len(), "scoring");

    for (i, household) in households.iter().enumerate() {
        let score = household.score();
        println!("#{:<3} Vulnerability Score: {:.2}/100  {}", i + 1, score, classify(score));
    }
    Ok(())
}
