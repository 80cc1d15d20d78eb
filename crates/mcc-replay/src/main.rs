//! mcc-replay - replay a multi-camera scenario and print one JSON report per request

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use mcc_replay::{init_logging, load_scenario, run_scenario};
use multicam_controller::MccConfig;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "mcc-replay", version, about = "Replay a multi-camera zoom scenario")]
struct Cli {
    /// Scenario file (TOML, JSON or YAML)
    scenario: PathBuf,

    /// Controller config layered over the defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json);

    info!("=== mcc-replay v{} ===", env!("CARGO_PKG_VERSION"));

    let config = MccConfig::load(cli.config.as_deref())?;
    let scenario = load_scenario(&cli.scenario)?;
    let reports = run_scenario(&scenario, config).await?;

    let mut out = std::io::stdout().lock();
    for report in &reports {
        serde_json::to_writer(&mut out, report)?;
        writeln!(out)?;
    }

    info!("Replayed {} requests", reports.len());
    Ok(())
}
