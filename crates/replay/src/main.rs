//! DMS replay - runs recorded probe outputs through a drowsiness session

use anyhow::Context;
use clap::Parser;
use dms::{DmsConfig, DmsSession};
use replay::{init_logging, replay};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use tracing::info;

/// Replay newline-delimited tick records and print one JSON analysis per tick
#[derive(Parser)]
#[command(name = "dms-replay")]
#[command(version)]
#[command(about = "Driver drowsiness analysis over recorded probe outputs", long_about = None)]
struct Cli {
    /// Input file path (use - for stdin)
    #[arg(short, long, default_value = "-")]
    input: PathBuf,

    /// Configuration file (toml, yaml or json); DMS__* environment variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// ONNX temporal classifier; overrides the configured model
    #[arg(long)]
    model: Option<String>,

    /// Skip session baseline normalization
    #[arg(long)]
    no_normalization: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    info!("=== DMS replay v{} ===", env!("CARGO_PKG_VERSION"));

    let mut config = DmsConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(model) = cli.model {
        config.classifier.model_path = Some(model);
    }
    if cli.no_normalization {
        config.normalization_enabled = false;
    }

    if config.heuristic_on_normalized_window() {
        info!("Pass --no-normalization or --model for meaningful drowsiness scores");
    }
    let mut session = DmsSession::from_config(config).context("creating DMS session")?;
    info!(
        "Session ready (classifier: {})",
        if session.engine().is_mock() { "heuristic" } else { "onnx" }
    );

    let stdout = io::stdout().lock();
    let summary = if cli.input.as_os_str() == "-" {
        replay(&mut session, io::stdin().lock(), stdout)?
    } else {
        let file = File::open(&cli.input)
            .with_context(|| format!("opening {}", cli.input.display()))?;
        replay(&mut session, BufReader::new(file), stdout)?
    };

    info!(
        "Summary: {} drowsy ticks, {} blinks, {} yawns",
        summary.drowsy_ticks, summary.blinks, summary.yawns
    );
    Ok(())
}
