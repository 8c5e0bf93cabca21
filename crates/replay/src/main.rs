//! Driver Monitoring Replay - Main Entry Point

use anyhow::Context;
use clap::Parser;
use dms::DmsSession;
use replay::{init_logging, load_config, replay, LogFormat, ReplayOptions};
use std::path::PathBuf;
use tokio::io::BufReader;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON-lines landmark recording, one frame per line
    input: PathBuf,

    /// Configuration file (TOML, JSON or YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pace frames by their recorded timestamps
    #[arg(long)]
    realtime: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.log_format)?;

    info!("=== Driver Monitoring Replay v{} ===", env!("CARGO_PKG_VERSION"));

    let config = load_config(args.config.as_deref())?;
    let mut session = DmsSession::new(config)?;

    let file = tokio::fs::File::open(&args.input)
        .await
        .with_context(|| format!("Failed to open recording {}", args.input.display()))?;

    let outcome = replay(
        BufReader::new(file),
        &mut session,
        ReplayOptions {
            realtime: args.realtime,
        },
    )
    .await?;

    info!(
        "Replayed {} frame(s), {} alarm(s), peak PERCLOS {}",
        outcome.frames_processed,
        outcome.summary.metrics.total_alarms,
        outcome
            .summary
            .peak_perclos_percent()
            .map(|p| format!("{p:.1}%"))
            .unwrap_or_else(|| "n/a".to_string())
    );

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
