//! Driver Monitoring Replay
//!
//! Feeds a recorded landmark stream (JSON lines, one frame per line) through
//! a [`dms::DmsSession`] and reports the end-of-session summary.

use clap::ValueEnum;
use dms::{DmsConfig, DmsError};
use std::path::Path;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod player;

pub use player::{replay, ReplayOptions, ReplayOutcome};

/// Environment prefix for configuration overrides (`DMS__EAR_THRESHOLD=0.2`)
pub const ENV_PREFIX: &str = "DMS";

/// Replay error types
#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid frame on line {line}: {source}")]
    Frame {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Configuration load failed: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    #[error(transparent)]
    Dms(#[from] DmsError),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Initialize logging
///
/// Level selection follows `RUST_LOG`, defaulting to `info`. Logs go to
/// stderr so stdout carries only the summary.
pub fn init_logging(format: LogFormat) -> Result<(), ReplayError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let result = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| ReplayError::Logging(e.to_string()))
}

/// Load the session configuration
///
/// Layers, lowest first: built-in defaults, the optional file, then
/// `DMS__*` environment overrides. The result is validated.
pub fn load_config(path: Option<&Path>) -> Result<DmsConfig, ReplayError> {
    let mut builder =
        config::Config::builder().add_source(config::Config::try_from(&DmsConfig::default())?);

    if let Some(path) = path {
        info!("Loading configuration from {}", path.display());
        builder = builder.add_source(config::File::from(path).required(true));
    }

    let config: DmsConfig = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;

    config.validate()?;
    Ok(config)
}
