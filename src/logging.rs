//! Structured logging through `tracing`. Log lines go to stderr so the
//! end-of-run summary on stdout stays clean.

use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

use crate::errors::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// `RUST_LOG` takes precedence over `level` when set.
pub fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = build_env_filter(level)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| AppError::Generic(format!("failed to install log subscriber: {}", e)))
}

fn build_env_filter(level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level)
        .map_err(|e| AppError::Config(format!("invalid log level '{}': {}", level, e)))
}
