//! S3 Undelete Tool
//!
//! Provides CLI interface for restoring objects hidden by delete markers

// s3-undelete/src/main.rs
mod cli;
mod config;
mod errors;
mod logging;
mod restore;
mod storage;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use config::{AppConfig, RawJsonConfig};
use restore::RestoreMode;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use utils::prefix_file::load_prefixes;

/// Main entry point for the undelete tool
#[tokio::main]
async fn main() -> ExitCode {
    // .env values feed the clap `env` fallbacks, so load them before parsing
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging(&cli.log_level, cli.log_format) {
        eprintln!("❌ Error: {}", e);
        return ExitCode::FAILURE;
    }

    match run_app(cli).await {
        Ok(true) => {
            println!("✅ Operation completed successfully.");
            ExitCode::SUCCESS
        }
        Ok(false) => {
            eprintln!("❌ Not every prefix was restored, see the summary above.");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("❌ Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

/// First Ctrl-C cancels the run gracefully; a second one exits immediately.
async fn watch_interrupts(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    warn!("Interrupt received, stopping after the current page or delete (Ctrl-C again to exit now)");
    cancel.cancel();

    if tokio::signal::ctrl_c().await.is_ok() {
        eprintln!("❌ Interrupted again, exiting without a summary.");
        std::process::exit(130);
    }
}

/// Returns whether every prefix completed.
async fn run_app(cli: Cli) -> Result<bool> {
    let mode = cli.command.mode();
    let raw_json_config = RawJsonConfig::load_optional(cli.config.as_deref())
        .context("Failed to load application configuration")?;
    let app_config = AppConfig::resolve(&raw_json_config, cli.overrides(), mode)
        .context("Invalid configuration")?;

    let restore_config = &app_config.restore;
    let prefixes = load_prefixes(
        &restore_config.prefixes_file,
        restore_config.header_sentinel.as_deref(),
    )
    .with_context(|| {
        format!(
            "Failed to load prefixes from {}",
            restore_config.prefixes_file.display()
        )
    })?;

    match mode {
        RestoreMode::DryRun => println!("🔍 Dry run on bucket {}, nothing will be changed.", restore_config.bucket_name),
        RestoreMode::Apply => println!("🔄 Restoring deleted objects in bucket {}...", restore_config.bucket_name),
    }
    println!("Total Prefixes: {}", prefixes.len());

    let cancel = CancellationToken::new();
    tokio::spawn(watch_interrupts(cancel.clone()));

    let summary = restore::run_restore_flow(&app_config, &prefixes, &cancel)
        .await
        .context("Restore process failed")?;

    print!("{}", summary.render());

    if let Some(path) = &restore_config.report_json {
        summary
            .write_json(path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        println!("📝 Report written to {}", path.display());
    }

    Ok(summary.is_success())
}
