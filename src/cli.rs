//! Command-line surface. Flags mirror the config.json keys and win over them.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::ConfigOverrides;
use crate::logging::LogFormat;
use crate::restore::RestoreMode;

/// Restore objects hidden by delete markers in a versioned S3 bucket
#[derive(Parser, Debug)]
#[command(name = "s3-undelete", version)]
#[command(about = "Restore deleted objects in a versioned S3 bucket by removing their delete markers")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// AWS access key ID
    #[arg(short = 'i', long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true, global = true)]
    pub aws_access_key_id: Option<String>,

    /// AWS secret access key
    #[arg(short = 'k', long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true, global = true)]
    pub aws_secret_access_key: Option<String>,

    /// AWS region (default: us-east-1)
    #[arg(short = 'r', long, env = "AWS_REGION", global = true)]
    pub aws_region: Option<String>,

    /// Custom endpoint for S3-compatible services
    #[arg(long, env = "S3_ENDPOINT_URL", global = true)]
    pub endpoint_url: Option<String>,

    /// Use path-style addressing (MinIO and similar)
    #[arg(long, global = true)]
    pub force_path_style: bool,

    /// Target bucket, as a name or s3://bucket
    #[arg(short = 'b', long, env = "S3_BUCKET_NAME", global = true)]
    pub bucket_name: Option<String>,

    /// File with one prefix per line (first CSV column)
    #[arg(short = 'f', long = "prefixes-file-name", global = true)]
    pub prefixes_file: Option<PathBuf>,

    /// Header value to skip in the prefixes file (empty string disables)
    #[arg(long, global = true)]
    pub header_sentinel: Option<String>,

    /// Maximum number of prefixes processed at once (default: 5)
    #[arg(short = 't', long = "threads", global = true)]
    pub max_concurrency: Option<usize>,

    /// Versions requested per listing page (1-1000)
    #[arg(long, global = true)]
    pub page_size: Option<i32>,

    /// Keep processing other prefixes after one fails
    #[arg(long, global = true)]
    pub keep_going: bool,

    /// Write the run summary as JSON to this path
    #[arg(long, global = true)]
    pub report_json: Option<PathBuf>,

    /// Configuration file (default: ./config.json when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    /// Log format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Shows the deleted objects that would be restored
    Show,
    /// Restores all deleted objects under the listed prefixes
    Restore,
}

impl Commands {
    pub fn mode(self) -> RestoreMode {
        match self {
            Commands::Show => RestoreMode::DryRun,
            Commands::Restore => RestoreMode::Apply,
        }
    }
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            bucket_name: self.bucket_name.clone(),
            region: self.aws_region.clone(),
            access_key_id: self.aws_access_key_id.clone(),
            secret_access_key: self.aws_secret_access_key.clone(),
            endpoint_url: self.endpoint_url.clone(),
            force_path_style: self.force_path_style,
            prefixes_file: self.prefixes_file.clone(),
            header_sentinel: self.header_sentinel.clone(),
            max_concurrency: self.max_concurrency,
            page_size: self.page_size,
            keep_going: self.keep_going,
            report_json: self.report_json.clone(),
        }
    }
}
