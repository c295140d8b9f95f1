// s3-undelete/src/config/mod.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::errors::AppError;
use crate::restore::RestoreMode;
use crate::restore::orchestrator::{DEFAULT_MAX_CONCURRENCY, FailurePolicy};
use crate::utils::parse_bucket_name;

pub const DEFAULT_CONFIG_FILE: &str = "config.json";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_HEADER_SENTINEL: &str = "embed_code";
/// ListObjectVersions never returns more than this many entries per page.
pub const MAX_PAGE_SIZE: i32 = 1000;

// Structs for deserializing config.json
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonS3StorageConfig {
    pub bucket_name: Option<String>,
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub endpoint_url: Option<String>,
    pub force_path_style: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonRestoreOptions {
    pub prefixes_file: Option<PathBuf>,
    pub header_sentinel: Option<String>,
    pub max_concurrency: Option<usize>,
    pub page_size: Option<i32>,
    pub keep_going: Option<bool>,
    pub report_json: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawJsonConfig {
    pub s3_storage: Option<JsonS3StorageConfig>,
    pub restore_options: Option<JsonRestoreOptions>,
}

impl RawJsonConfig {
    pub fn load_from_json(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;
        serde_json::from_str(&config_content).with_context(|| {
            format!(
                "Failed to parse JSON from config file at {}",
                config_path.display()
            )
        })
    }

    /// An explicitly named file must exist; the default `config.json` is optional.
    pub fn load_optional(config_path: Option<&Path>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_json(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load_from_json(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

/// Settings given on the command line or through the environment. They win
/// over config.json.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bucket_name: Option<String>,
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
    pub prefixes_file: Option<PathBuf>,
    pub header_sentinel: Option<String>,
    pub max_concurrency: Option<usize>,
    pub page_size: Option<i32>,
    pub keep_going: bool,
    pub report_json: Option<PathBuf>,
}

// Application's internal configuration structs
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub region: String,
    pub endpoint_url: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub force_path_style: bool,
    pub page_size: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct RestoreConfig {
    pub bucket_name: String,
    pub mode: RestoreMode,
    pub max_concurrency: usize,
    pub failure_policy: FailurePolicy,
    pub prefixes_file: PathBuf,
    /// `None` when no header line should be skipped.
    pub header_sentinel: Option<String>,
    pub report_json: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub restore: RestoreConfig,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl AppConfig {
    /// Merges overrides with config.json and validates the result. Every
    /// validation failure is an `AppError::Config`.
    pub fn resolve(raw: &RawJsonConfig, overrides: ConfigOverrides, mode: RestoreMode) -> Result<Self> {
        let s3_raw = raw.s3_storage.clone().unwrap_or_default();
        let opts = raw.restore_options.clone().unwrap_or_default();

        let bucket_input = non_empty(overrides.bucket_name)
            .or(non_empty(s3_raw.bucket_name))
            .ok_or_else(|| {
                AppError::Config(
                    "bucket_name must be set (--bucket-name, S3_BUCKET_NAME or s3_storage.bucket_name in config.json)"
                        .to_string(),
                )
            })?;
        let bucket_name = parse_bucket_name(&bucket_input)?;

        let prefixes_file = overrides
            .prefixes_file
            .or(opts.prefixes_file)
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| {
                AppError::Config(
                    "prefixes_file must be set (--prefixes-file-name, -f or restore_options.prefixes_file in config.json)"
                        .to_string(),
                )
            })?;

        let max_concurrency = overrides
            .max_concurrency
            .or(opts.max_concurrency)
            .unwrap_or(DEFAULT_MAX_CONCURRENCY);
        if max_concurrency == 0 {
            return Err(AppError::Config("max_concurrency must be at least 1".to_string()).into());
        }

        let page_size = overrides.page_size.or(opts.page_size);
        if let Some(size) = page_size {
            if !(1..=MAX_PAGE_SIZE).contains(&size) {
                return Err(AppError::Config(format!(
                    "page_size must be between 1 and {}, got {}",
                    MAX_PAGE_SIZE, size
                ))
                .into());
            }
        }

        let mut access_key_id = non_empty(overrides.access_key_id).or(non_empty(s3_raw.access_key_id));
        let mut secret_access_key =
            non_empty(overrides.secret_access_key).or(non_empty(s3_raw.secret_access_key));
        if access_key_id.is_some() != secret_access_key.is_some() {
            // Only one half of a static key pair was provided
            warn!("Only one of access_key_id / secret_access_key is set; falling back to the default AWS credential chain.");
            access_key_id = None;
            secret_access_key = None;
        }

        let header_sentinel = overrides
            .header_sentinel
            .or(opts.header_sentinel)
            .unwrap_or_else(|| DEFAULT_HEADER_SENTINEL.to_string());

        let failure_policy = if overrides.keep_going || opts.keep_going.unwrap_or(false) {
            FailurePolicy::Isolate
        } else {
            FailurePolicy::FailFast
        };

        Ok(AppConfig {
            storage: StorageConfig {
                region: non_empty(overrides.region)
                    .or(non_empty(s3_raw.region))
                    .unwrap_or_else(|| DEFAULT_REGION.to_string()),
                endpoint_url: non_empty(overrides.endpoint_url).or(non_empty(s3_raw.endpoint_url)),
                access_key_id,
                secret_access_key,
                force_path_style: overrides.force_path_style || s3_raw.force_path_style.unwrap_or(false),
                page_size,
            },
            restore: RestoreConfig {
                bucket_name,
                mode,
                max_concurrency,
                failure_policy,
                prefixes_file,
                header_sentinel: Some(header_sentinel).filter(|s| !s.is_empty()),
                report_json: overrides.report_json.or(opts.report_json),
            },
        })
    }
}
