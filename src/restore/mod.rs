pub(crate) mod orchestrator;
pub(crate) mod pages;
pub(crate) mod prefix_restorer;
pub(crate) mod report;
#[cfg(test)]
pub(crate) mod test_support;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::AppConfig;
use crate::errors::Result;
use crate::storage::VersionStore;
use crate::storage::s3_versions::S3VersionStore;
use orchestrator::{Orchestrator, RestorePlan};
use report::{RestoreReporter, RunSummary, TracingReporter};

/// Whether markers are actually removed. Fixed for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RestoreMode {
    DryRun,
    Apply,
}

impl fmt::Display for RestoreMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestoreMode::DryRun => write!(f, "dry run"),
            RestoreMode::Apply => write!(f, "apply"),
        }
    }
}

/// Public entry point for the restore process against the configured S3 bucket.
pub async fn run_restore_flow(
    app_config: &AppConfig,
    prefixes: &[String],
    cancel: &CancellationToken,
) -> Result<RunSummary> {
    let store = S3VersionStore::connect(&app_config.storage).await;
    run_with_store(
        Arc::new(store),
        Arc::new(TracingReporter),
        app_config,
        prefixes,
        cancel,
    )
    .await
}

/// Checks the bucket once up front so credential or bucket problems abort
/// before any prefix work, then hands the prefixes to the orchestrator.
/// An empty prefix list touches storage not at all.
pub(crate) async fn run_with_store(
    store: Arc<dyn VersionStore>,
    reporter: Arc<dyn RestoreReporter>,
    app_config: &AppConfig,
    prefixes: &[String],
    cancel: &CancellationToken,
) -> Result<RunSummary> {
    let restore_config = &app_config.restore;

    if !prefixes.is_empty() {
        store.check_bucket(&restore_config.bucket_name).await?;
        info!(
            bucket = %restore_config.bucket_name,
            prefixes = prefixes.len(),
            mode = %restore_config.mode,
            max_concurrency = restore_config.max_concurrency,
            "bucket reachable, starting restore"
        );
    }

    let plan = RestorePlan {
        bucket: restore_config.bucket_name.clone(),
        mode: restore_config.mode,
        max_concurrency: restore_config.max_concurrency,
        failure_policy: restore_config.failure_policy,
    };
    Orchestrator::new(store, reporter, plan)
        .run(prefixes, cancel)
        .await
}
