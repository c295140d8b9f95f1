// s3-undelete/src/restore/prefix_restorer.rs
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use futures::{FutureExt, TryStreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::RestoreMode;
use super::pages::{is_restorable, version_pages};
use super::report::{PrefixState, PrefixStatus, RestoreReporter};
use crate::errors::{AppError, Result};
use crate::storage::VersionStore;

/// Result of driving one prefix to the end of its listing, or until the run
/// was cancelled (`interrupted`).
#[derive(Debug, Clone, PartialEq)]
pub struct PrefixReport {
    pub prefix: String,
    pub restored_count: u64,
    pub candidates: u64,
    pub elapsed: Duration,
    pub interrupted: bool,
}

/// A prefix that stopped on a storage error, with whatever it had done so far.
#[derive(Debug)]
pub struct PrefixFailure {
    pub prefix: String,
    pub restored_count: u64,
    pub candidates: u64,
    pub elapsed: Duration,
    pub error: AppError,
}

impl From<PrefixReport> for PrefixStatus {
    fn from(report: PrefixReport) -> Self {
        PrefixStatus {
            prefix: report.prefix,
            state: if report.interrupted {
                PrefixState::Cancelled
            } else {
                PrefixState::Completed
            },
            restored: report.restored_count,
            candidates: report.candidates,
            elapsed_seconds: report.elapsed.as_secs_f64(),
        }
    }
}

impl From<PrefixFailure> for PrefixStatus {
    fn from(failure: PrefixFailure) -> Self {
        PrefixStatus {
            prefix: failure.prefix,
            state: PrefixState::Failed {
                error_kind: failure.error.kind().to_string(),
                error: failure.error.to_string(),
            },
            restored: failure.restored_count,
            candidates: failure.candidates,
            elapsed_seconds: failure.elapsed.as_secs_f64(),
        }
    }
}

#[derive(Default)]
struct Tally {
    restored: u64,
    candidates: u64,
}

enum Flow {
    Finished,
    Interrupted,
}

/// Lists every version under `prefix` and removes (or, in dry run, reports)
/// each delete marker that is the latest version of a key under the prefix.
///
/// The first listing or delete error stops the prefix; nothing is retried.
/// `cancel` is checked before every page and every delete; a cancelled prefix
/// ends with what it had restored so far. A panic inside the prefix becomes a
/// failure that keeps the partial counts.
pub async fn restore_prefix(
    store: &dyn VersionStore,
    bucket: &str,
    prefix: &str,
    mode: RestoreMode,
    reporter: &dyn RestoreReporter,
    cancel: &CancellationToken,
) -> std::result::Result<PrefixReport, PrefixFailure> {
    let started = Instant::now();
    let mut tally = Tally::default();

    let outcome = AssertUnwindSafe(drive(store, bucket, prefix, mode, reporter, cancel, &mut tally))
        .catch_unwind()
        .await
        .unwrap_or_else(|_| Err(AppError::Generic("prefix task panicked".to_string())));

    match outcome {
        Ok(flow) => Ok(PrefixReport {
            prefix: prefix.to_string(),
            restored_count: tally.restored,
            candidates: tally.candidates,
            elapsed: started.elapsed(),
            interrupted: matches!(flow, Flow::Interrupted),
        }),
        Err(error) => Err(PrefixFailure {
            prefix: prefix.to_string(),
            restored_count: tally.restored,
            candidates: tally.candidates,
            elapsed: started.elapsed(),
            error,
        }),
    }
}

async fn drive(
    store: &dyn VersionStore,
    bucket: &str,
    prefix: &str,
    mode: RestoreMode,
    reporter: &dyn RestoreReporter,
    cancel: &CancellationToken,
    tally: &mut Tally,
) -> Result<Flow> {
    let mut pages = std::pin::pin!(version_pages(store, bucket, prefix));
    let mut page_number = 0usize;

    loop {
        let markers = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(prefix, restored = tally.restored, "cancelled between pages");
                return Ok(Flow::Interrupted);
            }
            page = pages.try_next() => match page? {
                Some(markers) => markers,
                None => return Ok(Flow::Finished),
            },
        };
        page_number += 1;
        debug!(prefix, page = page_number, markers = markers.len(), "listing page");

        for marker in markers.iter().filter(|m| is_restorable(m, prefix)) {
            if cancel.is_cancelled() {
                warn!(prefix, restored = tally.restored, "cancelled mid-page");
                return Ok(Flow::Interrupted);
            }
            tally.candidates += 1;
            match mode {
                RestoreMode::DryRun => reporter.candidate_found(prefix, &marker.key),
                RestoreMode::Apply => {
                    let started = Instant::now();
                    store
                        .delete_marker(bucket, &marker.key, &marker.version_id)
                        .await?;
                    tally.restored += 1;
                    reporter.marker_restored(prefix, &marker.key, started.elapsed());
                }
            }
        }
    }
}
