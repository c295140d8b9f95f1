// s3-undelete/src/restore/orchestrator.rs
use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::RestoreMode;
use super::prefix_restorer::restore_prefix;
use super::report::{PrefixStatus, RestoreReporter, RunState, RunSummary};
use crate::errors::{AppError, Result};
use crate::storage::VersionStore;

pub const DEFAULT_MAX_CONCURRENCY: usize = 5;

/// What happens to the rest of the run once a prefix fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop starting new prefixes; in-flight prefixes finish on their own.
    /// Cancellation, unlike a failure, also stops in-flight prefixes.
    #[default]
    FailFast,
    /// Record the failure and keep going with the remaining prefixes.
    Isolate,
}

#[derive(Debug, Clone)]
pub struct RestorePlan {
    pub bucket: String,
    pub mode: RestoreMode,
    pub max_concurrency: usize,
    pub failure_policy: FailurePolicy,
}

/// Runs one restore task per prefix, never more than `max_concurrency` at once.
pub struct Orchestrator {
    store: Arc<dyn VersionStore>,
    reporter: Arc<dyn RestoreReporter>,
    plan: RestorePlan,
}

type TaskOutput = (usize, PrefixStatus);

impl Orchestrator {
    pub fn new(
        store: Arc<dyn VersionStore>,
        reporter: Arc<dyn RestoreReporter>,
        plan: RestorePlan,
    ) -> Self {
        Self {
            store,
            reporter,
            plan,
        }
    }

    /// Restores every prefix and returns the aggregated outcome.
    ///
    /// Prefix failures are reported in the summary, not as `Err`; an `Err`
    /// means the orchestrator itself could not keep track of its tasks.
    pub async fn run(&self, prefixes: &[String], cancel: &CancellationToken) -> Result<RunSummary> {
        let started_at = Local::now();
        let started = Instant::now();
        let bucket: Arc<str> = Arc::from(self.plan.bucket.as_str());
        let semaphore = Arc::new(Semaphore::new(self.plan.max_concurrency.max(1)));

        let mut statuses: Vec<Option<PrefixStatus>> = vec![None; prefixes.len()];
        let mut tasks: JoinSet<TaskOutput> = JoinSet::new();
        let mut halt: Option<RunState> = None;
        let mut next = 0usize;

        if prefixes.is_empty() {
            warn!(bucket = %bucket, "prefix list is empty, nothing to restore");
        }

        // Tripped by the caller's token, or by a failing task under FailFast
        // before it releases its permit.
        let stop_dispatch = cancel.child_token();

        while next < prefixes.len() && halt.is_none() {
            tokio::select! {
                biased;
                _ = stop_dispatch.cancelled() => {
                    let remaining = prefixes.len() - next;
                    if cancel.is_cancelled() {
                        warn!(remaining, "cancellation requested, no further prefixes will be started");
                        halt = Some(RunState::Cancelled);
                    } else {
                        warn!(remaining, "a prefix failed, no further prefixes will be started");
                        halt = Some(RunState::AbortedByFailure);
                    }
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    let (index, status) = joined.map_err(join_failure)?;
                    statuses[index] = Some(status);
                }
                permit = semaphore.clone().acquire_owned() => {
                    let permit = permit
                        .map_err(|_| AppError::Generic("concurrency pool closed".to_string()))?;
                    self.dispatch(
                        &mut tasks,
                        next,
                        prefixes[next].clone(),
                        Arc::clone(&bucket),
                        permit,
                        cancel.clone(),
                        stop_dispatch.clone(),
                    );
                    next += 1;
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            let (index, status) = joined.map_err(join_failure)?;
            statuses[index] = Some(status);
        }

        let prefix_statuses: Vec<PrefixStatus> = statuses
            .into_iter()
            .zip(prefixes)
            .map(|(status, prefix)| status.unwrap_or_else(|| PrefixStatus::not_attempted(prefix)))
            .collect();

        let any_failed = prefix_statuses.iter().any(PrefixStatus::is_failed);
        let cancelled = halt == Some(RunState::Cancelled)
            || prefix_statuses.iter().any(PrefixStatus::is_cancelled);
        let state = if cancelled {
            RunState::Cancelled
        } else if any_failed {
            match self.plan.failure_policy {
                FailurePolicy::FailFast => RunState::AbortedByFailure,
                FailurePolicy::Isolate => RunState::CompletedWithFailures,
            }
        } else {
            RunState::AllCompleted
        };

        let summary = RunSummary {
            bucket: self.plan.bucket.clone(),
            mode: self.plan.mode,
            started_at,
            elapsed_seconds: started.elapsed().as_secs_f64(),
            state,
            total_restored: prefix_statuses.iter().map(|s| s.restored).sum(),
            total_candidates: prefix_statuses.iter().map(|s| s.candidates).sum(),
            prefixes: prefix_statuses,
        };

        info!(
            state = ?summary.state,
            total_restored = summary.total_restored,
            elapsed_secs = summary.elapsed_seconds,
            "restore run finished"
        );
        Ok(summary)
    }

    fn dispatch(
        &self,
        tasks: &mut JoinSet<TaskOutput>,
        index: usize,
        prefix: String,
        bucket: Arc<str>,
        permit: OwnedSemaphorePermit,
        cancel: CancellationToken,
        stop_dispatch: CancellationToken,
    ) {
        let store = Arc::clone(&self.store);
        let reporter = Arc::clone(&self.reporter);
        let mode = self.plan.mode;
        let fail_fast = self.plan.failure_policy == FailurePolicy::FailFast;
        debug!(prefix = %prefix, index, "dispatching prefix");

        tasks.spawn(async move {
            // Held until the task returns, so the pool bounds running prefixes.
            let _permit = permit;
            reporter.prefix_started(&prefix);

            let status = match restore_prefix(
                store.as_ref(),
                &bucket,
                &prefix,
                mode,
                reporter.as_ref(),
                &cancel,
            )
            .await
            {
                Ok(report) => PrefixStatus::from(report),
                Err(failure) => PrefixStatus::from(failure),
            };
            if fail_fast && status.is_failed() {
                stop_dispatch.cancel();
            }
            reporter.prefix_finished(&status);
            (index, status)
        });
    }
}

fn join_failure(err: JoinError) -> AppError {
    AppError::Generic(format!("prefix task did not complete: {}", err))
}
