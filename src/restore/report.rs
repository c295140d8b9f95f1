// s3-undelete/src/restore/report.rs
use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{info, warn};

use super::RestoreMode;
use crate::errors::Result;

/// Sink for per-prefix progress. Implementations must be cheap; they are
/// called from inside the prefix tasks.
pub trait RestoreReporter: Send + Sync {
    /// The prefix holds a concurrency permit and is about to list.
    fn prefix_started(&self, _prefix: &str) {}

    /// Dry run found a marker it would remove.
    fn candidate_found(&self, _prefix: &str, _key: &str) {}

    /// Apply mode removed the marker for `key`.
    fn marker_restored(&self, _prefix: &str, _key: &str, _elapsed: Duration) {}

    /// Called exactly once per dispatched prefix, before its permit is released.
    fn prefix_finished(&self, _status: &PrefixStatus) {}
}

/// Reports progress through `tracing`.
pub struct TracingReporter;

impl RestoreReporter for TracingReporter {
    fn prefix_started(&self, prefix: &str) {
        info!(prefix, "started prefix");
    }

    fn candidate_found(&self, prefix: &str, key: &str) {
        info!(prefix, key, "would restore");
    }

    fn marker_restored(&self, prefix: &str, key: &str, elapsed: Duration) {
        info!(prefix, key, elapsed_secs = elapsed.as_secs_f64(), "restored");
    }

    fn prefix_finished(&self, status: &PrefixStatus) {
        match &status.state {
            PrefixState::Failed { error, .. } => warn!(
                prefix = %status.prefix,
                restored = status.restored,
                error = %error,
                "prefix failed"
            ),
            PrefixState::Cancelled => warn!(
                prefix = %status.prefix,
                restored = status.restored,
                "prefix cancelled"
            ),
            _ => info!(
                prefix = %status.prefix,
                restored = status.restored,
                candidates = status.candidates,
                elapsed_secs = status.elapsed_seconds,
                "prefix done"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PrefixState {
    Completed,
    Failed { error_kind: String, error: String },
    /// Stopped by cancellation; `restored` holds what was done before that.
    Cancelled,
    NotAttempted,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrefixStatus {
    pub prefix: String,
    #[serde(flatten)]
    pub state: PrefixState,
    pub restored: u64,
    pub candidates: u64,
    pub elapsed_seconds: f64,
}

impl PrefixStatus {
    pub fn not_attempted(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            state: PrefixState::NotAttempted,
            restored: 0,
            candidates: 0,
            elapsed_seconds: 0.0,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, PrefixState::Failed { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        self.state == PrefixState::Cancelled
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    AllCompleted,
    /// Failures were isolated; every prefix was still attempted.
    CompletedWithFailures,
    /// Dispatch stopped after the first failure.
    AbortedByFailure,
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub bucket: String,
    pub mode: RestoreMode,
    pub started_at: DateTime<Local>,
    pub elapsed_seconds: f64,
    pub state: RunState,
    pub total_restored: u64,
    pub total_candidates: u64,
    pub prefixes: Vec<PrefixStatus>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.state == RunState::AllCompleted
    }

    pub fn failed(&self) -> impl Iterator<Item = &PrefixStatus> {
        self.prefixes.iter().filter(|p| p.is_failed())
    }

    pub fn not_attempted(&self) -> impl Iterator<Item = &PrefixStatus> {
        self.prefixes
            .iter()
            .filter(|p| p.state == PrefixState::NotAttempted)
    }

    pub fn cancelled(&self) -> impl Iterator<Item = &PrefixStatus> {
        self.prefixes.iter().filter(|p| p.is_cancelled())
    }

    pub fn completed(&self) -> impl Iterator<Item = &PrefixStatus> {
        self.prefixes
            .iter()
            .filter(|p| p.state == PrefixState::Completed)
    }

    /// Human readable end-of-run report.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let verb = match self.mode {
            RestoreMode::DryRun => "would restore",
            RestoreMode::Apply => "restored",
        };

        let _ = writeln!(
            out,
            "=== Run on bucket '{}' ({}) started {}",
            self.bucket,
            self.mode,
            self.started_at.format("%Y-%m-%d %H:%M:%S")
        );
        for status in &self.prefixes {
            let count = match self.mode {
                RestoreMode::DryRun => status.candidates,
                RestoreMode::Apply => status.restored,
            };
            match &status.state {
                PrefixState::Completed => {
                    let _ = writeln!(
                        out,
                        "  ✓ {} ({} {} in {:.2}s)",
                        status.prefix, verb, count, status.elapsed_seconds
                    );
                }
                PrefixState::Failed { error_kind, error } => {
                    let _ = writeln!(
                        out,
                        "  ✗ {} FAILED after {} {} [{}]: {}",
                        status.prefix, verb, count, error_kind, error
                    );
                }
                PrefixState::Cancelled => {
                    let _ = writeln!(
                        out,
                        "  ■ {} cancelled after {} {}",
                        status.prefix, verb, count
                    );
                }
                PrefixState::NotAttempted => {
                    let _ = writeln!(out, "  - {} not attempted", status.prefix);
                }
            }
        }

        let failed = self.failed().count();
        let skipped = self.not_attempted().count();
        let _ = writeln!(
            out,
            "=== {} in {:.2}s, restored objects: {}, candidates: {}, prefixes: {} ok / {} failed / {} cancelled / {} not attempted",
            match self.state {
                RunState::AllCompleted => "All done",
                RunState::CompletedWithFailures => "Finished with failures",
                RunState::AbortedByFailure => "Aborted after failure",
                RunState::Cancelled => "Cancelled",
            },
            self.elapsed_seconds,
            self.total_restored,
            self.total_candidates,
            self.completed().count(),
            failed,
            self.cancelled().count(),
            skipped
        );
        out
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(state: RunState, prefixes: Vec<PrefixStatus>) -> RunSummary {
        RunSummary {
            bucket: "media".to_string(),
            mode: RestoreMode::Apply,
            started_at: Local::now(),
            elapsed_seconds: 1.5,
            state,
            total_restored: prefixes.iter().map(|p| p.restored).sum(),
            total_candidates: prefixes.iter().map(|p| p.candidates).sum(),
            prefixes,
        }
    }

    fn completed(prefix: &str, restored: u64) -> PrefixStatus {
        PrefixStatus {
            prefix: prefix.to_string(),
            state: PrefixState::Completed,
            restored,
            candidates: restored,
            elapsed_seconds: 0.2,
        }
    }

    #[test]
    fn test_render_lists_every_prefix_outcome() {
        let failed = PrefixStatus {
            prefix: "b/".to_string(),
            state: PrefixState::Failed {
                error_kind: "transient".to_string(),
                error: "SlowDown".to_string(),
            },
            restored: 1,
            candidates: 1,
            elapsed_seconds: 0.1,
        };
        let run = summary(
            RunState::AbortedByFailure,
            vec![completed("a/", 3), failed, PrefixStatus::not_attempted("c/")],
        );

        let text = run.render();
        assert!(text.contains("✓ a/ (restored 3"));
        assert!(text.contains("✗ b/ FAILED after restored 1 [transient]: SlowDown"));
        assert!(text.contains("- c/ not attempted"));
        assert!(text.contains("Aborted after failure"));
        assert!(text.contains("restored objects: 4"));
        assert!(!run.is_success());
    }

    #[test]
    fn test_render_shows_cancelled_prefix_with_partial_count() {
        let interrupted = PrefixStatus {
            prefix: "logs/".to_string(),
            state: PrefixState::Cancelled,
            restored: 7,
            candidates: 7,
            elapsed_seconds: 0.4,
        };
        let run = summary(RunState::Cancelled, vec![interrupted, PrefixStatus::not_attempted("z/")]);

        let text = run.render();
        assert!(text.contains("■ logs/ cancelled after restored 7"));
        assert!(text.contains("1 cancelled / 1 not attempted"));
        assert_eq!(serde_json::to_value(&run).unwrap()["prefixes"][0]["state"], "cancelled");
        assert!(!run.is_success());
    }

    #[test]
    fn test_json_report_tags_prefix_state() -> anyhow::Result<()> {
        let run = summary(
            RunState::AllCompleted,
            vec![completed("a/", 2), PrefixStatus::not_attempted("z/")],
        );
        let value = serde_json::to_value(&run)?;

        assert_eq!(value["state"], "all_completed");
        assert_eq!(value["mode"], "apply");
        assert_eq!(value["prefixes"][0]["state"], "completed");
        assert_eq!(value["prefixes"][0]["restored"], 2);
        assert_eq!(value["prefixes"][1]["state"], "not_attempted");
        Ok(())
    }

    #[test]
    fn test_write_json_to_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("report.json");
        summary(RunState::AllCompleted, vec![completed("a/", 1)]).write_json(&path)?;

        let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(written["total_restored"], 1);
        Ok(())
    }
}
