// s3-undelete/src/restore/test_support.rs
use std::sync::Mutex;
use std::time::Duration;

use super::report::{PrefixStatus, RestoreReporter};

#[derive(Default)]
struct Recorded {
    running: usize,
    max_running: usize,
    started: Vec<String>,
    finished: Vec<PrefixStatus>,
    candidates: Vec<String>,
    restored: Vec<String>,
}

/// Reporter that keeps every event and tracks how many prefixes overlap.
#[derive(Default)]
pub(crate) struct RecordingReporter {
    inner: Mutex<Recorded>,
}

impl RecordingReporter {
    pub(crate) fn max_running(&self) -> usize {
        self.inner.lock().unwrap().max_running
    }

    pub(crate) fn started(&self) -> Vec<String> {
        self.inner.lock().unwrap().started.clone()
    }

    pub(crate) fn finished(&self) -> Vec<PrefixStatus> {
        self.inner.lock().unwrap().finished.clone()
    }

    pub(crate) fn candidate_keys(&self) -> Vec<String> {
        let mut keys = self.inner.lock().unwrap().candidates.clone();
        keys.sort();
        keys
    }

    pub(crate) fn restored_keys(&self) -> Vec<String> {
        let mut keys = self.inner.lock().unwrap().restored.clone();
        keys.sort();
        keys
    }
}

impl RestoreReporter for RecordingReporter {
    fn prefix_started(&self, prefix: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.running += 1;
        inner.max_running = inner.max_running.max(inner.running);
        inner.started.push(prefix.to_string());
    }

    fn candidate_found(&self, _prefix: &str, key: &str) {
        self.inner.lock().unwrap().candidates.push(key.to_string());
    }

    fn marker_restored(&self, _prefix: &str, key: &str, _elapsed: Duration) {
        self.inner.lock().unwrap().restored.push(key.to_string());
    }

    fn prefix_finished(&self, status: &PrefixStatus) {
        let mut inner = self.inner.lock().unwrap();
        inner.running -= 1;
        inner.finished.push(status.clone());
    }
}
