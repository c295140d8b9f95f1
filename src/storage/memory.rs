// s3-undelete/src/storage/memory.rs
//! In-memory version store used by the restore tests.
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{DeleteMarkerEntry, ListingCursor, VersionPage, VersionStore};
use crate::errors::{AppError, Result};

#[derive(Debug, Clone, Copy)]
pub(crate) enum FaultKind {
    Transient,
    Auth,
}

impl FaultKind {
    fn to_error(self, what: String) -> AppError {
        match self {
            FaultKind::Transient => AppError::TransientStorage(what),
            FaultKind::Auth => AppError::Auth(what),
        }
    }
}

#[derive(Default)]
struct MemoryState {
    deleted: HashSet<(String, String)>,
    list_calls: HashMap<String, usize>,
    delete_calls: Vec<(String, String)>,
    head_calls: usize,
}

pub(crate) struct MemoryVersionStore {
    bucket: String,
    markers: Vec<DeleteMarkerEntry>,
    strays: Vec<DeleteMarkerEntry>,
    page_size: usize,
    latency: Option<Duration>,
    listing_faults: HashMap<(String, usize), FaultKind>,
    delete_faults: HashMap<String, FaultKind>,
    state: Mutex<MemoryState>,
}

impl MemoryVersionStore {
    pub(crate) fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            markers: Vec::new(),
            strays: Vec::new(),
            page_size: 1000,
            latency: None,
            listing_faults: HashMap::new(),
            delete_faults: HashMap::new(),
            state: Mutex::new(MemoryState::default()),
        }
    }

    pub(crate) fn with_marker(mut self, key: &str, version_id: &str, is_latest: bool) -> Self {
        self.markers.push(DeleteMarkerEntry {
            key: key.to_string(),
            version_id: version_id.to_string(),
            is_latest,
        });
        self.markers
            .sort_by(|a, b| (&a.key, &a.version_id).cmp(&(&b.key, &b.version_id)));
        self
    }

    /// Returned on the first page of every listing regardless of prefix.
    pub(crate) fn with_stray_marker(mut self, key: &str, version_id: &str) -> Self {
        self.strays.push(DeleteMarkerEntry {
            key: key.to_string(),
            version_id: version_id.to_string(),
            is_latest: true,
        });
        self
    }

    pub(crate) fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fail the `page`-th (1-based) listing call for `prefix`.
    pub(crate) fn fail_listing(mut self, prefix: &str, page: usize, kind: FaultKind) -> Self {
        self.listing_faults.insert((prefix.to_string(), page), kind);
        self
    }

    pub(crate) fn fail_delete(mut self, key: &str, kind: FaultKind) -> Self {
        self.delete_faults.insert(key.to_string(), kind);
        self
    }

    pub(crate) fn deleted(&self) -> Vec<(String, String)> {
        let state = self.state.lock().unwrap();
        let mut deleted: Vec<_> = state.deleted.iter().cloned().collect();
        deleted.sort();
        deleted
    }

    pub(crate) fn delete_calls(&self) -> usize {
        self.state.lock().unwrap().delete_calls.len()
    }

    pub(crate) fn list_calls(&self, prefix: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .list_calls
            .get(prefix)
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn total_calls(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.head_calls + state.delete_calls.len() + state.list_calls.values().sum::<usize>()
    }

    fn ensure_bucket(&self, bucket: &str) -> Result<()> {
        if bucket == self.bucket {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("bucket '{}' does not exist", bucket)))
        }
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl VersionStore for MemoryVersionStore {
    async fn check_bucket(&self, bucket: &str) -> Result<()> {
        self.state.lock().unwrap().head_calls += 1;
        self.ensure_bucket(bucket)
    }

    async fn list_versions_page(
        &self,
        bucket: &str,
        prefix: &str,
        cursor: Option<&ListingCursor>,
    ) -> Result<VersionPage> {
        let call = {
            let mut state = self.state.lock().unwrap();
            let calls = state.list_calls.entry(prefix.to_string()).or_insert(0);
            *calls += 1;
            *calls
        };
        self.simulate_latency().await;
        self.ensure_bucket(bucket)?;

        if let Some(kind) = self.listing_faults.get(&(prefix.to_string(), call)) {
            return Err(kind.to_error(format!("listing page {} of '{}'", call, prefix)));
        }

        let deleted = self.state.lock().unwrap().deleted.clone();
        let remaining: Vec<&DeleteMarkerEntry> = self
            .markers
            .iter()
            .filter(|m| m.key.starts_with(prefix))
            .filter(|m| !deleted.contains(&(m.key.clone(), m.version_id.clone())))
            .filter(|m| match cursor {
                None => true,
                Some(c) => {
                    let after = c.version_id_marker.as_deref().unwrap_or("");
                    (m.key.as_str(), m.version_id.as_str()) > (c.key_marker.as_str(), after)
                }
            })
            .collect();

        let mut delete_markers: Vec<DeleteMarkerEntry> = remaining
            .iter()
            .take(self.page_size)
            .map(|m| (*m).clone())
            .collect();

        let next = if remaining.len() > self.page_size {
            delete_markers.last().map(|last| ListingCursor {
                key_marker: last.key.clone(),
                version_id_marker: Some(last.version_id.clone()),
            })
        } else {
            None
        };

        if cursor.is_none() {
            delete_markers.extend(self.strays.iter().cloned());
        }

        Ok(VersionPage {
            delete_markers,
            next,
        })
    }

    async fn delete_marker(&self, bucket: &str, key: &str, version_id: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .delete_calls
            .push((key.to_string(), version_id.to_string()));
        self.simulate_latency().await;
        self.ensure_bucket(bucket)?;

        if let Some(kind) = self.delete_faults.get(key) {
            return Err(kind.to_error(format!("deleting '{}'", key)));
        }

        self.state
            .lock()
            .unwrap()
            .deleted
            .insert((key.to_string(), version_id.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_delete_is_idempotent() -> anyhow::Result<()> {
        let store = MemoryVersionStore::new("b").with_marker("a/1", "v1", true);
        store.delete_marker("b", "a/1", "v1").await?;
        store.delete_marker("b", "a/1", "v1").await?;
        store.delete_marker("b", "a/never-existed", "v9").await?;
        assert_eq!(store.deleted().len(), 2);
        assert_eq!(store.delete_calls(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_listing_pages_follow_cursor() -> anyhow::Result<()> {
        let store = MemoryVersionStore::new("b")
            .with_marker("p/a", "1", true)
            .with_marker("p/b", "1", true)
            .with_marker("p/c", "1", true)
            .with_page_size(2);

        let first = store.list_versions_page("b", "p/", None).await?;
        assert_eq!(first.delete_markers.len(), 2);
        let cursor = first.next.expect("first page should be truncated");

        let second = store.list_versions_page("b", "p/", Some(&cursor)).await?;
        assert_eq!(second.delete_markers.len(), 1);
        assert_eq!(second.delete_markers[0].key, "p/c");
        assert!(second.next.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_bucket_is_not_found() {
        let store = MemoryVersionStore::new("b");
        let err = store.check_bucket("other").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
