// s3-undelete/src/storage/mod.rs
pub(crate) mod s3_versions;
#[cfg(test)]
pub(crate) mod memory;

use async_trait::async_trait;

use crate::errors::Result;

/// One delete-marker version as reported by a version listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteMarkerEntry {
    pub key: String,
    pub version_id: String,
    pub is_latest: bool,
}

/// Continuation point for a version listing.
///
/// S3 needs both markers: a key whose versions straddle a page boundary is
/// resumed from `version_id_marker`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingCursor {
    pub key_marker: String,
    pub version_id_marker: Option<String>,
}

/// A single page of a version listing. `next` is `None` on the last page.
#[derive(Debug, Clone, Default)]
pub struct VersionPage {
    pub delete_markers: Vec<DeleteMarkerEntry>,
    pub next: Option<ListingCursor>,
}

/// The operations the restore flow needs from a versioned object store.
#[async_trait]
pub trait VersionStore: Send + Sync {
    /// Verify the bucket exists and the credentials can reach it.
    async fn check_bucket(&self, bucket: &str) -> Result<()>;

    /// Fetch one page of versions under `prefix`, starting after `cursor`.
    async fn list_versions_page(
        &self,
        bucket: &str,
        prefix: &str,
        cursor: Option<&ListingCursor>,
    ) -> Result<VersionPage>;

    /// Remove a delete-marker version. A marker that is already gone is not an error.
    async fn delete_marker(&self, bucket: &str, key: &str, version_id: &str) -> Result<()>;
}
