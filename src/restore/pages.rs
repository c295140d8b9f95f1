// s3-undelete/src/restore/pages.rs
use futures::Stream;
use futures::stream;

use crate::errors::Result;
use crate::storage::{DeleteMarkerEntry, ListingCursor, VersionStore};

enum PageState {
    Start,
    After(ListingCursor),
    Done,
}

/// Lazily walks every listing page under `prefix`, yielding each page's
/// delete markers. Pages are fetched strictly in cursor order and the stream
/// ends after the page that carries no continuation. Calling this again
/// restarts the listing from the beginning.
pub fn version_pages<'a>(
    store: &'a dyn VersionStore,
    bucket: &'a str,
    prefix: &'a str,
) -> impl Stream<Item = Result<Vec<DeleteMarkerEntry>>> + Send + 'a {
    stream::try_unfold(PageState::Start, move |state| async move {
        let cursor = match state {
            PageState::Done => return Ok(None),
            PageState::Start => None,
            PageState::After(cursor) => Some(cursor),
        };

        let page = store
            .list_versions_page(bucket, prefix, cursor.as_ref())
            .await?;
        let next_state = match page.next {
            Some(next) => PageState::After(next),
            None => PageState::Done,
        };
        Ok(Some((page.delete_markers, next_state)))
    })
}

/// A marker is restorable only when it hides the current version of a key
/// that really lives under `prefix`. Some backends return loose matches at
/// version boundaries, so the server-side prefix filter is re-checked here.
pub fn is_restorable(entry: &DeleteMarkerEntry, prefix: &str) -> bool {
    entry.is_latest && entry.key.starts_with(prefix)
}
