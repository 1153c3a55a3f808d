//! Bookmark collection read contract.

use crate::Result;
use crate::models::BookmarkRef;

/// Snapshot access to the authoritative bookmark collection.
///
/// The collection owner is also expected to call
/// [`DiscoveryEngine::on_bookmark_removed`](crate::services::DiscoveryEngine::on_bookmark_removed)
/// synchronously from its delete and merge paths.
pub trait BookmarkSource: Send + Sync {
    /// Returns the current bookmarks, taken at a single instant.
    fn snapshot(&self) -> Result<Vec<BookmarkRef>>;
}

impl BookmarkSource for Vec<BookmarkRef> {
    fn snapshot(&self) -> Result<Vec<BookmarkRef>> {
        Ok(self.clone())
    }
}
