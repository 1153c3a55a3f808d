//! # Rekindle
//!
//! A rediscovery engine for personal bookmark collections.
//!
//! Rekindle hands out random batches of bookmarks the user has not seen yet,
//! remembers what was shown across restarts, starts a fresh cycle once
//! everything eligible has been shown, and finds duplicate entries without
//! comparing every pair.
//!
//! ## Components
//!
//! - [`services::UrlNormalizer`]: canonical comparison keys for URLs
//! - [`services::ShownSetLedger`]: durable "already shown" history
//! - [`services::DiscoveryEngine`]: filtered, non-repeating random batches
//! - [`services::deduplication::DuplicateDetector`]: near-duplicate clusters
//!
//! ## Example
//!
//! ```rust,ignore
//! use rekindle::services::DiscoveryEngine;
//! use rekindle::storage::FilesystemLedgerBackend;
//! use rekindle::BookmarkFilter;
//! use std::sync::Arc;
//!
//! let backend = Arc::new(FilesystemLedgerBackend::new("/tmp/rekindle/shown_links.json"));
//! let (engine, recovered) = DiscoveryEngine::open(backend);
//! let batch = engine.select_batch(&bookmarks, &BookmarkFilter::new(), 5)?;
//! engine.commit(batch.selected.iter().map(|b| b.id.clone()))?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
// multiple_crate_versions is inherently crate-level (detects duplicate transitive dependencies).
#![allow(clippy::multiple_crate_versions)]

use std::path::PathBuf;
use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

// Re-exports for convenience
pub use config::RekindleConfig;
pub use models::{
    BookmarkFilter, BookmarkId, BookmarkPredicate, BookmarkRef, EngineState, Progress,
    SelectionResult, UNCATEGORIZED,
};
pub use services::{DiscoveryEngine, ShownSetLedger, UrlNormalizer};
pub use storage::{FilesystemLedgerBackend, LedgerBackend, MemoryLedgerBackend};

/// Error type for rekindle operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | A URL cannot be parsed during normalization |
/// | `InvalidArgument` | Batch size of zero, duplicate threshold outside `(0, 1]` |
/// | `CorruptState` | The persisted ledger file is malformed |
/// | `Persistence` | Writing the ledger failed (disk full, permissions) |
/// | `OperationFailed` | Config or collection I/O, lock poisoning, background task failures |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    ///
    /// Raised when a raw URL has no scheme, cannot be parsed, or has an
    /// empty host.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An argument was out of range.
    ///
    /// Raised before any state change, so the caller can retry with a
    /// corrected value.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The persisted ledger could not be interpreted.
    ///
    /// Raised when:
    /// - The file is not a JSON object
    /// - `shown_links` is missing or not an array of strings
    /// - `total_bookmarks` is not a non-negative integer
    /// - More identifiers are recorded than the stored total allows
    ///
    /// Callers recover by starting from an empty ledger.
    #[error("corrupt ledger state at '{}': {cause}", path.display())]
    CorruptState {
        /// Location of the offending file.
        path: PathBuf,
        /// What was wrong with it.
        cause: String,
    },

    /// A ledger write did not reach durable storage.
    ///
    /// The in-memory ledger already reflects the change; only durability
    /// across a restart is in question.
    #[error("persistence error during '{operation}': {cause}")]
    Persistence {
        /// The write that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// An operation failed.
    ///
    /// Raised when:
    /// - The config or collection file cannot be read or parsed
    /// - A lock was poisoned by a panicking thread
    /// - A background detection task could not be joined
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

/// Result type alias for rekindle operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in seconds.
///
/// Falls back to 0 if the system clock is before the Unix epoch.
///
/// # Examples
///
/// ```rust
/// use rekindle::current_timestamp;
///
/// let ts = current_timestamp();
/// assert!(ts > 0);
/// ```
#[must_use]
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("test error".to_string());
        assert_eq!(err.to_string(), "invalid input: test error");

        let err = Error::InvalidArgument("count must be at least 1".to_string());
        assert_eq!(err.to_string(), "invalid argument: count must be at least 1");

        let err = Error::Persistence {
            operation: "save_ledger".to_string(),
            cause: "disk full".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "persistence error during 'save_ledger': disk full"
        );

        let err = Error::CorruptState {
            path: PathBuf::from("/tmp/shown_links.json"),
            cause: "missing field `shown_links`".to_string(),
        };
        assert!(err.to_string().contains("/tmp/shown_links.json"));
        assert!(err.to_string().contains("shown_links"));
    }
}
