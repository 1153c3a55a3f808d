//! Storage layer.
//!
//! Two concerns live here:
//! - **Ledger persistence**: the durable shown set (filesystem, in-memory)
//! - **Collection access**: read-only snapshots of the bookmark collection

pub mod collection;
pub mod persistence;
pub mod traits;

pub use collection::JsonCollection;
pub use persistence::{FilesystemLedgerBackend, LEDGER_FILE_NAME, MemoryLedgerBackend};
pub use traits::{BookmarkSource, LedgerBackend};
