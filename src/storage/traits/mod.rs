//! Storage backend traits.

mod collection;
mod persistence;

pub use collection::BookmarkSource;
pub use persistence::LedgerBackend;
