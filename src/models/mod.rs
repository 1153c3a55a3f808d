//! Data models for rekindle.
//!
//! This module contains the core data structures shared by the services.

mod bookmark;
mod filter;
mod ledger;
mod selection;

pub use bookmark::{BookmarkId, BookmarkRef, MAX_RATING, MIN_RATING, UNCATEGORIZED};
pub use filter::{BookmarkFilter, BookmarkPredicate};
pub use ledger::LedgerState;
pub use selection::{EngineState, Progress, SelectionResult};
