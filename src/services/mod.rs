//! Business logic services.
//!
//! Services sit between the storage backends and callers:
//! - [`UrlNormalizer`]: comparison keys for URLs
//! - [`ShownSetLedger`]: write-through shown history
//! - [`DiscoveryEngine`]: batch selection and cycle resets
//! - [`deduplication`]: duplicate clusters over a collection snapshot

pub mod deduplication;
mod discovery;
mod ledger;
mod normalizer;

pub use deduplication::{DeduplicationConfig, DuplicateDetector};
pub use discovery::DiscoveryEngine;
pub use ledger::ShownSetLedger;
pub use normalizer::UrlNormalizer;
