//! Duplicate bookmark detection.
//!
//! Finds bookmarks that point at the same thing without comparing every
//! pair in the collection:
//!
//! 1. **Exact URL**: bucket by normalized URL, confidence `1.0`
//! 2. **Similar title**: MinHash band buckets over title shingles, then a
//!    pluggable [`TitleSimilarity`] on candidate pairs only
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      DuplicateDetector                         │
//! │  ┌────────────────┐   ┌──────────────┐   ┌──────────────────┐  │
//! │  │ Exact pass     │   │ TitleHasher  │   │ TitleSimilarity  │  │
//! │  │                │──▶│              │──▶│                  │  │
//! │  │ UrlNormalizer  │   │ MinHash +    │   │ Levenshtein /    │  │
//! │  │ buckets        │   │ band buckets │   │ Sørensen-Dice    │  │
//! │  └────────────────┘   └──────────────┘   └──────────────────┘  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use rekindle::services::deduplication::{DeduplicationConfig, DuplicateDetector};
//! use std::sync::Arc;
//!
//! let detector = Arc::new(DuplicateDetector::new(DeduplicationConfig::default()));
//! let handle = detector.spawn(bookmarks, 0.9)?;
//! // handle.cancel() from elsewhere stops it early
//! let outcome = handle.join().await?;
//! for cluster in &outcome.clusters {
//!     println!("{} ({}): {} members", cluster.representative, cluster.reason, cluster.len());
//! }
//! ```

mod config;
mod detector;
mod hasher;
mod similarity;
mod types;

pub use config::DeduplicationConfig;
pub use detector::{DetectionHandle, DuplicateDetector};
pub use hasher::{BandKey, TitleHasher};
pub use similarity::{NormalizedLevenshtein, SorensenDice, TitleSimilarity};
pub use types::{CancellationFlag, ClusterMember, ClusterReason, DetectionOutcome, DuplicateCluster};
