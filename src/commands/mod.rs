//! Command handlers module.
//!
//! This module organizes the CLI command implementations into separate files:
//! - `discovery.rs`: Batch selection and history commands (shuffle, progress, reset, forget)
//! - `duplicates.rs`: Background duplicate detection
//! - `config.rs`: Configuration display command

mod config;
mod discovery;
mod duplicates;

use std::sync::Arc;

use clap::Args;
use rekindle::storage::{BookmarkSource, FilesystemLedgerBackend, JsonCollection};
use rekindle::{BookmarkFilter, BookmarkRef, DiscoveryEngine, RekindleConfig, UrlNormalizer};

// Re-export command functions
pub use config::cmd_config;
pub use discovery::{cmd_forget, cmd_progress, cmd_reset, cmd_shuffle};
pub use duplicates::cmd_duplicates;

/// Eligibility filters shared by `shuffle` and `progress`.
#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// Only bookmarks in this category.
    #[arg(long)]
    pub category: Option<String>,

    /// Only bookmarks rated at least this (1-5).
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub min_rating: Option<u8>,

    /// Only bookmarks whose title or URL contains this text.
    #[arg(long)]
    pub search: Option<String>,
}

impl FilterArgs {
    /// Builds the library filter.
    pub fn to_filter(&self) -> BookmarkFilter {
        let mut filter = BookmarkFilter::new();
        if let Some(category) = &self.category {
            filter = filter.with_category(category.as_str());
        }
        if let Some(rating) = self.min_rating {
            filter = filter.with_min_rating(rating);
        }
        if let Some(term) = self.search.as_deref().filter(|t| !t.trim().is_empty()) {
            filter = filter.with_search_term(term);
        }
        filter
    }
}

/// Collection and engine opened from configuration.
struct Session {
    collection: JsonCollection,
    engine: DiscoveryEngine,
    normalizer: UrlNormalizer,
}

impl Session {
    /// Opens the collection and loads the ledger.
    ///
    /// A corrupt ledger is reported on stderr and replaced by an empty one.
    fn open(config: &RekindleConfig) -> Self {
        let normalizer = UrlNormalizer::new().with_assume_https(config.discovery.assume_https);
        let collection = JsonCollection::new(config.collection_path()).with_normalizer(normalizer);
        let backend = Arc::new(FilesystemLedgerBackend::new(config.ledger_path()));

        let (engine, recovered) = DiscoveryEngine::open(backend);
        if let Some(e) = recovered {
            eprintln!("Warning: shown history could not be loaded, starting fresh ({e})");
        }

        Self {
            collection,
            engine,
            normalizer,
        }
    }

    fn bookmarks(&self) -> rekindle::Result<Vec<BookmarkRef>> {
        self.collection.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rekindle::BookmarkPredicate;

    #[test]
    fn test_filter_args_to_filter() {
        let args = FilterArgs {
            category: Some("Rust".to_string()),
            min_rating: Some(3),
            search: Some("  ".to_string()),
        };
        let filter = args.to_filter();

        assert_eq!(filter.category.as_deref(), Some("Rust"));
        assert_eq!(filter.min_rating, Some(3));
        assert!(filter.search_term.is_none());

        let bookmark = BookmarkRef::new("a", "https://a.example", "A")
            .with_category(Some("Rust"))
            .with_rating(Some(4));
        assert!(filter.matches(&bookmark));
    }

    #[test]
    fn test_empty_filter_args() {
        assert!(FilterArgs::default().to_filter().is_empty());
    }
}
