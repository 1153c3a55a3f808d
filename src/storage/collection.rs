//! Read-only adapter over the bookmark collection file.
//!
//! The collection is owned by the bookmark manager; this module only reads
//! it and resolves optional fields into [`BookmarkRef`] values:
//!
//! ```json
//! {
//!   "bookmarks": [
//!     {"url": "https://rust-lang.org", "title": "Rust", "category": "Languages",
//!      "rating": 5, "keywords": ["systems"], "date_added": "2024-01-02T03:04:05.120000"}
//!   ],
//!   "categories": [{"name": "Languages", "bookmarks": ["https://rust-lang.org"]}]
//! }
//! ```
//!
//! Only `bookmarks` is read. Timestamps may carry an offset or be naive, in
//! which case they are taken as UTC.

use crate::models::BookmarkRef;
use crate::services::UrlNormalizer;
use crate::storage::traits::BookmarkSource;
use crate::{Error, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// One entry as the collection file stores it.
#[derive(Debug, Deserialize)]
struct StoredBookmark {
    url: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    rating: Option<i64>,
    #[serde(default)]
    keywords: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    added_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    date_added: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct StoredCollection {
    #[serde(default)]
    bookmarks: Vec<StoredBookmark>,
}

/// Parses an RFC 3339 timestamp or a naive ISO 8601 one (as UTC).
///
/// Anything else reads as absent rather than failing the whole file.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| raw.parse::<NaiveDateTime>().map(|naive| naive.and_utc()))
        .inspect_err(|e| tracing::debug!(value = raw, error = %e, "Ignoring unreadable timestamp"))
        .ok()
}

fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

/// Bookmark collection backed by a JSON file.
#[derive(Debug, Clone)]
pub struct JsonCollection {
    path: PathBuf,
    normalizer: UrlNormalizer,
}

impl JsonCollection {
    /// Creates an adapter for the collection at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            normalizer: UrlNormalizer::new(),
        }
    }

    /// Sets the normalizer used to derive identifiers.
    #[must_use]
    pub const fn with_normalizer(mut self, normalizer: UrlNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Returns the collection file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<StoredCollection> {
        let content = fs::read_to_string(&self.path).map_err(|e| Error::OperationFailed {
            operation: "read_collection".to_string(),
            cause: format!("{}: {e}", self.path.display()),
        })?;

        serde_json::from_str(&content).map_err(|e| Error::OperationFailed {
            operation: "parse_collection".to_string(),
            cause: format!("{}: {e}", self.path.display()),
        })
    }

    fn resolve(&self, stored: StoredBookmark) -> BookmarkRef {
        let id = self.normalizer.identifier_for(&stored.url);
        let bookmark = BookmarkRef::new(id, stored.url, stored.title.unwrap_or_default())
            .with_category(stored.category.as_deref())
            .with_rating(stored.rating)
            .with_keywords(stored.keywords.unwrap_or_default());

        match stored.added_at.or(stored.date_added) {
            Some(added_at) => bookmark.with_added_at(added_at),
            None => bookmark,
        }
    }
}

impl BookmarkSource for JsonCollection {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn snapshot(&self) -> Result<Vec<BookmarkRef>> {
        let stored = self.read()?;
        let bookmarks: Vec<BookmarkRef> = stored
            .bookmarks
            .into_iter()
            .map(|b| self.resolve(b))
            .collect();

        let distinct: HashSet<_> = bookmarks.iter().map(|b| &b.id).collect();
        tracing::debug!(
            count = bookmarks.len(),
            distinct = distinct.len(),
            "Loaded bookmark collection"
        );

        Ok(bookmarks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UNCATEGORIZED;
    use chrono::TimeZone;
    use tempfile::TempDir;
    use test_case::test_case;

    fn write_collection(dir: &TempDir, content: &str) -> JsonCollection {
        let path = dir.path().join("bookmarks.json");
        fs::write(&path, content).unwrap();
        JsonCollection::new(path)
    }

    #[test]
    fn test_snapshot_resolves_fields() {
        let dir = TempDir::new().unwrap();
        let collection = write_collection(
            &dir,
            r#"{
                "bookmarks": [
                    {"url": "HTTPS://Rust-Lang.org/", "title": "Rust", "category": "Languages",
                     "rating": 5, "keywords": ["systems"]},
                    {"url": "https://example.com/a", "title": "A", "category": null, "rating": 9},
                    {"url": "https://example.com/b", "added_at": "2024-01-02T03:04:05Z"}
                ],
                "categories": []
            }"#,
        );

        let bookmarks = collection.snapshot().unwrap();
        assert_eq!(bookmarks.len(), 3);

        assert_eq!(bookmarks[0].id.as_str(), "https://rust-lang.org");
        assert_eq!(bookmarks[0].url, "HTTPS://Rust-Lang.org/");
        assert_eq!(bookmarks[0].category, "Languages");
        assert_eq!(bookmarks[0].rating, Some(5));
        assert_eq!(bookmarks[0].keywords, vec!["systems".to_string()]);

        assert_eq!(bookmarks[1].category, UNCATEGORIZED);
        assert_eq!(bookmarks[1].rating, None);

        assert!(bookmarks[2].title.is_empty());
        assert_eq!(bookmarks[2].added_at.to_rfc3339(), "2024-01-02T03:04:05+00:00");
    }

    #[test]
    fn test_snapshot_reads_organizer_save_file() {
        let dir = TempDir::new().unwrap();
        let collection = write_collection(
            &dir,
            r#"{
                "bookmarks": [
                    {"url": "https://a.example", "title": "A", "category": "Rust",
                     "rating": null, "keywords": [], "date_added": "2023-05-06T07:08:09.123456",
                     "date_modified": "2023-05-06T07:08:09.123456", "view_count": 3,
                     "adult_metadata": {}, "notes": "", "access_level": "public"},
                    {"url": "https://b.example", "title": null, "keywords": null}
                ],
                "categories": [
                    {"name": "Rust", "bookmarks": ["https://a.example"]},
                    {"name": "Uncategorized", "bookmarks": []}
                ]
            }"#,
        );

        let bookmarks = collection.snapshot().unwrap();
        assert_eq!(bookmarks.len(), 2);
        assert_eq!(bookmarks[0].category, "Rust");
        assert_eq!(
            bookmarks[0].added_at,
            Utc.with_ymd_and_hms(2023, 5, 6, 7, 8, 9).unwrap()
                + chrono::Duration::microseconds(123_456)
        );
        assert!(bookmarks[1].title.is_empty());
        assert!(bookmarks[1].keywords.is_empty());
        assert_eq!(bookmarks[1].added_at, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test_case(r#""added_at": "2024-01-02T03:04:05+02:00""#, "2024-01-02T01:04:05+00:00" ; "offset timestamp")]
    #[test_case(r#""date_added": "2024-01-02T03:04:05""#, "2024-01-02T03:04:05+00:00" ; "naive timestamp as utc")]
    #[test_case(r#""date_added": "yesterday""#, "1970-01-01T00:00:00+00:00" ; "unreadable timestamp")]
    #[test_case(r#""date_added": null"#, "1970-01-01T00:00:00+00:00" ; "null timestamp")]
    fn test_added_at_spellings(field: &str, expected: &str) {
        let dir = TempDir::new().unwrap();
        let collection = write_collection(
            &dir,
            &format!(r#"{{"bookmarks": [{{"url": "https://a.example", {field}}}]}}"#),
        );

        let bookmarks = collection.snapshot().unwrap();
        assert_eq!(bookmarks[0].added_at.to_rfc3339(), expected);
    }

    #[test]
    fn test_assume_https_identifiers() {
        let dir = TempDir::new().unwrap();
        let collection = write_collection(
            &dir,
            r#"{"bookmarks": [{"url": "example.com/page", "title": "Bare"}]}"#,
        )
        .with_normalizer(UrlNormalizer::new().with_assume_https(true));

        let bookmarks = collection.snapshot().unwrap();
        assert_eq!(bookmarks[0].id.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let collection = JsonCollection::new(dir.path().join("absent.json"));
        assert!(matches!(
            collection.snapshot(),
            Err(Error::OperationFailed { .. })
        ));
    }

    #[test]
    fn test_malformed_file() {
        let dir = TempDir::new().unwrap();
        let collection = write_collection(&dir, "{\"bookmarks\": [");
        assert!(matches!(
            collection.snapshot(),
            Err(Error::OperationFailed { .. })
        ));
    }
}
