//! Bookmark identifiers and the read-only view the engine works with.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category assigned to bookmarks that have none.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Lowest accepted rating.
pub const MIN_RATING: u8 = 1;

/// Highest accepted rating.
pub const MAX_RATING: u8 = 5;

/// Unique identifier for a bookmark: its normalized URL.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookmarkId(String);

impl BookmarkId {
    /// Creates a new bookmark ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookmarkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for BookmarkId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for BookmarkId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Immutable view of one bookmark record.
///
/// The bookmark store owns the mutable record; the engine only borrows
/// slices of these for the length of one call. Optional fields are resolved
/// at the store boundary: a missing category becomes [`UNCATEGORIZED`] and
/// ratings outside `1..=5` are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkRef {
    /// Unique key (normalized URL).
    pub id: BookmarkId,
    /// URL exactly as the collection stores it.
    pub url: String,
    /// Display title.
    pub title: String,
    /// Category name.
    pub category: String,
    /// Optional rating between 1 and 5.
    pub rating: Option<u8>,
    /// Free-form keywords, carried through untouched.
    pub keywords: Vec<String>,
    /// When the bookmark was added.
    pub added_at: DateTime<Utc>,
}

impl BookmarkRef {
    /// Creates a bookmark with default category, no rating and an
    /// `added_at` of the Unix epoch.
    #[must_use]
    pub fn new(id: impl Into<BookmarkId>, url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            title: title.into(),
            category: UNCATEGORIZED.to_string(),
            rating: None,
            keywords: Vec::new(),
            added_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    /// Sets the category. Blank names resolve to [`UNCATEGORIZED`].
    #[must_use]
    pub fn with_category(mut self, category: Option<&str>) -> Self {
        self.category = match category.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => UNCATEGORIZED.to_string(),
        };
        self
    }

    /// Sets the rating. Values outside `1..=5` are treated as unrated.
    #[must_use]
    pub fn with_rating(mut self, rating: Option<i64>) -> Self {
        self.rating = rating
            .and_then(|r| u8::try_from(r).ok())
            .filter(|r| (MIN_RATING..=MAX_RATING).contains(r));
        self
    }

    /// Sets the keywords.
    #[must_use]
    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }

    /// Sets the time the bookmark was added.
    #[must_use]
    pub const fn with_added_at(mut self, added_at: DateTime<Utc>) -> Self {
        self.added_at = added_at;
        self
    }
}

impl fmt::Display for BookmarkRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.url)
    }
}
