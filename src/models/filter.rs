//! Eligibility filters for discovery batches.

use super::BookmarkRef;

/// Anything that can decide whether a bookmark is eligible.
///
/// Implemented for [`BookmarkFilter`] and for plain closures, so callers can
/// pass either:
///
/// ```rust
/// use rekindle::{BookmarkPredicate, BookmarkRef};
///
/// let rated = |b: &BookmarkRef| b.rating.is_some();
/// let bookmark = BookmarkRef::new("a", "a", "a").with_rating(Some(4));
/// assert!(rated.matches(&bookmark));
/// ```
pub trait BookmarkPredicate {
    /// Returns true when the bookmark should take part in the draw.
    fn matches(&self, bookmark: &BookmarkRef) -> bool;
}

impl<F> BookmarkPredicate for F
where
    F: Fn(&BookmarkRef) -> bool,
{
    fn matches(&self, bookmark: &BookmarkRef) -> bool {
        self(bookmark)
    }
}

/// Filter criteria for discovery.
///
/// Every criterion is optional; an empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookmarkFilter {
    /// Exact category name.
    pub category: Option<String>,
    /// Minimum rating; unrated bookmarks never match when set.
    pub min_rating: Option<u8>,
    /// Case-insensitive substring of the title or URL.
    pub search_term: Option<String>,
}

impl BookmarkFilter {
    /// Creates an empty filter (matches all).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            category: None,
            min_rating: None,
            search_term: None,
        }
    }

    /// Restricts to one category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Restricts to bookmarks rated at least `rating`.
    #[must_use]
    pub const fn with_min_rating(mut self, rating: u8) -> Self {
        self.min_rating = Some(rating);
        self
    }

    /// Restricts to bookmarks whose title or URL contains `term`.
    #[must_use]
    pub fn with_search_term(mut self, term: impl Into<String>) -> Self {
        self.search_term = Some(term.into().to_lowercase());
        self
    }

    /// Returns true if no criterion is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.category.is_none() && self.min_rating.is_none() && self.search_term.is_none()
    }
}

impl BookmarkPredicate for BookmarkFilter {
    fn matches(&self, bookmark: &BookmarkRef) -> bool {
        if let Some(category) = &self.category
            && &bookmark.category != category
        {
            return false;
        }

        if let Some(min) = self.min_rating
            && bookmark.rating.is_none_or(|r| r < min)
        {
            return false;
        }

        if let Some(term) = &self.search_term {
            let term = term.to_lowercase();
            if !bookmark.title.to_lowercase().contains(&term)
                && !bookmark.url.to_lowercase().contains(&term)
            {
                return false;
            }
        }

        true
    }
}
