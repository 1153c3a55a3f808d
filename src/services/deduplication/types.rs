//! Duplicate detection result types.

use crate::models::{BookmarkId, BookmarkRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Why bookmarks were grouped together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterReason {
    /// The URLs normalize to the same key.
    ExactUrl,
    /// The titles are similar above the threshold.
    SimilarTitle,
}

impl ClusterReason {
    /// Returns the reason as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ExactUrl => "exact_url",
            Self::SimilarTitle => "similar_title",
        }
    }
}

impl fmt::Display for ClusterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One bookmark inside a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterMember {
    /// Bookmark identifier.
    pub id: BookmarkId,
    /// URL as the collection stores it.
    pub url: String,
    /// Display title.
    pub title: String,
    /// When the bookmark was added.
    pub added_at: DateTime<Utc>,
}

impl From<&BookmarkRef> for ClusterMember {
    fn from(bookmark: &BookmarkRef) -> Self {
        Self {
            id: bookmark.id.clone(),
            url: bookmark.url.clone(),
            title: bookmark.title.clone(),
            added_at: bookmark.added_at,
        }
    }
}

/// Two or more bookmarks judged to be the same thing.
///
/// Members are ordered oldest first (ties by identifier, then URL), so the
/// first member is always the representative.
///
/// # Example
///
/// ```rust
/// use rekindle::services::deduplication::{ClusterMember, ClusterReason, DuplicateCluster};
/// use rekindle::BookmarkRef;
///
/// let a = BookmarkRef::new("https://a.example", "https://a.example/", "A");
/// let b = BookmarkRef::new("https://a.example", "HTTPS://A.example", "A again");
/// let cluster = DuplicateCluster::new(
///     vec![ClusterMember::from(&b), ClusterMember::from(&a)],
///     1.0,
///     ClusterReason::ExactUrl,
/// );
/// assert_eq!(cluster.len(), 2);
/// assert_eq!(cluster.members[0].url, "HTTPS://A.example");
/// assert_eq!(cluster.redundant().count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateCluster {
    /// Members, representative first.
    pub members: Vec<ClusterMember>,
    /// Identifier of the member to keep.
    pub representative: BookmarkId,
    /// Confidence in `[0, 1]`. Exact URL clusters are always `1.0`.
    pub confidence: f64,
    /// How the cluster was formed.
    pub reason: ClusterReason,
}

impl DuplicateCluster {
    /// Creates a cluster, ordering members and picking the representative.
    ///
    /// Callers pass at least two members.
    #[must_use]
    pub fn new(mut members: Vec<ClusterMember>, confidence: f64, reason: ClusterReason) -> Self {
        members.sort_by(|a, b| {
            a.added_at
                .cmp(&b.added_at)
                .then_with(|| a.id.cmp(&b.id))
                .then_with(|| a.url.cmp(&b.url))
        });
        let representative = members
            .first()
            .map(|m| m.id.clone())
            .unwrap_or_else(|| BookmarkId::new(String::new()));

        Self {
            members,
            representative,
            confidence: confidence.clamp(0.0, 1.0),
            reason,
        }
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns true if the cluster has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members other than the representative.
    pub fn redundant(&self) -> impl Iterator<Item = &ClusterMember> {
        self.members.iter().skip(1)
    }
}

/// Result of one detection run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionOutcome {
    /// Clusters, sorted by representative.
    pub clusters: Vec<DuplicateCluster>,
    /// True if the run stopped early. Clusters found so far are kept.
    pub cancelled: bool,
    /// Title pairs actually scored.
    pub comparisons: u64,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl DetectionOutcome {
    /// Total bookmarks that belong to some cluster.
    #[must_use]
    pub fn clustered_count(&self) -> usize {
        self.clusters.iter().map(DuplicateCluster::len).sum()
    }

    /// Bookmarks that could be removed while keeping every representative.
    #[must_use]
    pub fn redundant_count(&self) -> usize {
        self.clusters.iter().map(|c| c.len().saturating_sub(1)).sum()
    }
}

/// Cooperative cancellation signal shared with a running detection.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    /// Creates an unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
