//! In-memory form of the shown-set ledger.

use super::BookmarkId;
use std::collections::HashSet;

/// The shown set plus the population watermark it was last computed against.
///
/// Invariant: `shown.len() <= total_at_last_observation`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerState {
    /// Identifiers already shown in the current cycle.
    pub shown: HashSet<BookmarkId>,
    /// Size of the eligible population at the last observation.
    pub total_at_last_observation: usize,
}

impl LedgerState {
    /// Creates an empty ledger state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a state from identifiers and a watermark.
    ///
    /// Duplicate identifiers collapse. The watermark is taken as given, so
    /// the result may violate the invariant; check with
    /// [`is_consistent`](Self::is_consistent).
    #[must_use]
    pub fn from_parts(shown: impl IntoIterator<Item = BookmarkId>, total: usize) -> Self {
        Self {
            shown: shown.into_iter().collect(),
            total_at_last_observation: total,
        }
    }

    /// Number of shown identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shown.len()
    }

    /// Returns true if nothing has been shown.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shown.is_empty()
    }

    /// Returns true if `id` has been shown.
    #[must_use]
    pub fn contains(&self, id: &BookmarkId) -> bool {
        self.shown.contains(id)
    }

    /// Returns true if the shown set fits under the watermark.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.shown.len() <= self.total_at_last_observation
    }

    /// Shown identifiers in sorted order.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<&BookmarkId> {
        let mut ids: Vec<&BookmarkId> = self.shown.iter().collect();
        ids.sort();
        ids
    }
}
