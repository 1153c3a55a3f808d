//! Results reported by the discovery engine.

use super::BookmarkRef;
use serde::{Deserialize, Serialize};

/// Outcome of one batch selection.
#[derive(Debug, Clone, Default)]
pub struct SelectionResult {
    /// The drawn bookmarks, in draw order. Not yet marked as shown.
    pub selected: Vec<BookmarkRef>,
    /// True when every eligible bookmark had already been shown and the
    /// history was reset to start a new cycle.
    ///
    /// This is an informational event, distinct from an empty selection.
    pub cycle_completed: bool,
    /// Number of distinct bookmarks that passed the filter.
    pub eligible_count: usize,
    /// Number of eligible bookmarks not yet shown, after any reset.
    pub unseen_count: usize,
}

impl SelectionResult {
    /// A selection over an empty eligible set.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            selected: Vec::new(),
            cycle_completed: false,
            eligible_count: 0,
            unseen_count: 0,
        }
    }

    /// Returns true if nothing was drawn.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}

/// Shown/total counters for the current cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Progress {
    /// Eligible bookmarks already shown in this cycle.
    pub shown: usize,
    /// Eligible bookmarks in total.
    pub total: usize,
}

impl Progress {
    /// Creates progress counters.
    #[must_use]
    pub const fn new(shown: usize, total: usize) -> Self {
        Self { shown, total }
    }

    /// Eligible bookmarks still waiting to be shown.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.total.saturating_sub(self.shown)
    }

    /// True once every eligible bookmark has been shown.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.total > 0 && self.shown >= self.total
    }
}

/// Engine cycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    /// Normal operation.
    #[default]
    Cycling,
    /// History was just reset; the caller has a one-time notice to show.
    JustReset,
}

impl EngineState {
    /// Returns the state as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cycling => "cycling",
            Self::JustReset => "just_reset",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_counters() {
        let progress = Progress::new(2, 5);
        assert_eq!(progress.remaining(), 3);
        assert!(!progress.is_complete());

        assert!(Progress::new(5, 5).is_complete());
        assert!(!Progress::new(0, 0).is_complete());
        assert_eq!(Progress::new(0, 0).remaining(), 0);
    }

    #[test]
    fn test_empty_selection() {
        let result = SelectionResult::empty();
        assert!(result.is_empty());
        assert!(!result.cycle_completed);
        assert_eq!(result.eligible_count, 0);
    }

    #[test]
    fn test_engine_state_str() {
        assert_eq!(EngineState::default(), EngineState::Cycling);
        assert_eq!(EngineState::JustReset.as_str(), "just_reset");
    }
}
