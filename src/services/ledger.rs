//! Shown-set ledger service.
//!
//! Keeps the set of identifiers already shown in the current cycle and
//! writes it through to a [`LedgerBackend`] after every mutation.
//!
//! # Write-through semantics
//!
//! Each mutating call updates the in-memory state first and then saves. When
//! the save fails the call returns [`Error::Persistence`], but the in-memory
//! state keeps the change and remains authoritative for the rest of the
//! session. The next mutating call retries the save even if it changes
//! nothing itself.

use crate::models::{BookmarkId, LedgerState, Progress};
use crate::storage::traits::LedgerBackend;
use crate::{Error, Result};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::instrument;

/// Durable record of already-shown bookmarks.
pub struct ShownSetLedger {
    state: LedgerState,
    backend: Arc<dyn LedgerBackend>,
    /// Set when the last save failed, so the next mutation saves regardless.
    dirty: bool,
}

impl fmt::Debug for ShownSetLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShownSetLedger")
            .field("shown", &self.state.len())
            .field("total", &self.state.total_at_last_observation)
            .field("backend", &self.backend.location())
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl ShownSetLedger {
    /// Creates an empty ledger without reading the backend.
    #[must_use]
    pub fn empty(backend: Arc<dyn LedgerBackend>) -> Self {
        Self {
            state: LedgerState::new(),
            backend,
            dirty: false,
        }
    }

    /// Loads the ledger from the backend.
    ///
    /// A backend with nothing stored yields an empty ledger.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptState`] if the stored state is malformed.
    #[instrument(skip(backend), fields(location = %backend.location()))]
    pub fn load(backend: Arc<dyn LedgerBackend>) -> Result<Self> {
        let state = backend.load()?.unwrap_or_default();
        tracing::debug!(
            shown = state.len(),
            total = state.total_at_last_observation,
            "Loaded shown-set ledger"
        );

        Ok(Self {
            state,
            backend,
            dirty: false,
        })
    }

    /// Loads the ledger, falling back to an empty one if the stored state
    /// cannot be used.
    ///
    /// A corrupt file is moved aside before the fallback so the next save
    /// does not destroy it. The load error is handed back alongside the
    /// ledger for the caller to report.
    pub fn load_or_recover(backend: Arc<dyn LedgerBackend>) -> (Self, Option<Error>) {
        match Self::load(Arc::clone(&backend)) {
            Ok(ledger) => (ledger, None),
            Err(err) => {
                tracing::warn!(error = %err, "Starting from an empty ledger");
                metrics::counter!("ledger_recoveries_total").increment(1);

                if matches!(err, Error::CorruptState { .. }) {
                    match backend.quarantine() {
                        Ok(Some(moved)) => {
                            tracing::info!(path = %moved.display(), "Kept corrupt ledger for inspection");
                        },
                        Ok(None) => {},
                        Err(e) => tracing::warn!(error = %e, "Failed to move corrupt ledger aside"),
                    }
                }

                (Self::empty(backend), Some(err))
            },
        }
    }

    /// Records identifiers as shown.
    ///
    /// Identifiers already present are ignored. The watermark is raised to
    /// at least the new shown count. Returns the number of newly recorded
    /// identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if the save fails.
    #[instrument(skip(self, ids))]
    pub fn mark_shown(&mut self, ids: impl IntoIterator<Item = BookmarkId>) -> Result<usize> {
        let added = ids
            .into_iter()
            .map(|id| self.state.shown.insert(id))
            .filter(|inserted| *inserted)
            .count();

        let before = self.state.total_at_last_observation;
        self.state.total_at_last_observation = before.max(self.state.len());
        let changed = added > 0 || self.state.total_at_last_observation != before;

        if changed || self.dirty {
            self.persist("mark_shown")?;
        }

        tracing::debug!(added, shown = self.state.len(), "Marked bookmarks as shown");
        Ok(added)
    }

    /// Drops an identifier from the shown set.
    ///
    /// Returns whether it was present. Absent identifiers are not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if the save fails.
    #[instrument(skip(self), fields(id = %id))]
    pub fn remove(&mut self, id: &BookmarkId) -> Result<bool> {
        let removed = self.state.shown.remove(id);
        if removed || self.dirty {
            self.persist("remove_shown")?;
        }
        Ok(removed)
    }

    /// Clears the shown set and records the current eligible population.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if the save fails.
    #[instrument(skip(self))]
    pub fn reset(&mut self, eligible_total: usize) -> Result<()> {
        let cleared = self.state.len();
        self.state.shown.clear();
        self.state.total_at_last_observation = eligible_total;
        self.persist("reset_ledger")?;

        tracing::info!(cleared, eligible_total, "Reset shown-set ledger");
        metrics::counter!("ledger_resets_total").increment(1);
        Ok(())
    }

    /// Shown/total counters against a live eligible set.
    ///
    /// Duplicate identifiers in `eligible` count once. Identifiers in the
    /// ledger that are no longer eligible do not count as shown.
    pub fn progress<'a>(&self, eligible: impl IntoIterator<Item = &'a BookmarkId>) -> Progress {
        let eligible: HashSet<&BookmarkId> = eligible.into_iter().collect();
        let shown = eligible.iter().filter(|id| self.state.contains(id)).count();
        Progress::new(shown.min(eligible.len()), eligible.len())
    }

    /// Returns true if `id` has been shown in this cycle.
    #[must_use]
    pub fn contains(&self, id: &BookmarkId) -> bool {
        self.state.contains(id)
    }

    /// Current in-memory state.
    #[must_use]
    pub const fn state(&self) -> &LedgerState {
        &self.state
    }

    /// Returns true if the last save failed and has not been retried.
    #[must_use]
    pub const fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    fn persist(&mut self, operation: &str) -> Result<()> {
        match self.backend.save(&self.state) {
            Ok(()) => {
                self.dirty = false;
                Ok(())
            },
            Err(err) => {
                self.dirty = true;
                tracing::error!(operation, error = %err, "Ledger save failed");
                metrics::counter!("ledger_save_failures_total", "operation" => operation.to_string())
                    .increment(1);
                Err(match err {
                    e @ Error::Persistence { .. } => e,
                    other => Error::Persistence {
                        operation: operation.to_string(),
                        cause: other.to_string(),
                    },
                })
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FilesystemLedgerBackend, MemoryLedgerBackend};
    use std::fs;
    use tempfile::TempDir;

    fn ids(values: &[&str]) -> Vec<BookmarkId> {
        values.iter().map(|v| BookmarkId::from(*v)).collect()
    }

    #[test]
    fn test_load_missing_is_empty() {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(FilesystemLedgerBackend::in_dir(dir.path()));
        let ledger = ShownSetLedger::load(backend).unwrap();
        assert!(ledger.state().is_empty());
        assert_eq!(ledger.state().total_at_last_observation, 0);
    }

    #[test]
    fn test_mark_shown_is_idempotent() {
        let backend = Arc::new(MemoryLedgerBackend::new());
        let mut ledger = ShownSetLedger::empty(backend.clone());

        assert_eq!(ledger.mark_shown(ids(&["a", "b"])).unwrap(), 2);
        assert_eq!(ledger.mark_shown(ids(&["a", "b"])).unwrap(), 0);

        assert_eq!(ledger.state().len(), 2);
        assert_eq!(backend.save_count(), 1);
    }

    #[test]
    fn test_mark_shown_raises_watermark() {
        let backend = Arc::new(MemoryLedgerBackend::new());
        let mut ledger = ShownSetLedger::empty(backend.clone());
        ledger.mark_shown(ids(&["a", "b", "c"])).unwrap();

        assert_eq!(ledger.state().total_at_last_observation, 3);
        assert!(backend.snapshot().unwrap().is_consistent());
    }

    #[test]
    fn test_remove() {
        let backend = Arc::new(MemoryLedgerBackend::new());
        let mut ledger = ShownSetLedger::empty(backend.clone());
        ledger.mark_shown(ids(&["a", "b"])).unwrap();

        assert!(ledger.remove(&BookmarkId::from("a")).unwrap());
        assert!(!ledger.remove(&BookmarkId::from("zzz")).unwrap());
        assert!(!ledger.contains(&BookmarkId::from("a")));
        assert_eq!(backend.save_count(), 2);
    }

    #[test]
    fn test_reset_sets_watermark() {
        let backend = Arc::new(MemoryLedgerBackend::new());
        let mut ledger = ShownSetLedger::empty(backend.clone());
        ledger.mark_shown(ids(&["a", "b"])).unwrap();
        ledger.reset(7).unwrap();

        let saved = backend.snapshot().unwrap();
        assert!(saved.is_empty());
        assert_eq!(saved.total_at_last_observation, 7);
    }

    #[test]
    fn test_progress_ignores_stale_ids() {
        let mut ledger = ShownSetLedger::empty(Arc::new(MemoryLedgerBackend::new()));
        ledger.mark_shown(ids(&["a", "gone"])).unwrap();

        let eligible = ids(&["a", "b", "c", "a"]);
        let progress = ledger.progress(&eligible);
        assert_eq!(progress, Progress::new(1, 3));
    }

    #[test]
    fn test_failed_save_keeps_memory_state_and_retries() {
        let backend = Arc::new(MemoryLedgerBackend::new());
        let mut ledger = ShownSetLedger::empty(backend.clone());

        backend.set_fail_writes(true);
        let err = ledger.mark_shown(ids(&["a"])).unwrap_err();
        assert!(matches!(err, Error::Persistence { .. }));
        assert!(ledger.contains(&BookmarkId::from("a")));
        assert!(ledger.has_unsaved_changes());

        backend.set_fail_writes(false);
        assert_eq!(ledger.mark_shown(ids(&["a"])).unwrap(), 0);
        assert!(!ledger.has_unsaved_changes());
        assert!(backend.snapshot().unwrap().contains(&BookmarkId::from("a")));
    }

    #[test]
    fn test_load_or_recover_quarantines_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(FilesystemLedgerBackend::in_dir(dir.path()));
        fs::write(backend.path(), r#"{"shown_links": "not-a-list"}"#).unwrap();

        let (ledger, recovered) = ShownSetLedger::load_or_recover(backend.clone());
        assert!(ledger.state().is_empty());
        assert!(matches!(recovered, Some(Error::CorruptState { .. })));
        assert!(!backend.path().exists());

        let kept = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(std::result::Result::ok)
            .any(|entry| entry.file_name().to_string_lossy().contains(".corrupt."));
        assert!(kept);
    }

    #[test]
    fn test_load_or_recover_clean() {
        let backend = Arc::new(MemoryLedgerBackend::with_state(LedgerState::from_parts(
            ids(&["a"]),
            4,
        )));
        let (ledger, recovered) = ShownSetLedger::load_or_recover(backend);
        assert!(recovered.is_none());
        assert_eq!(ledger.state().total_at_last_observation, 4);
    }
}
