//! In-memory ledger backend.
//!
//! Useful for tests and for embedding the engine where durability is
//! handled elsewhere. Writes can be made to fail on demand to exercise
//! persistence-error paths.

use crate::models::LedgerState;
use crate::storage::traits::LedgerBackend;
use crate::{Error, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// In-memory ledger backend.
#[derive(Debug, Default)]
pub struct MemoryLedgerBackend {
    state: Mutex<Option<LedgerState>>,
    fail_writes: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryLedgerBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend that already holds `state`.
    #[must_use]
    pub fn with_state(state: LedgerState) -> Self {
        Self {
            state: Mutex::new(Some(state)),
            ..Self::default()
        }
    }

    /// Makes subsequent saves fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Returns a copy of the last saved state.
    #[must_use]
    pub fn snapshot(&self) -> Option<LedgerState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl LedgerBackend for MemoryLedgerBackend {
    fn load(&self) -> Result<Option<LedgerState>> {
        Ok(self.snapshot())
    }

    fn save(&self, state: &LedgerState) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Persistence {
                operation: "save_ledger".to_string(),
                cause: "simulated write failure".to_string(),
            });
        }

        *self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(state.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookmarkId;

    #[test]
    fn test_roundtrip() {
        let backend = MemoryLedgerBackend::new();
        assert!(backend.load().unwrap().is_none());

        let state = LedgerState::from_parts(vec![BookmarkId::from("a")], 1);
        backend.save(&state).unwrap();
        assert_eq!(backend.load().unwrap(), Some(state));
        assert_eq!(backend.save_count(), 1);
    }

    #[test]
    fn test_fail_writes() {
        let backend = MemoryLedgerBackend::new();
        backend.set_fail_writes(true);

        let err = backend.save(&LedgerState::new()).unwrap_err();
        assert!(matches!(err, Error::Persistence { .. }));
        assert_eq!(backend.save_count(), 0);

        backend.set_fail_writes(false);
        backend.save(&LedgerState::new()).unwrap();
        assert_eq!(backend.save_count(), 1);
    }
}
