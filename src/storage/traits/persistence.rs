//! Ledger persistence backend trait.

use crate::Result;
use crate::models::LedgerState;
use std::path::PathBuf;

/// Trait for shown-set ledger persistence.
///
/// Backends are the durable copy of the ledger; the in-memory
/// [`ShownSetLedger`](crate::services::ShownSetLedger) stays authoritative
/// for the running process.
pub trait LedgerBackend: Send + Sync {
    /// Loads the persisted state.
    ///
    /// Returns `Ok(None)` when nothing has been persisted yet and
    /// [`Error::CorruptState`](crate::Error::CorruptState) when the stored
    /// data cannot be interpreted.
    fn load(&self) -> Result<Option<LedgerState>>;

    /// Persists the full state.
    ///
    /// Implementations must be crash-atomic: a reader never observes a
    /// partially written state. Failures are reported as
    /// [`Error::Persistence`](crate::Error::Persistence).
    fn save(&self, state: &LedgerState) -> Result<()>;

    /// Moves unreadable persisted state out of the way.
    ///
    /// Returns where it was moved to, if anywhere.
    fn quarantine(&self) -> Result<Option<PathBuf>> {
        Ok(None)
    }

    /// Human-readable location, used in logs and error messages.
    fn location(&self) -> String;
}
