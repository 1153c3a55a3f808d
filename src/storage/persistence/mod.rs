//! Ledger persistence backend implementations.

mod filesystem;
mod memory;

pub use filesystem::{FilesystemLedgerBackend, LEDGER_FILE_NAME};
pub use memory::MemoryLedgerBackend;
