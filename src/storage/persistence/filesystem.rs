//! Filesystem-based ledger backend.
//!
//! Stores the shown set as a single JSON file:
//!
//! ```json
//! {
//!   "shown_links": ["https://example.com", "https://rust-lang.org/learn"],
//!   "total_bookmarks": 42
//! }
//! ```
//!
//! # Atomicity
//!
//! Every save writes a sibling temp file, syncs it, renames it over the
//! target and syncs the parent directory. A crash at any point leaves either
//! the previous file or the new one, never a torn write. The bookmark
//! collection autosave writes a different path, so the two never contend.

use crate::models::{BookmarkId, LedgerState};
use crate::storage::traits::LedgerBackend;
use crate::{Error, Result, current_timestamp};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::instrument;

/// Default ledger file name.
pub const LEDGER_FILE_NAME: &str = "shown_links.json";

/// Maximum ledger file size (16MB).
/// Anything larger is treated as corrupt rather than read into memory.
const MAX_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Serializable ledger format.
#[derive(Debug, Serialize, Deserialize)]
struct StoredLedger {
    shown_links: Vec<String>,
    /// Absent in files written before the watermark existed.
    #[serde(default)]
    total_bookmarks: Option<u64>,
}

impl From<&LedgerState> for StoredLedger {
    fn from(state: &LedgerState) -> Self {
        Self {
            shown_links: state
                .sorted_ids()
                .into_iter()
                .map(|id| id.as_str().to_string())
                .collect(),
            total_bookmarks: Some(state.total_at_last_observation as u64),
        }
    }
}

impl StoredLedger {
    /// Converts to the in-memory form, rejecting watermark violations.
    fn into_state(self) -> std::result::Result<LedgerState, String> {
        let shown_count = self.shown_links.len();
        let mut state = LedgerState::from_parts(
            self.shown_links.into_iter().map(BookmarkId::from),
            0,
        );

        state.total_at_last_observation = match self.total_bookmarks {
            Some(total) => usize::try_from(total)
                .map_err(|_| format!("total_bookmarks out of range: {total}"))?,
            None => state.len(),
        };

        if !state.is_consistent() {
            return Err(format!(
                "{} shown identifiers exceed total_bookmarks {}",
                state.len(),
                state.total_at_last_observation
            ));
        }

        if state.len() != shown_count {
            tracing::debug!(
                stored = shown_count,
                unique = state.len(),
                "Collapsed duplicate identifiers in ledger file"
            );
        }

        Ok(state)
    }
}

/// Filesystem-based ledger backend.
#[derive(Debug, Clone)]
pub struct FilesystemLedgerBackend {
    /// Path of the ledger file.
    path: PathBuf,
}

impl FilesystemLedgerBackend {
    /// Creates a backend for the given file path.
    ///
    /// Nothing is touched on disk until the first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a backend for [`LEDGER_FILE_NAME`] inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(LEDGER_FILE_NAME))
    }

    /// Returns the ledger file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn corrupt(&self, cause: impl Into<String>) -> Error {
        Error::CorruptState {
            path: self.path.clone(),
            cause: cause.into(),
        }
    }

    fn persistence_error(operation: &str, e: &std::io::Error) -> Error {
        Error::Persistence {
            operation: operation.to_string(),
            cause: e.to_string(),
        }
    }

    /// Writes `data` to a temp file and renames it over the ledger.
    fn write_atomic(&self, data: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| Self::persistence_error("create_ledger_dir", &e))?;
        }

        let tmp_path = temporary_output_path(&self.path);
        let result = Self::write_and_rename(&tmp_path, &self.path, data);
        if result.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }
        result
    }

    fn write_and_rename(tmp_path: &Path, path: &Path, data: &[u8]) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(tmp_path)
            .map_err(|e| Self::persistence_error("open_ledger_tmp", &e))?;

        file.write_all(data)
            .map_err(|e| Self::persistence_error("write_ledger_tmp", &e))?;
        file.sync_all()
            .map_err(|e| Self::persistence_error("sync_ledger_tmp", &e))?;
        drop(file);

        fs::rename(tmp_path, path).map_err(|e| Self::persistence_error("rename_ledger", &e))?;
        sync_parent_directory(path)
    }
}

impl LedgerBackend for FilesystemLedgerBackend {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn load(&self) -> Result<Option<LedgerState>> {
        let metadata = match fs::metadata(&self.path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No ledger file, starting empty");
                return Ok(None);
            },
            Err(e) => return Err(self.corrupt(format!("cannot stat ledger: {e}"))),
        };

        if metadata.len() > MAX_FILE_SIZE {
            return Err(self.corrupt(format!(
                "ledger file exceeds maximum size of {MAX_FILE_SIZE} bytes"
            )));
        }

        let json = fs::read_to_string(&self.path)
            .map_err(|e| self.corrupt(format!("cannot read ledger: {e}")))?;

        let stored: StoredLedger =
            serde_json::from_str(&json).map_err(|e| self.corrupt(e.to_string()))?;

        let state = stored.into_state().map_err(|cause| self.corrupt(cause))?;

        tracing::debug!(
            shown = state.len(),
            total = state.total_at_last_observation,
            "Loaded ledger"
        );

        Ok(Some(state))
    }

    #[instrument(skip(self, state), fields(path = %self.path.display(), shown = state.len()))]
    fn save(&self, state: &LedgerState) -> Result<()> {
        let stored = StoredLedger::from(state);
        let json = serde_json::to_string_pretty(&stored).map_err(|e| Error::Persistence {
            operation: "serialize_ledger".to_string(),
            cause: e.to_string(),
        })?;

        self.write_atomic(json.as_bytes())?;
        metrics::counter!("ledger_saves_total").increment(1);
        Ok(())
    }

    fn quarantine(&self) -> Result<Option<PathBuf>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let mut backup = self.path.as_os_str().to_os_string();
        backup.push(format!(".corrupt.{}", current_timestamp()));
        let backup = PathBuf::from(backup);

        fs::rename(&self.path, &backup).map_err(|e| Error::OperationFailed {
            operation: "quarantine_ledger".to_string(),
            cause: e.to_string(),
        })?;

        tracing::warn!(backup = %backup.display(), "Moved corrupt ledger aside");
        Ok(Some(backup))
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Sibling temp path unique to this process and instant.
fn temporary_output_path(path: &Path) -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let pid = std::process::id();
    let mut os = path.as_os_str().to_os_string();
    os.push(format!(".tmp.{pid}.{now}"));
    PathBuf::from(os)
}

#[cfg(unix)]
fn sync_parent_directory(path: &Path) -> Result<()> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    fs::File::open(parent)
        .and_then(|dir| dir.sync_all())
        .map_err(|e| FilesystemLedgerBackend::persistence_error("sync_ledger_dir", &e))
}

#[cfg(not(unix))]
fn sync_parent_directory(_path: &Path) -> Result<()> {
    Ok(())
}
