//! Configuration management.
//!
//! Settings come from, in increasing priority:
//!
//! 1. Built-in defaults
//! 2. A TOML file (`--config`, `REKINDLE_CONFIG_PATH`, or the platform
//!    config directory)
//! 3. `REKINDLE_*` environment variables
//! 4. Command-line flags (applied by the binary)
//!
//! # Example file
//!
//! ```toml
//! data_dir = "/home/me/.local/share/rekindle"
//! collection_path = "/home/me/bookmarks/autosave.json"
//!
//! [discovery]
//! default_batch_size = 8
//!
//! [duplicates]
//! threshold = 0.85
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```

use crate::services::DeduplicationConfig;
use crate::storage::LEDGER_FILE_NAME;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application directory name under the platform config/data dirs.
const APP_DIR: &str = "rekindle";

/// Default collection file name inside the data directory.
pub const DEFAULT_COLLECTION_FILE: &str = "bookmarks.json";

/// Main configuration for rekindle.
#[derive(Debug, Clone, Serialize)]
pub struct RekindleConfig {
    /// Directory holding the ledger (and the collection unless overridden).
    pub data_dir: PathBuf,
    /// Explicit collection file; defaults to `<data_dir>/bookmarks.json`.
    pub collection_path: Option<PathBuf>,
    /// Ledger file name inside `data_dir`.
    pub ledger_file: String,
    /// Discovery settings.
    pub discovery: DiscoverySettings,
    /// Duplicate detection settings.
    pub duplicates: DuplicateSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Batch selection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoverySettings {
    /// Batch size when none is given.
    pub default_batch_size: usize,
    /// Upper bound on any requested batch size.
    pub max_batch_size: usize,
    /// Treat scheme-less URLs as `https://` when building identifiers.
    pub assume_https: bool,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            default_batch_size: 5,
            max_batch_size: 100,
            assume_https: true,
        }
    }
}

impl DiscoverySettings {
    /// Resolves a requested batch size against the configured bounds.
    ///
    /// `None` picks the default; anything above the maximum is capped.
    /// Zero passes through so the engine can reject it.
    #[must_use]
    pub fn batch_size(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_batch_size)
            .min(self.max_batch_size)
    }
}

/// Duplicate detection settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateSettings {
    /// Minimum title similarity in `(0, 1]`.
    pub threshold: f64,
    /// Signature bands.
    pub bands: usize,
    /// MinHash rows per band.
    pub rows_per_band: usize,
    /// Characters per shingle.
    pub shingle_size: usize,
    /// Shorter normalized titles skip the title pass.
    pub min_title_length: usize,
}

impl Default for DuplicateSettings {
    fn default() -> Self {
        let defaults = DeduplicationConfig::default();
        Self {
            threshold: defaults.threshold,
            bands: defaults.bands,
            rows_per_band: defaults.rows_per_band,
            shingle_size: defaults.shingle_size,
            min_title_length: defaults.min_title_length,
        }
    }
}

impl DuplicateSettings {
    /// Converts to the detector's configuration.
    #[must_use]
    pub const fn to_dedup_config(&self) -> DeduplicationConfig {
        DeduplicationConfig {
            threshold: self.threshold,
            bands: self.bands,
            rows_per_band: self.rows_per_band,
            shingle_size: self.shingle_size,
            min_title_length: self.min_title_length,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoggingSettings {
    /// Filter directive, e.g. `info` or `rekindle=debug`.
    pub level: Option<String>,
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Append logs to this file instead of stderr.
    pub file: Option<PathBuf>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Data directory.
    pub data_dir: Option<String>,
    /// Collection file.
    pub collection_path: Option<String>,
    /// Ledger file name.
    pub ledger_file: Option<String>,
    /// Discovery section.
    pub discovery: Option<ConfigFileDiscovery>,
    /// Duplicates section.
    pub duplicates: Option<ConfigFileDuplicates>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
}

/// Discovery section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileDiscovery {
    /// Default batch size.
    pub default_batch_size: Option<usize>,
    /// Maximum batch size.
    pub max_batch_size: Option<usize>,
    /// Assume `https://` for scheme-less URLs.
    pub assume_https: Option<bool>,
}

/// Duplicates section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileDuplicates {
    /// Similarity threshold.
    pub threshold: Option<f64>,
    /// Signature bands.
    pub bands: Option<usize>,
    /// Rows per band.
    pub rows_per_band: Option<usize>,
    /// Shingle size.
    pub shingle_size: Option<usize>,
    /// Minimum title length.
    pub min_title_length: Option<usize>,
}

/// Logging section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLogging {
    /// Filter directive.
    pub level: Option<String>,
    /// Output format.
    pub format: Option<String>,
    /// Log file path.
    pub file: Option<String>,
}

impl Default for RekindleConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            collection_path: None,
            ledger_file: LEDGER_FILE_NAME.to_string(),
            discovery: DiscoverySettings::default(),
            duplicates: DuplicateSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// Platform data directory, or `.rekindle` when no home directory exists.
fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".rekindle"),
        |dirs| dirs.data_dir().join(APP_DIR),
    )
}

impl RekindleConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        Self::parse(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or names unknown keys.
    pub fn parse(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })?;

        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/rekindle/` on macOS)
    /// 2. XDG config dir (`~/.config/rekindle/` for Unix compatibility)
    ///
    /// Returns default configuration if no config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let platform_config = base_dirs.config_dir().join(APP_DIR).join("config.toml");
        if platform_config.exists() {
            match Self::load_from_file(&platform_config) {
                Ok(config) => return config,
                Err(e) => tracing::warn!(path = %platform_config.display(), error = %e, "Ignoring config file"),
            }
        }

        let xdg_config = base_dirs
            .home_dir()
            .join(".config")
            .join(APP_DIR)
            .join("config.toml");
        if xdg_config.exists() {
            match Self::load_from_file(&xdg_config) {
                Ok(config) => return config,
                Err(e) => tracing::warn!(path = %xdg_config.display(), error = %e, "Ignoring config file"),
            }
        }

        Self::default()
    }

    /// Converts a `ConfigFile` to `RekindleConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(data_dir) = file.data_dir {
            config.data_dir = PathBuf::from(data_dir);
        }
        config.collection_path = file.collection_path.map(PathBuf::from);
        if let Some(ledger_file) = file.ledger_file {
            config.ledger_file = ledger_file;
        }
        if let Some(discovery) = file.discovery {
            if let Some(v) = discovery.default_batch_size {
                config.discovery.default_batch_size = v;
            }
            if let Some(v) = discovery.max_batch_size {
                config.discovery.max_batch_size = v;
            }
            if let Some(v) = discovery.assume_https {
                config.discovery.assume_https = v;
            }
        }
        if let Some(duplicates) = file.duplicates {
            if let Some(v) = duplicates.threshold {
                config.duplicates.threshold = v;
            }
            if let Some(v) = duplicates.bands {
                config.duplicates.bands = v;
            }
            if let Some(v) = duplicates.rows_per_band {
                config.duplicates.rows_per_band = v;
            }
            if let Some(v) = duplicates.shingle_size {
                config.duplicates.shingle_size = v;
            }
            if let Some(v) = duplicates.min_title_length {
                config.duplicates.min_title_length = v;
            }
        }
        if let Some(logging) = file.logging {
            config.logging.level = logging.level;
            config.logging.format = logging.format;
            config.logging.file = logging.file.map(PathBuf::from);
        }

        config
    }

    /// Applies `REKINDLE_*` environment overrides.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary variable lookup.
    ///
    /// Unparseable numeric values are logged and ignored.
    #[must_use]
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = lookup("REKINDLE_DATA_DIR").filter(|v| !v.trim().is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("REKINDLE_COLLECTION").filter(|v| !v.trim().is_empty()) {
            self.collection_path = Some(PathBuf::from(path));
        }
        if let Some(raw) = lookup("REKINDLE_BATCH_SIZE") {
            match raw.trim().parse() {
                Ok(size) => self.discovery.default_batch_size = size,
                Err(_) => tracing::warn!(value = %raw, "Ignoring REKINDLE_BATCH_SIZE"),
            }
        }
        if let Some(raw) = lookup("REKINDLE_DUP_THRESHOLD") {
            match raw.trim().parse() {
                Ok(threshold) => self.duplicates.threshold = threshold,
                Err(_) => tracing::warn!(value = %raw, "Ignoring REKINDLE_DUP_THRESHOLD"),
            }
        }
        self
    }

    /// Checks that the settings are usable together.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for a zero or inverted batch size
    /// range, an empty ledger file name, or invalid duplicate settings.
    pub fn validate(&self) -> Result<()> {
        let discovery = &self.discovery;
        if discovery.default_batch_size == 0 || discovery.max_batch_size == 0 {
            return Err(Error::InvalidArgument(
                "batch sizes must be at least 1".to_string(),
            ));
        }
        if discovery.default_batch_size > discovery.max_batch_size {
            return Err(Error::InvalidArgument(format!(
                "default_batch_size ({}) exceeds max_batch_size ({})",
                discovery.default_batch_size, discovery.max_batch_size
            )));
        }
        if self.ledger_file.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "ledger_file must not be empty".to_string(),
            ));
        }
        self.duplicates.to_dedup_config().validate()
    }

    /// Path of the collection file.
    #[must_use]
    pub fn collection_path(&self) -> PathBuf {
        self.collection_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join(DEFAULT_COLLECTION_FILE))
    }

    /// Path of the ledger file.
    #[must_use]
    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(&self.ledger_file)
    }

    /// Sets the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }

    /// Sets the collection file.
    #[must_use]
    pub fn with_collection_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.collection_path = Some(path.into());
        self
    }
}
