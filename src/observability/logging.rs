//! Logging configuration.
//!
//! Filter directives are resolved in priority order:
//!
//! 1. `REKINDLE_LOG` (per-target directives, e.g. `rekindle=debug,warn`)
//! 2. `RUST_LOG`
//! 3. `[logging] level` from the config file
//! 4. `--verbose` → `warn,rekindle=debug`
//! 5. `warn`
//!
//! Unparseable directives at any level fall through to the next one.

use crate::config::LoggingSettings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Project-specific filter variable.
pub const LOG_ENV_VAR: &str = "REKINDLE_LOG";

/// Output format for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format name; anything other than `json` is pretty.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Filter directives for [`EnvFilter`].
    pub directives: String,
    /// Output format.
    pub format: LogFormat,
    /// Optional log file (stderr otherwise).
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directives: "warn".to_string(),
            format: LogFormat::Pretty,
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Builds logging configuration from settings and the process environment.
    #[must_use]
    pub fn from_settings(settings: Option<&LoggingSettings>, verbose: bool) -> Self {
        Self::from_lookup(settings, verbose, |key| std::env::var(key).ok())
    }

    /// Builds logging configuration from settings and an arbitrary lookup.
    #[must_use]
    pub fn from_lookup(
        settings: Option<&LoggingSettings>,
        verbose: bool,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let configured = settings.and_then(|s| s.level.clone());
        let fallback = if verbose { "warn,rekindle=debug" } else { "warn" };

        let directives = [lookup(LOG_ENV_VAR), lookup("RUST_LOG"), configured]
            .into_iter()
            .flatten()
            .find(|d| !d.trim().is_empty() && EnvFilter::try_new(d).is_ok())
            .unwrap_or_else(|| fallback.to_string());

        Self {
            directives,
            format: settings
                .and_then(|s| s.format.as_deref())
                .map(LogFormat::parse)
                .unwrap_or_default(),
            file: settings.and_then(|s| s.file.clone()),
        }
    }

    /// Builds the subscriber filter.
    #[must_use]
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.directives).unwrap_or_else(|_| EnvFilter::new("warn"))
    }
}
