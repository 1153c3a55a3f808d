//! URL canonicalization.
//!
//! Turns a raw URL into the comparison key used as a bookmark identifier,
//! so trivially different spellings of the same address collapse:
//!
//! | Input | Key |
//! |-------|-----|
//! | `HTTPS://Example.COM/` | `https://example.com` |
//! | `http://example.com:80/a` | `http://example.com/a` |
//! | `https://example.com/?b=2&a=1` | `https://example.com/?a=1&b=2` |
//! | `https://example.com/Docs` | `https://example.com/Docs` |
//!
//! Path case is preserved; only scheme and host are folded.

use crate::models::BookmarkId;
use crate::{Error, Result};
use std::fmt::Write as _;
use url::Url;
use url::form_urlencoded;

/// URL normalizer.
///
/// # Example
///
/// ```rust
/// use rekindle::UrlNormalizer;
///
/// let key = UrlNormalizer::normalize("HTTP://Example.com:80/?z=1&a=2").unwrap();
/// assert_eq!(key, "http://example.com/?a=2&z=1");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlNormalizer {
    /// Prefix `https://` onto input that has no scheme separator.
    assume_https: bool,
}

impl UrlNormalizer {
    /// Creates a strict normalizer: input without a scheme is rejected.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            assume_https: false,
        }
    }

    /// Sets whether scheme-less input like `example.com/page` is treated as
    /// `https://example.com/page`.
    #[must_use]
    pub const fn with_assume_https(mut self, assume_https: bool) -> Self {
        self.assume_https = assume_https;
        self
    }

    /// Normalizes with the strict rules.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when the string has no scheme, cannot
    /// be parsed, or has an empty host.
    pub fn normalize(raw: &str) -> Result<String> {
        Self::new().apply(raw)
    }

    /// Normalizes using this normalizer's options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for unparseable input.
    pub fn apply(&self, raw: &str) -> Result<String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("URL is empty".to_string()));
        }

        let parsed = if self.assume_https && !trimmed.contains("://") {
            Url::parse(&format!("https://{trimmed}"))
        } else {
            Url::parse(trimmed)
        }
        .map_err(|e| Error::InvalidInput(format!("cannot parse URL '{trimmed}': {e}")))?;

        let host = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::InvalidInput(format!("URL has no host: '{trimmed}'")))?;

        Ok(serialize(&parsed, host))
    }

    /// Returns the identifier for a raw URL.
    ///
    /// Unparseable input is passed through (trimmed) as its own key so that
    /// odd entries in a collection still get a stable identity.
    #[must_use]
    pub fn identifier_for(&self, raw: &str) -> BookmarkId {
        self.apply(raw).map_or_else(
            |e| {
                tracing::debug!(error = %e, "Using raw URL as identifier");
                BookmarkId::new(raw.trim())
            },
            BookmarkId::from,
        )
    }
}

/// Rebuilds the URL from its parts with the canonical choices applied.
fn serialize(parsed: &Url, host: &str) -> String {
    let mut out = String::with_capacity(parsed.as_str().len());
    out.push_str(&parsed.scheme().to_ascii_lowercase());
    out.push_str("://");

    let username = parsed.username();
    if !username.is_empty() || parsed.password().is_some() {
        out.push_str(username);
        if let Some(password) = parsed.password() {
            out.push(':');
            out.push_str(password);
        }
        out.push('@');
    }

    out.push_str(&host.to_lowercase());

    // `port()` already omits the scheme's default port.
    if let Some(port) = parsed.port() {
        let _ = write!(out, ":{port}");
    }

    let path = parsed.path();
    if path != "/" {
        out.push_str(path);
    }

    if let Some(query) = sorted_query(parsed) {
        if path == "/" {
            out.push('/');
        }
        out.push('?');
        out.push_str(&query);
    }

    if let Some(fragment) = parsed.fragment() {
        out.push('#');
        out.push_str(fragment);
    }

    out
}

/// Query pairs sorted by key, then value. `None` for an absent or empty query.
fn sorted_query(parsed: &Url) -> Option<String> {
    let mut pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
    if pairs.is_empty() {
        return None;
    }
    pairs.sort();

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in &pairs {
        serializer.append_pair(key, value);
    }
    Some(serializer.finish())
}
