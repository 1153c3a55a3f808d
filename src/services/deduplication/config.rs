//! Duplicate detection configuration.
//!
//! Controls the similarity threshold and the shape of the MinHash signature
//! used to bucket titles before pairwise comparison.

use crate::{Error, Result};

/// Configuration for the duplicate detector.
///
/// Built from the `[duplicates]` section of the application config; see
/// [`DuplicateSettings`](crate::config::DuplicateSettings).
///
/// # Tuning
///
/// Two titles with Jaccard similarity `s` share at least one band with
/// probability `1 - (1 - s^r)^b` for `b` bands of `r` rows. The defaults
/// catch pairs above roughly 0.5 shingle overlap almost always while keeping
/// unrelated titles in separate buckets.
///
/// # Example
///
/// ```rust
/// use rekindle::services::deduplication::DeduplicationConfig;
///
/// let config = DeduplicationConfig::default();
/// assert_eq!(config.bands, 8);
/// assert_eq!(config.signature_len(), 16);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DeduplicationConfig {
    /// Minimum title similarity in `(0, 1]` for two bookmarks to cluster.
    pub threshold: f64,

    /// Number of signature bands.
    pub bands: usize,

    /// MinHash rows per band.
    pub rows_per_band: usize,

    /// Characters per shingle.
    pub shingle_size: usize,

    /// Normalized titles shorter than this take no part in the title pass.
    ///
    /// Very short titles ("Home", "Docs") collide constantly without being
    /// duplicates.
    pub min_title_length: usize,
}

impl DeduplicationConfig {
    /// Total MinHash values per signature.
    #[must_use]
    pub const fn signature_len(&self) -> usize {
        self.bands * self.rows_per_band
    }

    /// Checks that every setting is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the threshold is outside
    /// `(0, 1]` or any count is zero.
    pub fn validate(&self) -> Result<()> {
        validate_threshold(self.threshold)?;
        if self.bands == 0 || self.rows_per_band == 0 || self.shingle_size == 0 {
            return Err(Error::InvalidArgument(format!(
                "bands ({}), rows_per_band ({}) and shingle_size ({}) must be at least 1",
                self.bands, self.rows_per_band, self.shingle_size
            )));
        }
        Ok(())
    }

    /// Builder method to set the similarity threshold.
    #[must_use]
    pub const fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Builder method to set the band count.
    #[must_use]
    pub const fn with_bands(mut self, bands: usize) -> Self {
        self.bands = bands;
        self
    }

    /// Builder method to set rows per band.
    #[must_use]
    pub const fn with_rows_per_band(mut self, rows: usize) -> Self {
        self.rows_per_band = rows;
        self
    }

    /// Builder method to set the shingle size.
    #[must_use]
    pub const fn with_shingle_size(mut self, size: usize) -> Self {
        self.shingle_size = size;
        self
    }

    /// Builder method to set the minimum title length.
    #[must_use]
    pub const fn with_min_title_length(mut self, length: usize) -> Self {
        self.min_title_length = length;
        self
    }
}

impl Default for DeduplicationConfig {
    fn default() -> Self {
        Self {
            threshold: 0.90,
            bands: 8,
            rows_per_band: 2,
            shingle_size: 3,
            min_title_length: 4,
        }
    }
}

/// Rejects thresholds outside `(0, 1]`, including NaN.
pub(crate) fn validate_threshold(threshold: f64) -> Result<()> {
    if threshold > 0.0 && threshold <= 1.0 {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!(
            "threshold must be in (0, 1], got {threshold}"
        )))
    }
}
