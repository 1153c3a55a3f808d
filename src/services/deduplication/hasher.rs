//! Title hashing for candidate bucketing.
//!
//! Titles are normalized, cut into overlapping character shingles and
//! summarized by a MinHash signature. The signature is split into bands; two
//! titles that agree on every row of any band land in the same bucket and
//! become a candidate pair. Only candidate pairs are ever compared, which
//! keeps detection near-linear when most titles are unrelated.

use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// Fixed seed so signatures are identical across runs and machines.
const SEED_BASE: u64 = 0x5EED_B00C_4A11_0F0F;

/// Bucket key: band index plus the hash of that band's rows.
pub type BandKey = (usize, u64);

/// MinHash signature builder for bookmark titles.
///
/// # Example
///
/// ```rust
/// use rekindle::services::deduplication::TitleHasher;
///
/// let hasher = TitleHasher::new(3, 8, 2);
/// let a = hasher.signature(&TitleHasher::normalize("The Rust Book"));
/// let b = hasher.signature(&TitleHasher::normalize("the rust book!"));
/// assert_eq!(a, b);
/// assert_eq!(hasher.band_keys(&a).len(), 8);
/// ```
#[derive(Debug, Clone)]
pub struct TitleHasher {
    shingle_size: usize,
    bands: usize,
    rows_per_band: usize,
    seeds: Vec<u64>,
}

impl TitleHasher {
    /// Creates a hasher with `bands * rows_per_band` hash functions.
    ///
    /// Zero values are raised to one.
    #[must_use]
    pub fn new(shingle_size: usize, bands: usize, rows_per_band: usize) -> Self {
        let bands = bands.max(1);
        let rows_per_band = rows_per_band.max(1);
        let seeds = (0..bands * rows_per_band)
            .map(|i| mix64(SEED_BASE.wrapping_add(i as u64)))
            .collect();

        Self {
            shingle_size: shingle_size.max(1),
            bands,
            rows_per_band,
            seeds,
        }
    }

    /// Normalizes a title for comparison.
    ///
    /// Lowercases, turns punctuation into spaces and collapses whitespace.
    #[must_use]
    pub fn normalize(title: &str) -> String {
        title
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { ' ' })
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Hashes of the character shingles of a normalized title.
    ///
    /// A title shorter than the shingle size is a single shingle. An empty
    /// title has none.
    #[must_use]
    pub fn shingles(&self, normalized: &str) -> HashSet<u64> {
        let chars: Vec<char> = normalized.chars().collect();
        if chars.is_empty() {
            return HashSet::new();
        }
        if chars.len() <= self.shingle_size {
            return std::iter::once(base_hash(normalized)).collect();
        }

        chars
            .windows(self.shingle_size)
            .map(|window| base_hash(&window.iter().collect::<String>()))
            .collect()
    }

    /// MinHash signature of a normalized title.
    ///
    /// An empty title yields an all-`u64::MAX` signature.
    #[must_use]
    pub fn signature(&self, normalized: &str) -> Vec<u64> {
        let shingles = self.shingles(normalized);
        self.seeds
            .iter()
            .map(|seed| {
                shingles
                    .iter()
                    .map(|h| mix64(h ^ seed))
                    .min()
                    .unwrap_or(u64::MAX)
            })
            .collect()
    }

    /// One bucket key per band of `signature`.
    #[must_use]
    pub fn band_keys(&self, signature: &[u64]) -> Vec<BandKey> {
        signature
            .chunks(self.rows_per_band)
            .take(self.bands)
            .enumerate()
            .map(|(band, rows)| {
                let hash = rows
                    .iter()
                    .fold(mix64(band as u64), |acc, row| mix64(acc ^ row));
                (band, hash)
            })
            .collect()
    }
}

/// First eight bytes of the SHA-256 digest.
fn base_hash(shingle: &str) -> u64 {
    let digest = Sha256::digest(shingle.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// SplitMix64 finalizer.
const fn mix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
