//! Duplicate detector.
//!
//! Runs two passes over a snapshot of the collection:
//!
//! 1. **Exact URL**: bookmarks whose URLs normalize to the same key form a
//!    cluster with confidence `1.0`.
//! 2. **Similar title**: remaining bookmarks are bucketed by MinHash bands
//!    and only pairs sharing a bucket are scored with the configured
//!    [`TitleSimilarity`]. Pairs at or above the threshold are merged with
//!    union-find; a cluster's confidence is the lowest score among the
//!    above-threshold pairs inside it. Every candidate pair is scored, so
//!    neither membership nor confidence depends on collection order.
//!
//! Detection is pure CPU work. [`DuplicateDetector::spawn`] moves it onto
//! tokio's blocking pool and hands back a [`DetectionHandle`] that can cancel
//! it. Cancellation is checked between the passes and before every bucket.

use super::config::validate_threshold;
use super::{
    CancellationFlag, ClusterMember, ClusterReason, DeduplicationConfig, DetectionOutcome,
    DuplicateCluster, NormalizedLevenshtein, TitleHasher, TitleSimilarity,
};
use crate::models::BookmarkRef;
use crate::services::UrlNormalizer;
use crate::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::instrument;

/// Groups bookmarks into duplicate clusters.
///
/// # Example
///
/// ```rust
/// use rekindle::services::deduplication::{DeduplicationConfig, DuplicateDetector};
/// use rekindle::BookmarkRef;
///
/// let pool = vec![
///     BookmarkRef::new("https://example.com", "https://example.com/", "Example"),
///     BookmarkRef::new("https://example.com", "HTTPS://EXAMPLE.com", "Example"),
/// ];
/// let detector = DuplicateDetector::new(DeduplicationConfig::default());
/// let outcome = detector.find_clusters(&pool, 0.9).unwrap();
/// assert_eq!(outcome.clusters.len(), 1);
/// ```
#[derive(Clone)]
pub struct DuplicateDetector {
    config: DeduplicationConfig,
    hasher: TitleHasher,
    similarity: Arc<dyn TitleSimilarity>,
    normalizer: UrlNormalizer,
}

impl fmt::Debug for DuplicateDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DuplicateDetector")
            .field("config", &self.config)
            .field("similarity", &self.similarity.name())
            .field("normalizer", &self.normalizer)
            .finish_non_exhaustive()
    }
}

impl DuplicateDetector {
    /// Creates a detector using normalized Levenshtein title similarity.
    #[must_use]
    pub fn new(config: DeduplicationConfig) -> Self {
        let hasher = TitleHasher::new(config.shingle_size, config.bands, config.rows_per_band);
        Self {
            config,
            hasher,
            similarity: Arc::new(NormalizedLevenshtein),
            normalizer: UrlNormalizer::new(),
        }
    }

    /// Replaces the title similarity measure.
    #[must_use]
    pub fn with_similarity(mut self, similarity: Arc<dyn TitleSimilarity>) -> Self {
        self.similarity = similarity;
        self
    }

    /// Replaces the URL normalizer used by the exact pass.
    #[must_use]
    pub const fn with_normalizer(mut self, normalizer: UrlNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &DeduplicationConfig {
        &self.config
    }

    /// Runs detection with the configured threshold.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the configured threshold is
    /// outside `(0, 1]`.
    pub fn detect(&self, pool: &[BookmarkRef]) -> Result<DetectionOutcome> {
        self.find_clusters(pool, self.config.threshold)
    }

    /// Groups `pool` into duplicate clusters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `threshold` is outside `(0, 1]`.
    pub fn find_clusters(&self, pool: &[BookmarkRef], threshold: f64) -> Result<DetectionOutcome> {
        self.find_clusters_with_cancel(pool, threshold, &CancellationFlag::new())
    }

    /// Groups `pool` into duplicate clusters, stopping early once `cancel`
    /// is set.
    ///
    /// A cancelled run returns every exact URL cluster plus the title
    /// clusters formed from buckets processed before the stop, with
    /// [`DetectionOutcome::cancelled`] set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `threshold` is outside `(0, 1]`.
    #[instrument(skip(self, pool, cancel), fields(pool_size = pool.len(), similarity = self.similarity.name()))]
    pub fn find_clusters_with_cancel(
        &self,
        pool: &[BookmarkRef],
        threshold: f64,
        cancel: &CancellationFlag,
    ) -> Result<DetectionOutcome> {
        validate_threshold(threshold)?;
        let start = Instant::now();

        let (mut clusters, exact_members) = self.exact_pass(pool);
        let exact_count = clusters.len();

        let mut outcome = DetectionOutcome::default();
        if cancel.is_cancelled() {
            outcome.cancelled = true;
        } else {
            let remaining: Vec<&BookmarkRef> = pool
                .iter()
                .enumerate()
                .filter(|(i, _)| !exact_members.contains(i))
                .map(|(_, b)| b)
                .collect();
            let title_pass = self.title_pass(&remaining, threshold, cancel);
            clusters.extend(title_pass.clusters);
            outcome.comparisons = title_pass.comparisons;
            outcome.cancelled = title_pass.cancelled;
        }

        clusters.sort_by(|a, b| {
            a.representative
                .cmp(&b.representative)
                .then_with(|| a.members[0].url.cmp(&b.members[0].url))
                .then_with(|| a.reason.as_str().cmp(b.reason.as_str()))
        });
        outcome.clusters = clusters;
        outcome.duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        metrics::counter!(
            "duplicate_detection_runs_total",
            "cancelled" => outcome.cancelled.to_string()
        )
        .increment(1);
        metrics::counter!("duplicate_detection_comparisons_total").increment(outcome.comparisons);
        metrics::histogram!("duplicate_detection_duration_ms").record(start.elapsed().as_secs_f64() * 1000.0);

        tracing::info!(
            exact_clusters = exact_count,
            title_clusters = outcome.clusters.len() - exact_count,
            comparisons = outcome.comparisons,
            cancelled = outcome.cancelled,
            duration_ms = outcome.duration_ms,
            "Duplicate detection finished"
        );

        Ok(outcome)
    }

    /// Runs detection on tokio's blocking pool.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `threshold` is outside `(0, 1]`.
    /// Nothing is spawned in that case.
    pub fn spawn(self: &Arc<Self>, pool: Vec<BookmarkRef>, threshold: f64) -> Result<DetectionHandle> {
        validate_threshold(threshold)?;

        let cancel = CancellationFlag::new();
        let flag = cancel.clone();
        let detector = Arc::clone(self);
        let task = tokio::task::spawn_blocking(move || {
            detector.find_clusters_with_cancel(&pool, threshold, &flag)
        });

        tracing::debug!("Spawned background duplicate detection");
        Ok(DetectionHandle { cancel, task })
    }

    /// Buckets by normalized URL. Returns the clusters and the pool indices
    /// they cover.
    fn exact_pass(&self, pool: &[BookmarkRef]) -> (Vec<DuplicateCluster>, HashSet<usize>) {
        let mut buckets: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, bookmark) in pool.iter().enumerate() {
            let key = self
                .normalizer
                .apply(&bookmark.url)
                .unwrap_or_else(|_| bookmark.url.trim().to_string());
            buckets.entry(key).or_default().push(i);
        }

        let mut covered = HashSet::new();
        let clusters = buckets
            .into_values()
            .filter(|members| members.len() > 1)
            .map(|members| {
                covered.extend(members.iter().copied());
                DuplicateCluster::new(
                    members.iter().map(|&i| ClusterMember::from(&pool[i])).collect(),
                    1.0,
                    ClusterReason::ExactUrl,
                )
            })
            .collect();

        (clusters, covered)
    }

    fn title_pass(
        &self,
        candidates: &[&BookmarkRef],
        threshold: f64,
        cancel: &CancellationFlag,
    ) -> TitlePass {
        let titles: Vec<String> = candidates
            .iter()
            .map(|b| TitleHasher::normalize(&b.title))
            .collect();

        let mut buckets: HashMap<(usize, u64), Vec<usize>> = HashMap::new();
        for (i, title) in titles.iter().enumerate() {
            if title.chars().count() < self.config.min_title_length {
                continue;
            }
            let signature = self.hasher.signature(title);
            for key in self.hasher.band_keys(&signature) {
                buckets.entry(key).or_default().push(i);
            }
        }

        let mut keys: Vec<(usize, u64)> = buckets
            .iter()
            .filter(|(_, members)| members.len() > 1)
            .map(|(key, _)| *key)
            .collect();
        keys.sort_unstable();

        let mut sets = DisjointSet::new(candidates.len());
        let mut compared: HashSet<(usize, usize)> = HashSet::new();
        let mut comparisons = 0u64;
        let mut cancelled = false;

        for key in keys {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            let Some(members) = buckets.get(&key) else {
                continue;
            };
            for (pos, &a) in members.iter().enumerate() {
                for &b in &members[pos + 1..] {
                    if !compared.insert((a, b)) {
                        continue;
                    }
                    comparisons += 1;
                    let score = self.similarity.similarity(&titles[a], &titles[b]);
                    if score >= threshold {
                        sets.union(a, b, score);
                    }
                }
            }
        }

        let clusters = sets
            .groups()
            .into_iter()
            .map(|(members, confidence)| {
                DuplicateCluster::new(
                    members.into_iter().map(|i| ClusterMember::from(candidates[i])).collect(),
                    confidence,
                    ClusterReason::SimilarTitle,
                )
            })
            .collect();

        TitlePass {
            clusters,
            comparisons,
            cancelled,
        }
    }
}

struct TitlePass {
    clusters: Vec<DuplicateCluster>,
    comparisons: u64,
    cancelled: bool,
}

/// Union-find that tracks the weakest edge seen inside each set.
struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
    weakest: Vec<f64>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
            weakest: vec![1.0; len],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        while self.parent[x] != root {
            let next = self.parent[x];
            self.parent[x] = root;
            x = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize, score: f64) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            self.weakest[ra] = self.weakest[ra].min(score);
            return;
        }
        let weakest = self.weakest[ra].min(self.weakest[rb]).min(score);
        let root = match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => {
                self.parent[ra] = rb;
                rb
            },
            std::cmp::Ordering::Greater => {
                self.parent[rb] = ra;
                ra
            },
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] = self.rank[ra].saturating_add(1);
                ra
            },
        };
        self.weakest[root] = weakest;
    }

    /// Sets with two or more members, with their weakest edge.
    fn groups(&mut self) -> Vec<(Vec<usize>, f64)> {
        let mut by_root: HashMap<usize, Vec<usize>> = HashMap::new();
        for i in 0..self.parent.len() {
            let root = self.find(i);
            by_root.entry(root).or_default().push(i);
        }
        by_root
            .into_iter()
            .filter(|(_, members)| members.len() > 1)
            .map(|(root, members)| (members, self.weakest[root]))
            .collect()
    }
}

/// Handle to a detection running on the blocking pool.
#[derive(Debug)]
pub struct DetectionHandle {
    cancel: CancellationFlag,
    task: JoinHandle<Result<DetectionOutcome>>,
}

impl DetectionHandle {
    /// Asks the detection to stop at its next checkpoint.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A clone of the cancellation flag, e.g. for a signal handler.
    #[must_use]
    pub fn cancellation_flag(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    /// Waits for the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if the task panicked or was
    /// aborted.
    pub async fn join(self) -> Result<DetectionOutcome> {
        self.task.await.map_err(|e| Error::OperationFailed {
            operation: "detect_duplicates".to_string(),
            cause: e.to_string(),
        })?
    }
}
