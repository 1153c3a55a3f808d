//! Property-based tests for discovery and duplicate detection.
//!
//! Uses proptest to verify invariants across random inputs:
//! - No bookmark repeats before the eligible set is exhausted
//! - Progress counts exactly what was committed
//! - Marking the same identifiers twice changes nothing
//! - URL normalization is idempotent
//! - Exact-URL and title clusters do not depend on input order

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;
use rekindle::services::deduplication::{ClusterReason, DeduplicationConfig, DuplicateDetector};
use rekindle::storage::MemoryLedgerBackend;
use rekindle::{
    BookmarkFilter, BookmarkId, BookmarkRef, DiscoveryEngine, Progress, ShownSetLedger,
    UrlNormalizer,
};

fn pool_of(n: usize) -> Vec<BookmarkRef> {
    (0..n)
        .map(|i| {
            let url = format!("https://site{i}.example/");
            BookmarkRef::new(url.clone(), url, format!("Site {i}"))
        })
        .collect()
}

fn engine(seed: u64) -> DiscoveryEngine {
    let (engine, _) = DiscoveryEngine::open(Arc::new(MemoryLedgerBackend::new()));
    engine.with_seed(seed)
}

fn url_strategy() -> impl Strategy<Value = String> {
    (
        prop::sample::select(vec!["http", "https", "HTTP", "Https"]),
        "[a-zA-Z][a-zA-Z0-9]{0,8}",
        prop::sample::select(vec!["com", "org", "IO"]),
        proptest::option::of(prop::sample::select(vec![80u16, 443, 8080])),
        proptest::collection::vec("[a-z0-9_-]{1,6}", 0..3),
        proptest::collection::vec(("[a-z]{1,3}", "[a-z0-9]{0,3}"), 0..3),
    )
        .prop_map(|(scheme, host, tld, port, segments, query)| {
            let mut url = format!("{scheme}://{host}.{tld}");
            if let Some(port) = port {
                url.push_str(&format!(":{port}"));
            }
            for segment in segments {
                url.push('/');
                url.push_str(&segment);
            }
            if !query.is_empty() {
                let pairs: Vec<String> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
                url.push('?');
                url.push_str(&pairs.join("&"));
            }
            url
        })
}

proptest! {
    /// Property: every eligible bookmark is drawn exactly once per cycle.
    #[test]
    fn prop_no_repeat_before_full_cycle(n in 1usize..30, count in 1usize..8, seed in any::<u64>()) {
        let pool = pool_of(n);
        let engine = engine(seed);
        let filter = BookmarkFilter::new();
        let mut seen: HashSet<BookmarkId> = HashSet::new();

        while seen.len() < n {
            let batch = engine.select_batch(&pool, &filter, count).unwrap();
            prop_assert!(!batch.cycle_completed);
            prop_assert_eq!(batch.selected.len(), count.min(n - seen.len()));
            for bookmark in &batch.selected {
                prop_assert!(seen.insert(bookmark.id.clone()), "repeated {}", bookmark.id);
            }
            engine.commit(batch.selected.iter().map(|b| b.id.clone())).unwrap();
        }

        let next = engine.select_batch(&pool, &filter, count).unwrap();
        prop_assert!(next.cycle_completed);
    }

    /// Property: progress after committing k of n is (k, n); after reset (0, n).
    #[test]
    fn prop_progress_counts_commits(n in 1usize..40, k_frac in 0.0f64..=1.0) {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
        let k = ((n as f64) * k_frac).floor() as usize;
        let pool = pool_of(n);
        let engine = engine(7);
        let filter = BookmarkFilter::new();

        engine.commit(pool.iter().take(k).map(|b| b.id.clone())).unwrap();
        prop_assert_eq!(engine.progress(&pool, &filter).unwrap(), Progress::new(k, n));

        engine.reset_history().unwrap();
        prop_assert_eq!(engine.progress(&pool, &filter).unwrap(), Progress::new(0, n));
    }

    /// Property: marking the same identifiers again is a no-op.
    #[test]
    fn prop_mark_shown_idempotent(names in proptest::collection::vec("[a-z]{1,8}", 0..20)) {
        let backend = Arc::new(MemoryLedgerBackend::new());
        let mut ledger = ShownSetLedger::empty(backend.clone());
        let ids = || names.iter().map(|n| BookmarkId::new(n.as_str()));

        ledger.mark_shown(ids()).unwrap();
        let after_first = ledger.state().clone();
        let saves = backend.save_count();

        prop_assert_eq!(ledger.mark_shown(ids()).unwrap(), 0);
        prop_assert_eq!(ledger.state(), &after_first);
        prop_assert_eq!(backend.save_count(), saves);
    }

    /// Property: normalizing a normalized URL returns it unchanged.
    #[test]
    fn prop_normalize_idempotent(url in url_strategy()) {
        let once = UrlNormalizer::normalize(&url).unwrap();
        let twice = UrlNormalizer::normalize(&once).unwrap();
        prop_assert_eq!(once, twice);
    }

    /// Property: URLs with one normalized form always form one exact cluster,
    /// whatever order the collection lists them in.
    #[test]
    fn prop_exact_cluster_order_independent(
        order in Just(vec![
            "https://example.com/path?b=2&a=1",
            "HTTPS://EXAMPLE.COM/path?a=1&b=2",
            "https://example.com:443/path?b=2&a=1",
            "https://Example.com/path?a=1&b=2",
        ]).prop_shuffle()
    ) {
        let pool: Vec<BookmarkRef> = order
            .iter()
            .enumerate()
            .map(|(i, url)| BookmarkRef::new(*url, *url, format!("Entry number {i}")))
            .collect();

        let detector = DuplicateDetector::new(DeduplicationConfig::default());
        let outcome = detector.find_clusters(&pool, 0.9).unwrap();

        prop_assert_eq!(outcome.clusters.len(), 1);
        let cluster = &outcome.clusters[0];
        prop_assert_eq!(cluster.reason, ClusterReason::ExactUrl);
        prop_assert!((cluster.confidence - 1.0).abs() < f64::EPSILON);
        prop_assert_eq!(cluster.len(), 4);
        // Same epoch timestamps, so the smallest identifier is kept.
        prop_assert_eq!(cluster.representative.as_str(), "HTTPS://EXAMPLE.COM/path?a=1&b=2");
    }

    /// Property: title clusters, their confidence and the comparison count
    /// are the same whatever order the collection lists them in.
    #[test]
    fn prop_title_cluster_order_independent(
        order in Just(vec![0usize, 1, 2, 3]).prop_shuffle()
    ) {
        let titles = [
            "learning the rust programming lan",
            "learning the rust programming lanx",
            "learning the rust programming lanxyz",
            "sourdough starter feeding schedule",
        ];
        let build = |indices: &[usize]| -> Vec<BookmarkRef> {
            indices
                .iter()
                .map(|&i| {
                    let url = format!("https://site{i}.example/");
                    BookmarkRef::new(url.clone(), url, titles[i])
                })
                .collect()
        };

        let detector = DuplicateDetector::new(DeduplicationConfig::default());
        let baseline = detector.find_clusters(&build(&[0, 1, 2, 3]), 0.9).unwrap();
        let shuffled = detector.find_clusters(&build(&order), 0.9).unwrap();

        prop_assert_eq!(&shuffled.clusters, &baseline.clusters);
        prop_assert_eq!(shuffled.comparisons, baseline.comparisons);
        prop_assert_eq!(baseline.clusters.len(), 1);
        prop_assert_eq!(baseline.clusters[0].reason, ClusterReason::SimilarTitle);
        prop_assert!(baseline.clusters[0].confidence >= 0.9);
    }
}
