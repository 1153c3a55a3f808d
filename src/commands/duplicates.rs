//! Duplicates command handler.
//!
//! Detection runs on a blocking worker; Ctrl-C flips the cancellation flag
//! and whatever was found so far is still reported.

use std::sync::Arc;

use rekindle::RekindleConfig;
use rekindle::services::DuplicateDetector;
use rekindle::services::deduplication::DetectionOutcome;
use rekindle::storage::{BookmarkSource, JsonCollection};
use rekindle::UrlNormalizer;

/// Duplicates command.
pub async fn cmd_duplicates(
    config: &RekindleConfig,
    threshold: Option<f64>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let normalizer = UrlNormalizer::new().with_assume_https(config.discovery.assume_https);
    let pool = JsonCollection::new(config.collection_path())
        .with_normalizer(normalizer)
        .snapshot()?;

    let dedup_config = config.duplicates.to_dedup_config();
    let threshold = threshold.unwrap_or(dedup_config.threshold);
    let detector = Arc::new(DuplicateDetector::new(dedup_config).with_normalizer(normalizer));

    if !json {
        eprintln!("Scanning {} bookmarks (Ctrl-C to stop early)...", pool.len());
    }

    let handle = detector.spawn(pool, threshold)?;
    let flag = handle.cancellation_flag();
    if let Err(e) = ctrlc::set_handler(move || flag.cancel()) {
        tracing::warn!(error = %e, "Ctrl-C will not cancel detection");
    }

    let outcome = handle.join().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print!("{}", render_outcome(&outcome));
    }

    Ok(())
}

fn render_outcome(outcome: &DetectionOutcome) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    if outcome.clusters.is_empty() {
        out.push_str("No duplicates found.\n");
    }

    for (index, cluster) in outcome.clusters.iter().enumerate() {
        let _ = writeln!(
            out,
            "Cluster {} ({}, confidence {:.2}):",
            index + 1,
            cluster.reason,
            cluster.confidence
        );
        for (position, member) in cluster.members.iter().enumerate() {
            let marker = if position == 0 { "keep" } else { "    " };
            let _ = writeln!(out, "  {marker} {}  {}", member.url, member.title);
        }
        out.push('\n');
    }

    let _ = writeln!(
        out,
        "{} cluster(s), {} redundant bookmark(s), {} title comparisons in {}ms{}",
        outcome.clusters.len(),
        outcome.redundant_count(),
        outcome.comparisons,
        outcome.duration_ms,
        if outcome.cancelled { " (cancelled, partial results)" } else { "" }
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rekindle::BookmarkRef;
    use rekindle::services::deduplication::{ClusterMember, ClusterReason, DuplicateCluster};

    #[test]
    fn test_render_empty() {
        let rendered = render_outcome(&DetectionOutcome::default());
        assert!(rendered.starts_with("No duplicates found."));
        assert!(rendered.contains("0 cluster(s)"));
    }

    #[test]
    fn test_render_clusters() {
        let a = BookmarkRef::new("https://a.example/", "https://a.example", "Alpha");
        let b = BookmarkRef::new("https://a.example/", "https://A.example/", "Alpha copy");
        let outcome = DetectionOutcome {
            clusters: vec![DuplicateCluster::new(
                vec![ClusterMember::from(&a), ClusterMember::from(&b)],
                1.0,
                ClusterReason::ExactUrl,
            )],
            cancelled: true,
            comparisons: 0,
            duration_ms: 3,
        };

        let rendered = render_outcome(&outcome);
        assert!(rendered.contains("Cluster 1 (exact_url, confidence 1.00):"));
        assert!(rendered.contains("  keep https://A.example/  Alpha copy"));
        assert!(rendered.contains("1 redundant bookmark(s)"));
        assert!(rendered.contains("(cancelled, partial results)"));
    }
}
