//! Pluggable title similarity measures.

/// Similarity between two normalized titles.
///
/// Implementations return a score in `[0, 1]` where `1.0` means identical.
/// They must be symmetric so pair order does not affect clustering.
pub trait TitleSimilarity: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Scores two normalized titles.
    fn similarity(&self, a: &str, b: &str) -> f64;
}

/// Edit-distance similarity: `1 - levenshtein(a, b) / max(len(a), len(b))`.
///
/// Good at catching typos and small wording changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedLevenshtein;

impl TitleSimilarity for NormalizedLevenshtein {
    fn name(&self) -> &'static str {
        "normalized_levenshtein"
    }

    fn similarity(&self, a: &str, b: &str) -> f64 {
        strsim::normalized_levenshtein(a, b)
    }
}

/// Bigram overlap similarity (Sørensen–Dice).
///
/// More tolerant of reordered words than edit distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct SorensenDice;

impl TitleSimilarity for SorensenDice {
    fn name(&self) -> &'static str {
        "sorensen_dice"
    }

    fn similarity(&self, a: &str, b: &str) -> f64 {
        strsim::sorensen_dice(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_scores_one() {
        for measure in [&NormalizedLevenshtein as &dyn TitleSimilarity, &SorensenDice] {
            assert!((measure.similarity("rust book", "rust book") - 1.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn test_symmetric() {
        let pairs = [("the rust book", "the rust bok"), ("tokio tutorial", "tutorial tokio")];
        for measure in [&NormalizedLevenshtein as &dyn TitleSimilarity, &SorensenDice] {
            for (a, b) in pairs {
                let ab = measure.similarity(a, b);
                let ba = measure.similarity(b, a);
                assert!((ab - ba).abs() < 1e-12, "{} not symmetric", measure.name());
            }
        }
    }

    #[test]
    fn test_typo_is_close() {
        let score = NormalizedLevenshtein.similarity("the rust programming language", "the rust programing language");
        assert!(score > 0.95);
    }

    #[test]
    fn test_word_order() {
        let a = "tokio tutorial";
        let b = "tutorial tokio";
        assert!(SorensenDice.similarity(a, b) > NormalizedLevenshtein.similarity(a, b));
    }
}
