//! Novelty gate (§4.1.a): rejects a `new_answer` too similar to the same
//! agent's previous answer. Tokenization style adapted from the donor's
//! `domain/src/quorum/parsing.rs` free-form-text handling; the Jaccard math
//! itself has no donor counterpart.

use crate::config::NoveltyLevel;
use std::collections::HashMap;

/// A fixed short stop-word set, dropped before comparison so novelty isn't
/// dominated by function words.
const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "of", "to", "in", "on", "for",
    "and", "or", "it", "this", "that", "as", "at", "by", "with",
];

/// Token → occurrence count, so a word repeated in one answer but not the
/// other counts against overlap rather than collapsing away.
fn normalize_tokens(text: &str) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for tok in text
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
        .filter(|tok| !tok.is_empty())
        .filter(|tok| !STOP_WORDS.contains(tok))
    {
        *counts.entry(tok.to_string()).or_insert(0) += 1;
    }
    counts
}

/// Multiset Jaccard overlap between two texts, in `[0.0, 1.0]`: a token
/// repeated `m` times in one answer and `n` in the other contributes
/// `min(m,n)` to the intersection and `max(m,n)` to the union, rather than
/// collapsing to a single membership bit.
pub fn jaccard_overlap(a: &str, b: &str) -> f64 {
    let tokens_a = normalize_tokens(a);
    let tokens_b = normalize_tokens(b);

    if tokens_a.is_empty() && tokens_b.is_empty() {
        return 1.0;
    }

    let mut intersection = 0usize;
    let mut union = 0usize;
    for key in tokens_a.keys().chain(tokens_b.keys()).collect::<std::collections::HashSet<_>>() {
        let count_a = tokens_a.get(key).copied().unwrap_or(0);
        let count_b = tokens_b.get(key).copied().unwrap_or(0);
        intersection += count_a.min(count_b);
        union += count_a.max(count_b);
    }
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// `true` when `new` must be rejected given the agent's `previous` answer
/// and the configured novelty level. `Lenient` always accepts.
pub fn novelty_rejects(new: &str, previous: &str, level: NoveltyLevel) -> bool {
    match level.threshold() {
        None => false,
        Some(threshold) => jaccard_overlap(new, previous) > threshold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_text_has_full_overlap() {
        assert_eq!(jaccard_overlap("Paris is the capital", "Paris is the capital"), 1.0);
    }

    #[test]
    fn disjoint_text_has_zero_overlap() {
        assert_eq!(jaccard_overlap("completely different words here", "totally unrelated content now"), 0.0);
    }

    #[test]
    fn lenient_never_rejects() {
        assert!(!novelty_rejects("same", "same", NoveltyLevel::Lenient));
    }

    #[test]
    fn balanced_rejects_near_duplicate_punctuation_change() {
        let prev = "Paris is the capital of France.";
        let new = "Paris is the capital of France!";
        assert!(novelty_rejects(new, prev, NoveltyLevel::Balanced));
    }

    #[test]
    fn repeated_tokens_count_against_overlap_like_a_multiset() {
        // "dog" appears twice on one side and once on the other; a set-based
        // comparison would collapse both to a single membership bit and
        // report full overlap. Multiset comparison must not.
        let a = "dog dog dog";
        let b = "dog";
        let overlap = jaccard_overlap(a, b);
        assert!((overlap - (1.0 / 3.0)).abs() < 1e-9);
        assert_ne!(overlap, 1.0);
    }

    #[test]
    fn strict_has_a_lower_bar_than_balanced() {
        let prev = "the quick brown fox jumps over the lazy dog";
        let new = "a quick brown fox leaps over a sleepy dog";
        let overlap = jaccard_overlap(new, prev);
        // Pick a pair whose overlap sits strictly between the two thresholds
        // so the two levels disagree, demonstrating strict is more sensitive.
        assert!(overlap > 0.50 && overlap <= 0.70);
        assert!(!novelty_rejects(new, prev, NoveltyLevel::Balanced));
        assert!(novelty_rejects(new, prev, NoveltyLevel::Strict));
    }
}
