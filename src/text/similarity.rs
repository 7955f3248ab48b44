//! Edit-distance similarity between canonical keys

/// Default minimum score for a fuzzy match to count as a hit.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.8;

/// Character-level Levenshtein distance
pub use strsim::levenshtein;

/// Similarity in `[0, 1]`: `1 - distance / max(len(a), len(b))`, lengths in
/// chars.
///
/// Two empty strings are identical and score `1.0`.
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

/// Highest-scoring candidate for `query`, ties broken by the lexicographically
/// smallest candidate so results do not depend on iteration order.
pub fn best_match<'a, I>(query: &str, candidates: I) -> Option<(&'a str, f64)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(&'a str, f64)> = None;
    for candidate in candidates {
        let score = similarity(query, candidate);
        best = match best {
            Some((current, best_score))
                if best_score > score || (best_score == score && current <= candidate) =>
            {
                Some((current, best_score))
            }
            _ => Some((candidate, score)),
        };
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_basics() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("flaw", "lawn"), 2);
        assert_eq!(levenshtein("café", "cafe"), 1);
    }

    #[test]
    fn test_identity_and_empty() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("files list", "files list"), 1.0);
        assert_eq!(similarity("", "abc"), 0.0);
    }

    #[test]
    fn test_counts_chars_not_bytes() {
        // One substitution over four chars, although "é" is two bytes
        assert!((similarity("café", "cafe") - 0.75).abs() < 1e-9);
        assert_eq!(levenshtein("añadir", "anadir"), 1);
    }

    #[test]
    fn test_bounded() {
        let pairs = [("abc", "xyz"), ("a", "abcdef"), ("deploy app", "app deploy")];
        for (a, b) in pairs {
            let score = similarity(a, b);
            assert!((0.0..=1.0).contains(&score), "{} vs {} = {}", a, b, score);
        }
    }

    #[test]
    fn test_monotonic_in_distance() {
        // Same length throughout, one more substitution per step
        let base = "abcdefghij";
        let variants = ["abcdefghij", "Xbcdefghij", "XXcdefghij", "XXXdefghij", "XXXXefghij"];
        let scores: Vec<f64> = variants.iter().map(|v| similarity(base, v)).collect();
        for pair in scores.windows(2) {
            assert!(pair[0] > pair[1], "scores not strictly decreasing: {:?}", scores);
        }
    }

    #[test]
    fn test_best_match_tie_break() {
        // "abd" and "abe" are both one edit from "abc"
        let candidates = ["abe", "xyz", "abd"];
        let (best, score) = best_match("abc", candidates.iter().copied()).unwrap();
        assert_eq!(best, "abd");
        assert!((score - 2.0 / 3.0).abs() < 1e-9);

        assert!(best_match("abc", std::iter::empty()).is_none());
    }

    #[test]
    fn test_default_threshold_cutoff() {
        // 1 edit over 10 chars = 0.9, above the default
        assert!(similarity("files list", "files lisx") > DEFAULT_SIMILARITY_THRESHOLD);
        // 2 edits over 10 chars = 0.8, not strictly above
        assert!(similarity("files list", "files liyx") <= DEFAULT_SIMILARITY_THRESHOLD);
    }
}
