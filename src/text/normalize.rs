//! Canonical keys for natural-language instructions
//!
//! Two phrasings that share the same content words should land on the same
//! cache key. The pipeline is: lowercase, strip punctuation, drop English
//! stopwords, fold synonyms, sort, join with single spaces.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, HashSet};

lazy_static! {
    /// Unicode general category P (connector, dash, open, close, initial,
    /// final and other punctuation). Symbols such as `+`, `|` or `$` are
    /// category S and are kept, since they carry meaning in commands.
    static ref PUNCTUATION: Regex = Regex::new(r"\p{P}").expect("valid punctuation class");

    static ref STOPWORDS: HashSet<&'static str> = [
        "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any",
        "are", "as", "at", "be", "because", "been", "before", "being", "below", "between",
        "both", "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during",
        "each", "few", "for", "from", "further", "had", "has", "have", "having", "he", "her",
        "here", "hers", "herself", "him", "himself", "his", "how", "i", "if", "in", "into",
        "is", "it", "its", "itself", "just", "me", "more", "most", "my", "myself", "no", "nor",
        "not", "of", "off", "on", "once", "only", "or", "other", "our", "ours", "ourselves",
        "out", "over", "own", "please", "same", "she", "should", "so", "some", "such", "than",
        "that", "the", "their", "theirs", "them", "themselves", "then", "there", "these",
        "they", "this", "those", "through", "to", "too", "under", "until", "up", "very", "was",
        "we", "were", "what", "when", "where", "which", "while", "who", "whom", "why", "will",
        "with", "would", "you", "your", "yours", "yourself", "yourselves",
    ]
    .into_iter()
    .collect();

    /// Many-to-one word replacement. Targets must not be stopwords or keys,
    /// otherwise normalizing twice would change the result.
    static ref SYNONYMS: HashMap<&'static str, &'static str> = [
        ("quick", "fast"),
        ("smart", "intelligent"),
        ("large", "big"),
    ]
    .into_iter()
    .collect();
}

/// Canonicalize raw text into a cache/dataset key.
///
/// Never fails: empty or all-stopword input yields an empty string.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = PUNCTUATION.replace_all(&lowered, "");

    let mut tokens: Vec<&str> = stripped
        .split_whitespace()
        .filter(|token| !STOPWORDS.contains(token))
        .map(|token| SYNONYMS.get(token).copied().unwrap_or(token))
        .collect();

    tokens.sort_unstable();
    tokens.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_insensitive() {
        assert_eq!(normalize("list files here"), normalize("here list files"));
        assert_eq!(normalize("list files here"), "files list");
    }

    #[test]
    fn test_lowercase_and_punctuation() {
        assert_eq!(normalize("Deploy the APP!"), "app deploy");
        assert_eq!(normalize("  show   disk,usage? "), "diskusage show");
    }

    #[test]
    fn test_unicode_punctuation() {
        assert_eq!(normalize("deploy—app"), "deployapp");
        assert_eq!(normalize("files、 list · now"), "files list now");
        assert_eq!(normalize("«compress» “logs”…"), "compress logs");
        assert_eq!(normalize("¿deploy app?"), normalize("deploy app"));
    }

    #[test]
    fn test_symbols_are_kept() {
        assert_eq!(normalize("chmod +x run.sh"), "+x chmod runsh");
        assert_eq!(normalize("ps | grep"), "grep ps |");
    }

    #[test]
    fn test_synonyms_folded() {
        assert_eq!(normalize("a quick search"), "fast search");
        assert_eq!(normalize("find large files"), normalize("find big files"));
    }

    #[test]
    fn test_empty_and_stopword_only() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("the and of it"), "");
        assert_eq!(normalize("?!..."), "");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "Show me all the QUICK ways to list large files, please!",
            "deploy app",
            "¿compress this folder?",
            "",
            "kubectl apply -f app.yaml",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "input: {:?}", input);
        }
    }
}
