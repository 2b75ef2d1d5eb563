//! Lexical title similarity used by the deduplication engine.
//!
//! Similarity is word-set (Jaccard) overlap over normalized titles, not
//! anything semantic. Normalization lowercases, strips punctuation, collapses
//! whitespace, and drops connective stop words so that independently-reported
//! titles like "Live Jazz at Stubbs" and "LIVE JAZZ AT STUBB'S!!" compare
//! equal.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// Connectives dropped from every title comparison.
const STOP_WORDS: &[&str] = &["the", "a", "an", "at", "in", "on", "for", "and", "or", "with"];

/// Promoter filler additionally dropped by the cross-source batch pass.
/// Punctuation is stripped first, so "w/" and "feat." arrive as bare words.
const PROMO_WORDS: &[&str] = &["w", "feat", "featuring", "presents"];

static PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("static regex"));

fn normalize(text: &str, promo: bool) -> String {
    let lowered = text.to_lowercase();
    let stripped = PUNCTUATION.replace_all(&lowered, "");
    stripped
        .split_whitespace()
        .filter(|word| {
            !STOP_WORDS.contains(word) && !(promo && PROMO_WORDS.contains(word))
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize a title for single-candidate dedup comparison.
#[must_use]
pub fn normalize_title(text: &str) -> String {
    normalize(text, false)
}

/// Normalize a title for the cross-source batch pass, which additionally
/// strips promoter filler ("w/", "feat", "featuring", "presents").
#[must_use]
pub fn normalize_promo_title(text: &str) -> String {
    normalize(text, true)
}

/// Jaccard similarity over the word sets of two already-normalized strings.
/// An empty union is never a match.
#[must_use]
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let words_a: BTreeSet<&str> = a.split_whitespace().collect();
    let words_b: BTreeSet<&str> = b.split_whitespace().collect();

    let union = words_a.union(&words_b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = words_a.intersection(&words_b).count();
    intersection as f64 / union as f64
}

/// Similarity of two raw titles after standard normalization.
#[must_use]
pub fn title_similarity(t1: &str, t2: &str) -> f64 {
    jaccard_similarity(&normalize_title(t1), &normalize_title(t2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_strips_case_punctuation_and_stop_words() {
        assert_eq!(normalize_title("Live Jazz at Stubbs"), "live jazz stubbs");
        assert_eq!(normalize_title("LIVE JAZZ AT STUBB'S!!"), "live jazz stubbs");
        assert_eq!(normalize_title("The Party, a Celebration!"), "party celebration");
    }

    #[test]
    fn promo_normalization_drops_billing_filler() {
        assert_eq!(normalize_promo_title("DJ Night w/ Special Guests"), "dj night special guests");
        assert_eq!(normalize_promo_title("Club X presents: Disco feat. Ana"), "club x disco ana");
        // Standard normalization keeps those words
        assert_eq!(normalize_title("Band feat. Ana"), "band feat ana");
    }

    #[test]
    fn differently_punctuated_titles_compare_equal() {
        assert_eq!(title_similarity("Live Jazz at Stubbs", "LIVE JAZZ AT STUBB'S!!"), 1.0);
    }

    #[test]
    fn similarity_is_symmetric() {
        let pairs = [
            ("Farmers Market", "Downtown Farmers Market"),
            ("Trivia Night", "Karaoke Night"),
            ("Open Mic", "Open Mic"),
        ];
        for (a, b) in pairs {
            let forward = title_similarity(a, b);
            let backward = title_similarity(b, a);
            assert!((forward - backward).abs() < f64::EPSILON, "{a} vs {b}");
        }
    }

    #[test]
    fn self_similarity_is_one() {
        assert_eq!(title_similarity("Community Potluck", "Community Potluck"), 1.0);
    }

    #[test]
    fn empty_titles_never_match() {
        assert_eq!(title_similarity("", ""), 0.0);
        assert_eq!(title_similarity("Something", ""), 0.0);
        // Titles made entirely of stop words normalize to empty
        assert_eq!(title_similarity("the and or", "at in on"), 0.0);
    }

    #[test]
    fn partial_overlap_stays_below_duplicate_threshold() {
        let sim = title_similarity("Farmers Market", "Downtown Farmers Market");
        assert!(sim > 0.0 && sim < crate::constants::TITLE_SIMILARITY_THRESHOLD);
    }
}
