//! Word-level change summary for opaque content
//!
//! When content has no exploitable structure, the cheapest description is
//! "mostly what you already have, plus/minus these words" against a
//! remembered baseline.

use serde_json::{json, Value};
use std::collections::HashSet;

/// How many words each of the added/removed sets reports at most
pub(crate) const WORD_SAMPLE_CAP: usize = 10;

/// Coarse added/removed word-set summary.
///
/// Samples are listed in text order (first occurrence wins) so the summary
/// is deterministic; the counts cover the full sets.
pub(crate) fn word_delta(old: &str, new: &str) -> Value {
    let old_set: HashSet<&str> = old.split_whitespace().collect();
    let new_set: HashSet<&str> = new.split_whitespace().collect();

    let added = distinct_missing_from(new, &old_set);
    let removed = distinct_missing_from(old, &new_set);

    json!({
        "added": added.iter().take(WORD_SAMPLE_CAP).collect::<Vec<_>>(),
        "added_count": added.len(),
        "removed": removed.iter().take(WORD_SAMPLE_CAP).collect::<Vec<_>>(),
        "removed_count": removed.len(),
    })
}

/// Whether the summary describes any change at all
pub(crate) fn is_empty_delta(summary: &Value) -> bool {
    summary["added_count"] == 0 && summary["removed_count"] == 0
}

/// Words of `text`, deduplicated in order, that `other` does not contain
fn distinct_missing_from<'a>(text: &'a str, other: &HashSet<&str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    text.split_whitespace()
        .filter(|word| !other.contains(word) && seen.insert(*word))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_added_and_removed_words() {
        let summary = word_delta("the quick brown fox", "the slow brown fox jumps");

        assert_eq!(summary["added"], json!(["slow", "jumps"]));
        assert_eq!(summary["added_count"], 2);
        assert_eq!(summary["removed"], json!(["quick"]));
        assert_eq!(summary["removed_count"], 1);
    }

    #[test]
    fn test_identical_text_is_empty_delta() {
        let summary = word_delta("same words here", "same words here");
        assert!(is_empty_delta(&summary));
        assert_eq!(summary["added"], json!([]));
    }

    #[test]
    fn test_sample_cap_with_full_counts() {
        let old = "base";
        let new: String = (0..25).map(|i| format!("w{} ", i)).collect::<String>() + "base";

        let summary = word_delta(old, &new);
        assert_eq!(summary["added"].as_array().unwrap().len(), WORD_SAMPLE_CAP);
        assert_eq!(summary["added_count"], 25);
    }

    #[test]
    fn test_duplicates_reported_once() {
        let summary = word_delta("a", "a b b b");
        assert_eq!(summary["added"], json!(["b"]));
        assert_eq!(summary["added_count"], 1);
    }
}
