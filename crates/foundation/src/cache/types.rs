//! Shared cache types
//!
//! The entry record persisted by every backend, and the result/level types
//! returned to cache callers.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which cache level produced a lookup result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheLevel {
    /// Level 1: identical request
    ExactMatch,
    /// Level 2: semantically similar request
    SemanticMatch,
    /// Level 3: structurally similar request pattern
    TemplateMatch,
    /// No level matched
    Miss,
}

/// A cached model response as persisted by a backend
///
/// This is the flat record format every backend stores: redis keeps it as a
/// JSON string value with a server-side expiry, sqlite as a JSON column next
/// to an `expires_at`, the in-process map as the value half of its slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The model response text
    pub content: String,
    /// Tokens the original call consumed
    pub tokens: u64,
    /// Dollar cost of the original call
    pub cost: f64,
    /// Creation time, epoch seconds
    pub timestamp: i64,
    /// Model tier the response came from (opaque to this crate)
    pub tier: String,
}

impl CacheEntry {
    /// Create an entry stamped with the current time
    pub fn new(content: impl Into<String>, tokens: u64, cost: f64, tier: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tokens,
            cost,
            timestamp: Utc::now().timestamp(),
            tier: tier.into(),
        }
    }

    /// Seconds since the entry was created
    pub fn age_seconds(&self) -> i64 {
        Utc::now().timestamp() - self.timestamp
    }

    /// Whether the entry has outlived the given TTL
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.age_seconds() >= ttl.as_secs() as i64
    }
}

/// Result of a tiered cache lookup
#[derive(Debug, Clone)]
pub struct CacheResult {
    /// Whether any level matched
    pub hit: bool,
    /// The level that matched, or `Miss`
    pub level: CacheLevel,
    /// The cached response, present only on a hit
    pub content: Option<String>,
    /// Tokens the hit avoided re-spending
    pub tokens_saved: u64,
    /// Dollars the hit avoided re-spending
    pub cost_saved: f64,
    /// Similarity of the matched request to this one; 1.0 only for ExactMatch
    pub similarity: f64,
}

impl CacheResult {
    /// A full miss. Upholds the invariant that a miss carries no content
    /// and zero savings.
    pub fn miss() -> Self {
        Self {
            hit: false,
            level: CacheLevel::Miss,
            content: None,
            tokens_saved: 0,
            cost_saved: 0.0,
            similarity: 0.0,
        }
    }

    /// A hit at the given level, carrying the stored entry's savings
    pub fn hit(level: CacheLevel, entry: &CacheEntry, similarity: f64) -> Self {
        Self {
            hit: true,
            level,
            content: Some(entry.content.clone()),
            tokens_saved: entry.tokens,
            cost_saved: entry.cost,
            similarity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_round_trip() {
        let entry = CacheEntry::new("Hi there", 10, 0.00001, "nano");
        let json = serde_json::to_string(&entry).unwrap();
        let back: CacheEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_entry_expiry() {
        let mut entry = CacheEntry::new("x", 1, 0.0, "nano");
        assert!(!entry.is_expired(Duration::from_secs(60)));

        entry.timestamp -= 120;
        assert!(entry.is_expired(Duration::from_secs(60)));
    }

    #[test]
    fn test_miss_invariant() {
        let miss = CacheResult::miss();
        assert!(!miss.hit);
        assert_eq!(miss.level, CacheLevel::Miss);
        assert!(miss.content.is_none());
        assert_eq!(miss.tokens_saved, 0);
        assert_eq!(miss.cost_saved, 0.0);
    }

    #[test]
    fn test_hit_carries_entry_savings() {
        let entry = CacheEntry::new("cached", 42, 0.5, "pro");
        let hit = CacheResult::hit(CacheLevel::ExactMatch, &entry, 1.0);
        assert!(hit.hit);
        assert_eq!(hit.content.as_deref(), Some("cached"));
        assert_eq!(hit.tokens_saved, 42);
        assert_eq!(hit.cost_saved, 0.5);
        assert_eq!(hit.similarity, 1.0);
    }
}
