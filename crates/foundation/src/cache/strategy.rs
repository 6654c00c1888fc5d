//! Similarity-match extension points
//!
//! Levels 2 (semantic) and 3 (template) of the tiered cache are lookup
//! strategies behind this trait. The crate ships no implementation: a
//! missing or stub strategy is indistinguishable from a miss, and the
//! tiered write path forwards stores to whatever is plugged in so the
//! contract stays level-count-agnostic.

use super::types::CacheEntry;
use crate::core::Message;
use crate::error::Result;

/// A hit produced by a similarity strategy
#[derive(Debug, Clone)]
pub struct StrategyHit {
    /// The cached entry the strategy matched
    pub entry: CacheEntry,
    /// How close the matched request was to this one, in `[0, 1)`.
    /// Exact matches never come from a strategy, so 1.0 is out of range.
    pub similarity: f64,
}

/// A pluggable non-exact lookup strategy
pub trait MatchStrategy: Send + Sync {
    /// Short strategy name for logs
    fn name(&self) -> &'static str;

    /// Find an entry for a similar request. `Ok(None)` is a miss.
    /// `max_tokens` is the caller's response budget, available as a
    /// filtering hint.
    fn lookup(
        &self,
        key: &str,
        messages: &[Message],
        tier: &str,
        max_tokens: u32,
    ) -> Result<Option<StrategyHit>>;

    /// Record a fresh response so future similar requests can match it
    fn store(&self, key: &str, messages: &[Message], entry: &CacheEntry) -> Result<()>;

    /// Drop everything the strategy has indexed
    fn clear(&self) -> Result<()>;
}

// Mirrors the backend module: lets a host (or test) share one strategy
// between caches while handing each a boxed handle.
impl<S: MatchStrategy + ?Sized> MatchStrategy for std::sync::Arc<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn lookup(
        &self,
        key: &str,
        messages: &[Message],
        tier: &str,
        max_tokens: u32,
    ) -> Result<Option<StrategyHit>> {
        (**self).lookup(key, messages, tier, max_tokens)
    }

    fn store(&self, key: &str, messages: &[Message], entry: &CacheEntry) -> Result<()> {
        (**self).store(key, messages, entry)
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }
}
