//! Tiered response cache
//!
//! Answers "have we already paid for this request?" across three levels of
//! decreasing confidence: exact match against the backend chain, then the
//! pluggable semantic and template strategies. Every backend or strategy
//! error on the request path is caught here and degrades to a miss or a
//! no-op - a broken cache must cost the caller nothing but the saved work.

use super::backend::{open_backend_chain, CacheBackend};
use super::config::{CacheConfig, TieredCacheConfig};
use super::key::request_key;
use super::strategy::MatchStrategy;
use super::types::{CacheEntry, CacheLevel, CacheResult};
use crate::core::Message;
use std::sync::Mutex;
use tracing::{debug, warn};

/// Running counters across every lookup
#[derive(Debug, Default, Clone)]
pub struct TierStats {
    pub level1_hits: u64,
    pub level2_hits: u64,
    pub level3_hits: u64,
    pub misses: u64,
    pub total_tokens_saved: u64,
    pub total_cost_saved: f64,
}

/// A stats snapshot with derived totals
#[derive(Debug, Clone)]
pub struct TierStatsSnapshot {
    pub level1_hits: u64,
    pub level2_hits: u64,
    pub level3_hits: u64,
    pub misses: u64,
    pub total_tokens_saved: u64,
    pub total_cost_saved: f64,
    pub total_requests: u64,
    pub hit_rate: f64,
}

impl TierStats {
    fn snapshot(&self) -> TierStatsSnapshot {
        let hits = self.level1_hits + self.level2_hits + self.level3_hits;
        let total_requests = hits + self.misses;
        let hit_rate = if total_requests > 0 {
            hits as f64 / total_requests as f64
        } else {
            0.0
        };

        TierStatsSnapshot {
            level1_hits: self.level1_hits,
            level2_hits: self.level2_hits,
            level3_hits: self.level3_hits,
            misses: self.misses,
            total_tokens_saved: self.total_tokens_saved,
            total_cost_saved: self.total_cost_saved,
            total_requests,
            hit_rate,
        }
    }

    fn record_hit(&mut self, level: CacheLevel, entry: &CacheEntry) {
        match level {
            CacheLevel::ExactMatch => self.level1_hits += 1,
            CacheLevel::SemanticMatch => self.level2_hits += 1,
            CacheLevel::TemplateMatch => self.level3_hits += 1,
            CacheLevel::Miss => return,
        }
        self.total_tokens_saved += entry.tokens;
        self.total_cost_saved += entry.cost;
    }
}

/// Multi-level response cache
///
/// Constructed once by the host and shared by reference; owns the backend
/// chain and whatever level 2/3 strategies are plugged in.
///
/// # Example
///
/// ```rust,ignore
/// let cache = TieredCache::new(CacheConfig::default());
///
/// let result = cache.get(&messages, "nano", 512);
/// if result.hit {
///     return result.content.unwrap_or_default();
/// }
/// let response = call_model(&messages).await?;
/// cache.set(&messages, "nano", &response.text, response.tokens, response.cost);
/// ```
pub struct TieredCache {
    config: TieredCacheConfig,
    backend: Box<dyn CacheBackend>,
    semantic: Option<Box<dyn MatchStrategy>>,
    template: Option<Box<dyn MatchStrategy>>,
    stats: Mutex<TierStats>,
}

impl TieredCache {
    /// Create a cache, opening the backend chain from config
    pub fn new(config: CacheConfig) -> Self {
        let backend = open_backend_chain(&config.backend);
        Self::with_backend(config.tiered, backend)
    }

    /// Create a cache over an already-constructed backend
    pub fn with_backend(config: TieredCacheConfig, backend: Box<dyn CacheBackend>) -> Self {
        Self {
            config,
            backend,
            semantic: None,
            template: None,
            stats: Mutex::new(TierStats::default()),
        }
    }

    /// Plug in a semantic (level 2) strategy
    pub fn with_semantic(mut self, strategy: Box<dyn MatchStrategy>) -> Self {
        self.semantic = Some(strategy);
        self
    }

    /// Plug in a template (level 3) strategy
    pub fn with_template(mut self, strategy: Box<dyn MatchStrategy>) -> Self {
        self.template = Some(strategy);
        self
    }

    /// The active backend's name (for logs and diagnostics)
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Look up a response for this request.
    ///
    /// Checks exact match first, validating the entry against the level 1
    /// TTL (an expired entry is deleted and treated as a miss), then the
    /// enabled similarity strategies in level order. The first hit wins.
    pub fn get(&self, messages: &[Message], tier: &str, max_tokens: u32) -> CacheResult {
        let key = request_key(messages, tier);

        // Level 1: exact match
        if let Some(entry) = self.exact_lookup(&key) {
            debug!(level = "exact", tokens = entry.tokens, "cache hit");
            self.record_hit(CacheLevel::ExactMatch, &entry);
            return CacheResult::hit(CacheLevel::ExactMatch, &entry, 1.0);
        }

        // Level 2: semantic match
        if self.config.enable_semantic {
            if let Some((entry, similarity)) =
                self.strategy_lookup(self.semantic.as_deref(), &key, messages, tier, max_tokens)
            {
                debug!(level = "semantic", similarity, "cache hit");
                self.record_hit(CacheLevel::SemanticMatch, &entry);
                return CacheResult::hit(CacheLevel::SemanticMatch, &entry, similarity);
            }
        }

        // Level 3: template match
        if self.config.enable_template {
            if let Some((entry, similarity)) =
                self.strategy_lookup(self.template.as_deref(), &key, messages, tier, max_tokens)
            {
                debug!(level = "template", similarity, "cache hit");
                self.record_hit(CacheLevel::TemplateMatch, &entry);
                return CacheResult::hit(CacheLevel::TemplateMatch, &entry, similarity);
            }
        }

        if let Ok(mut stats) = self.stats.lock() {
            stats.misses += 1;
        }
        CacheResult::miss()
    }

    /// Record a fresh model response.
    ///
    /// Always writes level 1; enabled strategies get the store forwarded so
    /// the write contract holds however many levels are live.
    pub fn set(&self, messages: &[Message], tier: &str, content: &str, tokens_used: u64, cost: f64) {
        let key = request_key(messages, tier);
        let entry = CacheEntry::new(content, tokens_used, cost, tier);

        if let Err(e) = self.backend.set(&key, &entry, self.config.level1_ttl()) {
            warn!(backend = self.backend.name(), error = %e, "cache write failed");
        }

        if self.config.enable_semantic {
            if let Some(strategy) = self.semantic.as_deref() {
                if let Err(e) = strategy.store(&key, messages, &entry) {
                    warn!(strategy = strategy.name(), error = %e, "strategy store failed");
                }
            }
        }
        if self.config.enable_template {
            if let Some(strategy) = self.template.as_deref() {
                if let Err(e) = strategy.store(&key, messages, &entry) {
                    warn!(strategy = strategy.name(), error = %e, "strategy store failed");
                }
            }
        }
    }

    /// Current statistics with derived totals
    pub fn stats(&self) -> TierStatsSnapshot {
        self.stats
            .lock()
            .map(|stats| stats.snapshot())
            .unwrap_or_else(|_| TierStats::default().snapshot())
    }

    /// Clear every level and reset statistics.
    ///
    /// An error on one level never prevents clearing the others.
    pub fn clear(&self) {
        if let Err(e) = self.backend.clear() {
            warn!(backend = self.backend.name(), error = %e, "backend clear failed");
        }
        for strategy in [self.semantic.as_deref(), self.template.as_deref()]
            .into_iter()
            .flatten()
        {
            if let Err(e) = strategy.clear() {
                warn!(strategy = strategy.name(), error = %e, "strategy clear failed");
            }
        }
        if let Ok(mut stats) = self.stats.lock() {
            *stats = TierStats::default();
        }
    }

    /// Backend lookup with TTL validation; any error degrades to a miss
    fn exact_lookup(&self, key: &str) -> Option<CacheEntry> {
        let entry = match self.backend.get(key) {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                warn!(backend = self.backend.name(), error = %e, "cache read failed");
                return None;
            }
        };

        // The backend enforces its own expiry, but a fallback backend may
        // hold entries written under an older TTL config; validate age here.
        if entry.is_expired(self.config.level1_ttl()) {
            if let Err(e) = self.backend.delete(key) {
                warn!(backend = self.backend.name(), error = %e, "expired-entry delete failed");
            }
            return None;
        }

        Some(entry)
    }

    /// Strategy lookup; absent strategies and errors both read as a miss
    fn strategy_lookup(
        &self,
        strategy: Option<&dyn MatchStrategy>,
        key: &str,
        messages: &[Message],
        tier: &str,
        max_tokens: u32,
    ) -> Option<(CacheEntry, f64)> {
        let strategy = strategy?;
        match strategy.lookup(key, messages, tier, max_tokens) {
            Ok(Some(hit)) => Some((hit.entry, hit.similarity)),
            Ok(None) => None,
            Err(e) => {
                warn!(strategy = strategy.name(), error = %e, "strategy lookup failed");
                None
            }
        }
    }

    fn record_hit(&self, level: CacheLevel, entry: &CacheEntry) {
        if let Ok(mut stats) = self.stats.lock() {
            stats.record_hit(level, entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::backend::MemoryBackend;
    use crate::cache::config::BackendChainConfig;
    use crate::cache::strategy::test_support::FixedStrategy;
    use crate::error::{Error, Result};
    use std::sync::Arc;
    use std::time::Duration;

    fn test_config() -> TieredCacheConfig {
        TieredCacheConfig::default()
    }

    fn memory_cache() -> TieredCache {
        TieredCache::with_backend(test_config(), Box::new(MemoryBackend::new(64)))
    }

    /// Backend double that fails every operation
    struct FailingBackend;

    impl CacheBackend for FailingBackend {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn get(&self, _key: &str) -> Result<Option<CacheEntry>> {
            Err(Error::backend_op("failing", "down"))
        }
        fn set(&self, _key: &str, _entry: &CacheEntry, _ttl: Duration) -> Result<()> {
            Err(Error::backend_op("failing", "down"))
        }
        fn delete(&self, _key: &str) -> Result<()> {
            Err(Error::backend_op("failing", "down"))
        }
        fn clear(&self) -> Result<()> {
            Err(Error::backend_op("failing", "down"))
        }
    }

    #[test]
    fn test_set_then_get_round_trip() {
        let cache = memory_cache();
        let messages = vec![Message::user("Hello")];

        cache.set(&messages, "nano", "Hi there", 10, 0.00001);
        let result = cache.get(&messages, "nano", 512);

        assert!(result.hit);
        assert_eq!(result.level, CacheLevel::ExactMatch);
        assert_eq!(result.content.as_deref(), Some("Hi there"));
        assert_eq!(result.tokens_saved, 10);
        assert_eq!(result.cost_saved, 0.00001);
        assert_eq!(result.similarity, 1.0);
    }

    #[test]
    fn test_different_message_misses() {
        let cache = memory_cache();
        cache.set(&[Message::user("Hello")], "nano", "Hi there", 10, 0.00001);

        let result = cache.get(&[Message::user("Bye")], "nano", 512);
        assert!(!result.hit);
        assert_eq!(result.level, CacheLevel::Miss);
        assert!(result.content.is_none());
    }

    #[test]
    fn test_different_tier_misses() {
        let cache = memory_cache();
        let messages = vec![Message::user("Hello")];
        cache.set(&messages, "nano", "Hi there", 10, 0.00001);

        assert!(!cache.get(&messages, "pro", 512).hit);
    }

    #[test]
    fn test_expired_level1_entry_is_deleted_and_misses() {
        let backend = Arc::new(MemoryBackend::new(16));
        let config = TieredCacheConfig {
            level1_ttl_minutes: 1,
            ..test_config()
        };
        let cache = TieredCache::with_backend(config, Box::new(backend.clone()));

        let messages = vec![Message::user("stale")];
        let key = request_key(&messages, "nano");

        // Plant an entry created well past the TTL, kept alive by the
        // backend's own (longer) expiry.
        let mut entry = CacheEntry::new("old answer", 5, 0.001, "nano");
        entry.timestamp -= 3600;
        backend.set(&key, &entry, Duration::from_secs(600)).unwrap();

        let result = cache.get(&messages, "nano", 512);
        assert!(!result.hit);

        // The stale entry was removed from the backend, not just skipped.
        assert!(backend.get(&key).unwrap().is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_fail_open_on_broken_backend() {
        let cache = TieredCache::with_backend(test_config(), Box::new(FailingBackend));
        let messages = vec![Message::user("Hello")];

        // Neither call may panic or surface an error.
        cache.set(&messages, "nano", "Hi", 10, 0.1);
        let result = cache.get(&messages, "nano", 512);

        assert!(!result.hit);
        assert_eq!(result.level, CacheLevel::Miss);
        cache.clear();
    }

    #[test]
    fn test_semantic_hit_when_exact_misses() {
        let entry = CacheEntry::new("close enough", 20, 0.002, "nano");
        let cache = memory_cache()
            .with_semantic(Box::new(FixedStrategy::hitting(entry, 0.93)));

        let result = cache.get(&[Message::user("nearly the same")], "nano", 512);

        assert!(result.hit);
        assert_eq!(result.level, CacheLevel::SemanticMatch);
        assert_eq!(result.similarity, 0.93);
        assert_eq!(result.tokens_saved, 20);

        let stats = cache.stats();
        assert_eq!(stats.level2_hits, 1);
        assert_eq!(stats.level1_hits, 0);
    }

    #[test]
    fn test_template_hit_after_semantic_miss() {
        let entry = CacheEntry::new("same shape", 15, 0.001, "nano");
        let cache = memory_cache()
            .with_semantic(Box::new(FixedStrategy::miss()))
            .with_template(Box::new(FixedStrategy::hitting(entry, 0.75)));

        let result = cache.get(&[Message::user("patterned request")], "nano", 512);

        assert!(result.hit);
        assert_eq!(result.level, CacheLevel::TemplateMatch);
        assert_eq!(cache.stats().level3_hits, 1);
    }

    #[test]
    fn test_disabled_levels_are_skipped() {
        let entry = CacheEntry::new("should not appear", 20, 0.002, "nano");
        let config = TieredCacheConfig {
            enable_semantic: false,
            enable_template: false,
            ..test_config()
        };
        let cache = TieredCache::with_backend(config, Box::new(MemoryBackend::new(16)))
            .with_semantic(Box::new(FixedStrategy::hitting(entry, 0.9)));

        assert!(!cache.get(&[Message::user("x")], "nano", 512).hit);
    }

    #[test]
    fn test_set_forwards_to_enabled_strategies() {
        let semantic = Arc::new(FixedStrategy::miss());
        let template = Arc::new(FixedStrategy::miss());

        let cache = memory_cache()
            .with_semantic(Box::new(semantic.clone()))
            .with_template(Box::new(template.clone()));

        cache.set(&[Message::user("Hello")], "nano", "Hi", 10, 0.1);

        assert_eq!(semantic.stored.lock().unwrap().len(), 1);
        assert_eq!(template.stored.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_stats_accumulate() {
        let cache = memory_cache();
        let messages = vec![Message::user("Hello")];

        cache.get(&messages, "nano", 512); // miss
        cache.set(&messages, "nano", "Hi", 10, 0.5);
        cache.get(&messages, "nano", 512); // hit
        cache.get(&messages, "nano", 512); // hit

        let stats = cache.stats();
        assert_eq!(stats.level1_hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_requests, 3);
        assert_eq!(stats.total_tokens_saved, 20);
        assert!((stats.total_cost_saved - 1.0).abs() < 1e-9);
        assert!((stats.hit_rate - 2.0 / 3.0).abs() < 0.01);
    }

    #[test]
    fn test_hit_rate_zero_without_requests() {
        let cache = memory_cache();
        assert_eq!(cache.stats().hit_rate, 0.0);
        assert_eq!(cache.stats().total_requests, 0);
    }

    #[test]
    fn test_clear_resets_everything() {
        let semantic = Arc::new(FixedStrategy::miss());
        let cache = memory_cache().with_semantic(Box::new(semantic.clone()));
        let messages = vec![Message::user("Hello")];

        cache.set(&messages, "nano", "Hi", 10, 0.1);
        cache.get(&messages, "nano", 512);
        cache.clear();

        assert!(!cache.get(&messages, "nano", 512).hit);
        let stats = cache.stats();
        assert_eq!(stats.level1_hits, 0);
        assert_eq!(stats.total_tokens_saved, 0);
        assert!(*semantic.cleared.lock().unwrap());
    }

    #[test]
    fn test_chain_constructed_cache_works_end_to_end() {
        let config = CacheConfig {
            tiered: test_config(),
            backend: BackendChainConfig {
                backends: vec![crate::cache::config::BackendKind::Memory],
                ..Default::default()
            },
        };
        let cache = TieredCache::new(config);
        assert_eq!(cache.backend_name(), "memory");

        let messages = vec![Message::user("Hello")];
        cache.set(&messages, "nano", "Hi there", 10, 0.00001);
        assert!(cache.get(&messages, "nano", 512).hit);
    }
}
