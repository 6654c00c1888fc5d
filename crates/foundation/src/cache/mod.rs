//! # Murmur Cache System
//!
//! The response-cache half of the token-cost optimization layer: answers
//! "have we already paid for this request?" before a model call is made.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                      TieredCache                         │
//! ├─────────────────────────────────────────────────────────┤
//! │  Level 1: Exact match          (backend chain)          │
//! │  Level 2: Semantic match       (pluggable strategy)     │
//! │  Level 3: Template match       (pluggable strategy)     │
//! ├─────────────────────────────────────────────────────────┤
//! │  Backend chain (first to initialize wins)               │
//! │  redis ──▶ sqlite ──▶ in-process map                    │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design rules
//!
//! 1. **Fail-open** - a broken backend degrades to a miss/no-op; no cache
//!    error ever reaches the request path.
//! 2. **Deterministic keys** - the same `(messages, tier)` hashes to the
//!    same key in every process, forever.
//! 3. **Explicit construction** - the host builds one [`TieredCache`] and
//!    passes it around; nothing here is global.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use murmur_foundation::cache::{CacheConfig, TieredCache};
//!
//! let cache = TieredCache::new(CacheConfig::default());
//!
//! let result = cache.get(&messages, "nano", 512);
//! if !result.hit {
//!     let response = invoke_model(&messages)?;
//!     cache.set(&messages, "nano", &response.text, response.tokens, response.cost);
//! }
//! ```

pub mod backend;
pub mod config;
pub mod context;
pub mod key;
pub mod strategy;
pub mod tiered;
pub mod types;

pub use backend::{open_backend_chain, CacheBackend, MemoryBackend, RedisBackend, SqliteBackend};
pub use config::{BackendChainConfig, BackendKind, CacheConfig, TieredCacheConfig};
pub use context::ContextCache;
pub use key::request_key;
pub use strategy::{MatchStrategy, StrategyHit};
pub use tiered::{TierStats, TierStatsSnapshot, TieredCache};
pub use types::{CacheEntry, CacheLevel, CacheResult};
