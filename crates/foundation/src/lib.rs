//! # murmur-foundation
//!
//! Foundation layer for Murmur, the multi-agent LLM orchestrator. This
//! crate is the token-cost optimization core:
//! - Cache: tiered response cache (exact / semantic / template) over a
//!   redis → sqlite → in-memory backend chain
//! - Delta: partial-update encoding for content that changed a little
//!   (line diff, structural patch, chunk diff, context reuse)
//! - Core: the message types the LLM-invocation layer hands in
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  LLM invocation layer (external)                        │
//! │        │ get / set                │ encode              │
//! │        ▼                          ▼                     │
//! │  TieredCache                 DeltaEncoder               │
//! │   ├── L1 exact ──▶ backend    ├── LineDiff (code)       │
//! │   ├── L2 semantic (plugin)    ├── StructuralPatch       │
//! │   └── L3 template (plugin)    ├── ChunkDiff (prose)     │
//! │        │                      └── ContextReuse          │
//! │        ▼                                                │
//! │  redis ──▶ sqlite ──▶ memory   (first to open wins)     │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything is explicitly constructed: the host builds one
//! [`TieredCache`] and one [`DeltaEncoder`], owns their lifecycle, and
//! passes them to whatever needs them. Cache failures never propagate;
//! the worst case is a working system that saves nothing.

pub mod cache;
pub mod core;
pub mod delta;
pub mod error;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Core (request contract)
// ============================================================================
// `self::` disambiguates from the built-in `core` crate
pub use self::core::{Message, MessageRole};

// ============================================================================
// Cache (tiered response cache)
// ============================================================================
pub use cache::{
    // Backends
    open_backend_chain,
    BackendChainConfig,
    BackendKind,
    CacheBackend,
    // Config
    CacheConfig,
    CacheEntry,
    CacheLevel,
    CacheResult,
    // Generic single-level cache
    ContextCache,
    // Strategy seam (levels 2/3)
    MatchStrategy,
    MemoryBackend,
    RedisBackend,
    SqliteBackend,
    StrategyHit,
    // Stats
    TierStats,
    TierStatsSnapshot,
    // Tiered cache
    TieredCache,
    TieredCacheConfig,
    // Keys
    request_key,
};

// ============================================================================
// Delta (partial-update encoding)
// ============================================================================
pub use delta::{
    estimate_tokens,
    ContentClass,
    DeltaConfig,
    DeltaEncoder,
    PatchKind,
    PatchOp,
    UpdateMethod,
    UpdateResult,
};
