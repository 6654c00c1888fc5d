//! Cache storage backends
//!
//! A backend is a capability-bounded key/value store with per-entry TTL.
//! Three implementations compose a fallback chain tried once at startup:
//!
//! 1. [`RedisBackend`] - networked cache service, server-enforced expiry
//! 2. [`SqliteBackend`] - durable file-backed store, expiry column
//! 3. [`MemoryBackend`] - mutex-guarded in-process map, lazy expiry
//!
//! Initialization failure moves the chain to the next slot; per-call
//! failures are the caller's problem and are handled fail-open (treated as
//! a miss or a no-op, never propagated to the request path).

mod memory;
mod redis;
mod sqlite;

pub use memory::MemoryBackend;
pub use redis::RedisBackend;
pub use sqlite::SqliteBackend;

use super::config::{BackendChainConfig, BackendKind};
use super::types::CacheEntry;
use crate::error::Result;
use std::time::Duration;
use tracing::{info, warn};

/// A key/value store for cache entries with per-entry TTL
pub trait CacheBackend: Send + Sync {
    /// Short backend name for logs and stats
    fn name(&self) -> &'static str;

    /// Fetch an entry. `Ok(None)` is a miss; expired entries are misses.
    fn get(&self, key: &str) -> Result<Option<CacheEntry>>;

    /// Store an entry under `key` for `ttl`
    fn set(&self, key: &str, entry: &CacheEntry, ttl: Duration) -> Result<()>;

    /// Remove an entry if present
    fn delete(&self, key: &str) -> Result<()>;

    /// Remove every entry this backend holds
    fn clear(&self) -> Result<()>;
}

// Allows a host to share one backend between caches (and tests to keep a
// handle on a backend handed to a TieredCache).
impl<B: CacheBackend + ?Sized> CacheBackend for std::sync::Arc<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, entry: &CacheEntry, ttl: Duration) -> Result<()> {
        (**self).set(key, entry, ttl)
    }

    fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key)
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }
}

/// Open the first backend in the configured chain that initializes.
///
/// The list is explicit configuration; no probing for optionally-installed
/// services happens here. The in-process map cannot fail to open, so it
/// also serves as the last resort when the configured list is exhausted.
pub fn open_backend_chain(config: &BackendChainConfig) -> Box<dyn CacheBackend> {
    for kind in &config.backends {
        match kind {
            BackendKind::Redis => {
                match RedisBackend::open(&config.redis_url, config.op_timeout()) {
                    Ok(backend) => {
                        info!(url = %config.redis_url, "cache backend: redis");
                        return Box::new(backend);
                    }
                    Err(e) => warn!(error = %e, "redis backend unavailable, falling back"),
                }
            }
            BackendKind::Sqlite => match SqliteBackend::open(config.sqlite_path.clone()) {
                Ok(backend) => {
                    info!("cache backend: sqlite");
                    return Box::new(backend);
                }
                Err(e) => warn!(error = %e, "sqlite backend unavailable, falling back"),
            },
            BackendKind::Memory => {
                info!(capacity = config.memory_capacity, "cache backend: memory");
                return Box::new(MemoryBackend::new(config.memory_capacity));
            }
        }
    }

    warn!("backend chain exhausted, using in-process memory cache");
    Box::new(MemoryBackend::new(config.memory_capacity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_falls_back_to_memory() {
        // Nothing listens on port 1; the chain must degrade silently.
        let config = BackendChainConfig {
            backends: vec![BackendKind::Redis, BackendKind::Memory],
            redis_url: "redis://127.0.0.1:1".to_string(),
            op_timeout_ms: 100,
            ..Default::default()
        };

        let backend = open_backend_chain(&config);
        assert_eq!(backend.name(), "memory");
    }

    #[test]
    fn test_exhausted_chain_still_yields_memory() {
        let config = BackendChainConfig {
            backends: vec![],
            ..Default::default()
        };

        let backend = open_backend_chain(&config);
        assert_eq!(backend.name(), "memory");
    }

    #[test]
    fn test_arc_delegation() {
        use std::sync::Arc;

        let shared = Arc::new(MemoryBackend::new(4));
        let boxed: Box<dyn CacheBackend> = Box::new(shared.clone());

        let entry = CacheEntry::new("via arc", 1, 0.0, "nano");
        boxed.set("k", &entry, Duration::from_secs(60)).unwrap();
        assert!(shared.get("k").unwrap().is_some());
    }
}
