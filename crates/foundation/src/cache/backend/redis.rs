//! Networked cache backend
//!
//! Talks to a Redis-protocol-compatible server over the blocking client.
//! Entries are stored as JSON string values with a server-side `EX` expiry,
//! namespaced under a key prefix so `clear` only touches our own keys.
//!
//! All timeouts are bounded at open time; an unreachable server costs one
//! bounded connection attempt during chain construction and can never stall
//! the request path afterward.

use super::CacheBackend;
use crate::cache::types::CacheEntry;
use crate::error::{Error, Result};
use redis::Commands;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const KEY_PREFIX: &str = "murmur:cache:";

/// Redis-backed cache store
pub struct RedisBackend {
    conn: Mutex<redis::Connection>,
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend").finish_non_exhaustive()
    }
}

impl RedisBackend {
    /// Connect to the server at `url` with bounded connect/read/write
    /// timeouts. Failure here moves the fallback chain along; it is never
    /// surfaced to cache callers.
    pub fn open(url: &str, timeout: Duration) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| Error::backend_unavailable("redis", format!("bad url: {}", e)))?;

        let conn = client
            .get_connection_with_timeout(timeout)
            .map_err(|e| Error::backend_unavailable("redis", format!("connect failed: {}", e)))?;

        conn.set_read_timeout(Some(timeout))
            .map_err(|e| Error::backend_unavailable("redis", format!("set timeout: {}", e)))?;
        conn.set_write_timeout(Some(timeout))
            .map_err(|e| Error::backend_unavailable("redis", format!("set timeout: {}", e)))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, redis::Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::backend_op("redis", "mutex poisoned"))
    }

    fn namespaced(key: &str) -> String {
        format!("{}{}", KEY_PREFIX, key)
    }
}

impl CacheBackend for RedisBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let mut conn = self.lock()?;
        let raw: Option<String> = conn.get(Self::namespaced(key))?;

        match raw {
            Some(payload) => {
                let entry = serde_json::from_str(&payload)
                    .map_err(|e| Error::Serialization(format!("bad cache value: {}", e)))?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, entry: &CacheEntry, ttl: Duration) -> Result<()> {
        let payload = serde_json::to_string(entry)?;
        // A zero expiry is an error on the server; floor at one second.
        let expiry_secs = ttl.as_secs().max(1);

        let mut conn = self.lock()?;
        conn.set_ex::<_, _, ()>(Self::namespaced(key), payload, expiry_secs)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.lock()?;
        conn.del::<_, ()>(Self::namespaced(key))?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut conn = self.lock()?;

        // Collect before deleting: SCAN borrows the connection.
        let pattern = format!("{}*", KEY_PREFIX);
        let keys: Vec<String> = conn
            .scan_match::<_, String>(&pattern)?
            .collect();

        if !keys.is_empty() {
            conn.del::<_, ()>(keys)?;
        }
        Ok(())
    }
}
