//! Generic bounded LRU cache with optional per-entry TTL
//!
//! Single-level keyed store for arbitrary computed artifacts - anywhere the
//! tiered machinery would be overkill. Not thread-safe by itself; the owner
//! wraps it in a lock when shared.
//!
//! Presence is always explicit: `get` returns `Option`, so a stored value
//! can never be confused with absence.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct ContextEntry<V> {
    value: V,
    last_access: u64,
    /// `None` means the entry never expires
    expires_at: Option<Instant>,
}

impl<V> ContextEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(deadline) => deadline <= now,
            None => false,
        }
    }
}

/// Bounded LRU + TTL keyed store
#[derive(Debug)]
pub struct ContextCache<K, V> {
    entries: HashMap<K, ContextEntry<V>>,
    max_size: usize,
    /// Access counter for LRU tracking
    access_counter: u64,
}

impl<K: Eq + Hash + Clone, V> ContextCache<K, V> {
    /// Create a cache bounded to `max_size` entries
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(max_size.min(64)),
            max_size: max_size.max(1),
            access_counter: 0,
        }
    }

    /// Insert or overwrite a value. `ttl: None` stores it without expiry.
    /// The entry lands at the most-recently-used position; least recently
    /// used entries are evicted until the cache fits its bound.
    pub fn put(&mut self, key: K, value: V, ttl: Option<Duration>) {
        self.access_counter += 1;
        let entry = ContextEntry {
            value,
            last_access: self.access_counter,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.entries.insert(key, entry);

        while self.entries.len() > self.max_size {
            self.evict_lru();
        }
    }

    /// Fetch a value. Expired entries are purged and read as absent.
    /// A hit refreshes the entry's recency position.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.access_counter += 1;
        let counter = self.access_counter;

        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(Instant::now()),
            None => return None,
        };

        if expired {
            self.entries.remove(key);
            return None;
        }

        self.entries.get_mut(key).map(|entry| {
            entry.last_access = counter;
            &entry.value
        })
    }

    /// Whether a live (non-expired) entry exists, without touching recency
    pub fn contains(&self, key: &K) -> bool {
        self.entries
            .get(key)
            .map(|entry| !entry.is_expired(Instant::now()))
            .unwrap_or(false)
    }

    /// Remove an entry, returning its value
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|entry| entry.value)
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored entries (expired-but-unread entries included)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry-count bound
    pub fn capacity(&self) -> usize {
        self.max_size
    }

    fn evict_lru(&mut self) {
        let lru_key = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(key, _)| key.clone());
        if let Some(key) = lru_key {
            self.entries.remove(&key);
        }
    }
}
