//! In-process map backend
//!
//! The last slot in the fallback chain: a mutex-guarded map with an
//! application-enforced TTL and an LRU bound on entry count. Expiry is
//! lazy; an expired slot is deleted when it is next read, not by a
//! background sweep.

use super::CacheBackend;
use crate::cache::types::CacheEntry;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Slot {
    entry: CacheEntry,
    deadline: Instant,
    last_access: u64,
}

#[derive(Debug, Default)]
struct Inner {
    slots: HashMap<String, Slot>,
    access_counter: u64,
}

/// Mutex-guarded in-process cache backend
#[derive(Debug)]
pub struct MemoryBackend {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl MemoryBackend {
    /// Create a backend bounded to `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| Error::backend_op("memory", "mutex poisoned"))
    }

    /// Evict least-recently-used slots until the map fits the capacity
    fn evict_to_capacity(inner: &mut Inner, capacity: usize) {
        while inner.slots.len() > capacity {
            let lru_key = inner
                .slots
                .iter()
                .min_by_key(|(_, slot)| slot.last_access)
                .map(|(key, _)| key.clone());
            match lru_key {
                Some(key) => {
                    inner.slots.remove(&key);
                }
                None => break,
            }
        }
    }

    /// Number of stored slots (expired-but-unread slots included)
    pub fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.slots.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let mut inner = self.lock()?;
        inner.access_counter += 1;
        let counter = inner.access_counter;

        // Check validity first, then re-borrow to mutate or remove.
        let expired = match inner.slots.get(key) {
            Some(slot) => slot.deadline <= Instant::now(),
            None => return Ok(None),
        };

        if expired {
            inner.slots.remove(key);
            return Ok(None);
        }

        if let Some(slot) = inner.slots.get_mut(key) {
            slot.last_access = counter;
            return Ok(Some(slot.entry.clone()));
        }
        Ok(None)
    }

    fn set(&self, key: &str, entry: &CacheEntry, ttl: Duration) -> Result<()> {
        let mut inner = self.lock()?;
        inner.access_counter += 1;
        let counter = inner.access_counter;

        inner.slots.insert(
            key.to_string(),
            Slot {
                entry: entry.clone(),
                deadline: Instant::now() + ttl,
                last_access: counter,
            },
        );

        Self::evict_to_capacity(&mut inner, self.capacity);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut inner = self.lock()?;
        inner.slots.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut inner = self.lock()?;
        inner.slots.clear();
        Ok(())
    }
}
