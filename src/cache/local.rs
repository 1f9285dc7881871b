//! Local Cache Module
//!
//! In-process tier: a bounded key -> entry map with per-key expiry timers.
//!
//! Every operation is synchronous and holds the state lock only for the
//! duration of the map manipulation, never across an await point. Expiry is
//! enforced twice: reads check the entry's deadline, and a timer task deletes
//! the key once its ttl elapses so unread entries do not linger.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::{debug, error, warn};

use crate::cache::{check_ttl, CacheEntry, EvictionOrder, LocalStats};
use crate::config::{EvictionPolicy, LocalConfig};

#[derive(Debug)]
struct Slot {
    entry: CacheEntry,
    /// Distinguishes this write from earlier writes of the same key so a stale
    /// timer never removes a newer entry
    generation: u64,
}

#[derive(Debug)]
struct LocalState {
    entries: HashMap<String, Slot>,
    timers: HashMap<String, AbortHandle>,
    order: EvictionOrder,
    stats: LocalStats,
    next_generation: u64,
}

impl LocalState {
    fn remove_key(&mut self, key: &str) -> bool {
        if let Some(timer) = self.timers.remove(key) {
            timer.abort();
        }
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.order.remove(key);
        }
        self.stats.size = self.entries.len();
        removed
    }

    fn expire_if_current(&mut self, key: &str, generation: u64) {
        let current = self
            .entries
            .get(key)
            .is_some_and(|slot| slot.generation == generation);
        if current {
            // the timer firing is this task; dropping its own handle is enough
            self.timers.remove(key);
            self.entries.remove(key);
            self.order.remove(key);
            self.stats.size = self.entries.len();
            debug!(key = %key, "local entry expired by timer");
        }
    }
}

// == Local Cache ==
/// Bounded in-process cache with TTL expiry and FIFO (or LRU) eviction.
#[derive(Debug)]
pub struct LocalCache {
    inner: Arc<Mutex<LocalState>>,
    max_size: usize,
    default_ttl: u64,
}

impl LocalCache {
    // == Constructor ==
    /// Creates a new LocalCache.
    ///
    /// # Arguments
    /// * `max_size` - Maximum number of entries the cache can hold
    /// * `default_ttl` - TTL in seconds for writes that carry none
    /// * `policy` - Which key to drop when full
    pub fn new(max_size: usize, default_ttl: u64, policy: EvictionPolicy) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LocalState {
                entries: HashMap::new(),
                timers: HashMap::new(),
                order: EvictionOrder::new(policy),
                stats: LocalStats::new(),
                next_generation: 0,
            })),
            max_size,
            default_ttl,
        }
    }

    pub fn from_config(config: &LocalConfig) -> Self {
        Self::new(config.max_size, config.default_ttl, config.eviction)
    }

    // == Get ==
    /// Returns the live entry for `key`.
    ///
    /// An expired entry is removed as a side effect and counted as a miss.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let mut state = self.inner.lock();

        let expired = match state.entries.get(key).map(|slot| slot.entry.is_expired()) {
            None => {
                state.stats.misses += 1;
                return None;
            }
            Some(expired) => expired,
        };

        if expired {
            state.remove_key(key);
            state.stats.misses += 1;
            return None;
        }

        state.stats.hits += 1;
        state.order.record_access(key);
        state.entries.get(key).map(|slot| slot.entry.clone())
    }

    // == Set ==
    /// Stores a payload with the given ttl (or the default ttl).
    ///
    /// When a new key arrives at capacity the next key in eviction order is
    /// dropped first. Any pending timer for the key is replaced. Returns false
    /// if the entry could not be stored.
    pub fn set(&self, key: &str, value: String, compressed: bool, ttl: Option<u64>) -> bool {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let mut state = self.inner.lock();

        if check_ttl(ttl).is_err() {
            state.stats.errors += 1;
            warn!(key = %key, ttl, "rejected local write with out-of-range ttl");
            return false;
        }

        let is_new = !state.entries.contains_key(key);
        if is_new && state.entries.len() >= self.max_size {
            match state.order.pop_oldest() {
                Some(evicted) => {
                    if let Some(timer) = state.timers.remove(&evicted) {
                        timer.abort();
                    }
                    state.entries.remove(&evicted);
                    state.stats.evictions += 1;
                    debug!(key = %evicted, "evicted local entry to make room");
                }
                None => {
                    state.stats.errors += 1;
                    error!(key = %key, max_size = self.max_size, "local cache has no room");
                    return false;
                }
            }
        }

        if let Some(timer) = state.timers.remove(key) {
            timer.abort();
        }

        let generation = state.next_generation;
        state.next_generation += 1;

        state.entries.insert(
            key.to_string(),
            Slot {
                entry: CacheEntry::new(value, compressed, ttl),
                generation,
            },
        );
        state.order.record_insert(key, is_new);
        state.stats.sets += 1;
        state.stats.size = state.entries.len();

        if let Some(timer) = self.schedule_expiry(key, ttl, generation) {
            state.timers.insert(key.to_string(), timer);
        }

        true
    }

    /// Spawns the task that deletes `key` once `ttl` seconds elapse.
    ///
    /// Outside a tokio runtime no timer is scheduled; reads still enforce
    /// expiry.
    fn schedule_expiry(&self, key: &str, ttl: u64, generation: u64) -> Option<AbortHandle> {
        let handle = Handle::try_current().ok()?;
        let weak: Weak<Mutex<LocalState>> = Arc::downgrade(&self.inner);
        let key = key.to_string();

        let task = handle.spawn(async move {
            tokio::time::sleep(Duration::from_secs(ttl)).await;
            if let Some(inner) = weak.upgrade() {
                inner.lock().expire_if_current(&key, generation);
            }
        });

        Some(task.abort_handle())
    }

    // == Delete ==
    /// Cancels the pending timer and removes the entry.
    ///
    /// Returns whether an entry was actually removed.
    pub fn delete(&self, key: &str) -> bool {
        let mut state = self.inner.lock();
        let removed = state.remove_key(key);
        if removed {
            state.stats.deletes += 1;
        }
        removed
    }

    // == Exists ==
    /// True if `key` holds a live entry. Does not count as a hit or miss.
    pub fn exists(&self, key: &str) -> bool {
        let mut state = self.inner.lock();
        let expired = match state.entries.get(key).map(|slot| slot.entry.is_expired()) {
            None => return false,
            Some(expired) => expired,
        };
        if expired {
            state.remove_key(key);
            return false;
        }
        true
    }

    // == Clear ==
    /// Removes every entry and cancels every timer.
    pub fn clear(&self) -> bool {
        let mut state = self.inner.lock();
        for (_, timer) in state.timers.drain() {
            timer.abort();
        }
        state.entries.clear();
        state.order.clear();
        state.stats.size = 0;
        true
    }

    // == Self Check ==
    /// Writes `value` under `key`, reads it back and removes it again, all
    /// under one lock.
    ///
    /// Bypasses capacity, eviction order, statistics and timers, so a full
    /// cache keeps every entry. Whatever `key` held before is restored.
    pub fn self_check(&self, key: &str, value: &str) -> bool {
        let mut state = self.inner.lock();
        let generation = state.next_generation;
        state.next_generation += 1;

        let previous = state.entries.insert(
            key.to_string(),
            Slot {
                entry: CacheEntry::new(value.to_string(), false, 1),
                generation,
            },
        );
        let read_back = state
            .entries
            .get(key)
            .is_some_and(|slot| slot.generation == generation && slot.entry.value == value);
        let removed = state.entries.remove(key).is_some();

        if let Some(slot) = previous {
            state.entries.insert(key.to_string(), slot);
        }
        read_back && removed
    }

    // == Stats ==
    /// Returns current local statistics.
    pub fn stats(&self) -> LocalStats {
        let state = self.inner.lock();
        let mut stats = state.stats.clone();
        stats.size = state.entries.len();
        stats
    }

    // == Length ==
    /// Returns the current number of entries, expired or not.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Number of pending expiry timers.
    pub fn pending_timers(&self) -> usize {
        self.inner.lock().timers.len()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

impl Drop for LocalCache {
    fn drop(&mut self) {
        for (_, timer) in self.inner.lock().timers.drain() {
            timer.abort();
        }
    }
}
