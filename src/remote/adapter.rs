//! Distributed Cache Adapter
//!
//! Wraps a [`RemoteStore`] with what the manager expects from the distributed
//! tier: key prefixing, the record wire format, a per-command timeout, logical
//! expiry on reads and a connectivity flag.

use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use super::RemoteStore;
use crate::cache::CacheEntry;
use crate::config::DistributedConfig;
use crate::error::{CacheError, Result};

const LINK_UNKNOWN: u8 = 0;
const LINK_UP: u8 = 1;
const LINK_DOWN: u8 = 2;

/// Adapter between the cache manager and a remote key-value store.
pub struct DistributedCache {
    store: Arc<dyn RemoteStore>,
    prefix: String,
    command_timeout: Duration,
    offline_queue: bool,
    link: AtomicU8,
}

impl DistributedCache {
    pub fn new(store: Arc<dyn RemoteStore>, config: &DistributedConfig) -> Self {
        Self {
            store,
            prefix: config.key_prefix.clone(),
            command_timeout: config.command_timeout,
            offline_queue: config.offline_queue,
            link: AtomicU8::new(LINK_UNKNOWN),
        }
    }

    /// True when the most recent command reached the store.
    pub fn is_connected(&self) -> bool {
        self.link.load(Ordering::Relaxed) == LINK_UP
    }

    pub fn backend(&self) -> &'static str {
        self.store.name()
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    fn mark(&self, up: bool) {
        let next = if up { LINK_UP } else { LINK_DOWN };
        let prev = self.link.swap(next, Ordering::Relaxed);
        if prev != next {
            if up {
                info!(backend = self.store.name(), "distributed store reachable");
            } else {
                warn!(backend = self.store.name(), "distributed store unreachable");
            }
        }
    }

    /// Runs one store command under the command timeout and updates the
    /// connectivity flag from its outcome.
    ///
    /// With the offline queue disabled, commands fail fast while the store is
    /// known to be down. `always_attempt` bypasses that for pings.
    async fn run<T, F>(&self, always_attempt: bool, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if !always_attempt
            && !self.offline_queue
            && self.link.load(Ordering::Relaxed) == LINK_DOWN
        {
            return Err(CacheError::Unavailable(
                "offline queue disabled and store is down".to_string(),
            ));
        }

        let result = match tokio::time::timeout(self.command_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout),
        };

        match &result {
            Ok(_) => self.mark(true),
            Err(e) if e.is_connectivity() => self.mark(false),
            // a reply that could not be used still proves the link works
            Err(_) => self.mark(true),
        }
        result
    }

    // == Get ==
    /// Reads the record for `key`.
    ///
    /// Returns `Ok(None)` when the key is absent or its entry has logically
    /// expired, and an error for connectivity failures or a malformed record.
    pub async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let full = self.key(key);
        let record = self.run(false, self.store.read_record(&full)).await?;
        Ok(CacheEntry::from_fields(record)?.filter(|entry| !entry.is_expired()))
    }

    // == Set ==
    /// Writes the record for `key` with a store-level expiry equal to its ttl.
    pub async fn set(&self, key: &str, entry: &CacheEntry) -> Result<()> {
        let full = self.key(key);
        let fields = entry.to_fields();
        self.run(false, self.store.write_record(&full, &fields, entry.ttl))
            .await
    }

    pub async fn delete(&self, key: &str) -> Result<bool> {
        let full = self.key(key);
        self.run(false, self.store.delete(&full)).await
    }

    pub async fn exists(&self, key: &str) -> Result<bool> {
        let full = self.key(key);
        self.run(false, self.store.exists(&full)).await
    }

    // == Increment ==
    /// Atomic across processes; refreshes the expiry when `ttl` is given.
    pub async fn increment(&self, key: &str, amount: i64, ttl: Option<u64>) -> Result<i64> {
        let full = self.key(key);
        self.run(false, self.store.increment(&full, amount, ttl))
            .await
    }

    /// Removes every key under this adapter's prefix.
    pub async fn flush_all(&self) -> Result<u64> {
        self.run(false, self.store.flush(&self.prefix)).await
    }

    /// Round-trip ping; returns the observed latency.
    pub async fn ping(&self) -> Result<Duration> {
        let started = Instant::now();
        self.run(true, self.store.ping()).await?;
        Ok(started.elapsed())
    }
}
