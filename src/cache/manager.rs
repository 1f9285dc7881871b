//! Cache Manager
//!
//! One read/write API over the distributed tier and the local tier.
//!
//! Reads try the distributed tier first and promote hits into the local tier;
//! writes go to both tiers. Every public operation is fail-open: internal
//! errors are logged, counted in `errors`, and turned into `None`, `false`
//! or `0`. Only a `get_or_set` factory's own error reaches the caller.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, info, warn};

use crate::cache::{
    check_ttl, current_timestamp_ms, CacheEntry, CacheStats, Codec, LocalCache, StatsRecorder,
    TagRegistry,
};
use crate::config::CacheConfig;
use crate::error::CacheError;
use crate::remote::{DistributedCache, RedisStore, RemoteStore};

const HEALTH_CHECK_KEY: &str = "__cache_health_check__";

type LoadLocks = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// Removes a key's load lock once nobody else is waiting on it.
struct LoadGuard<'a> {
    locks: &'a LoadLocks,
    key: &'a str,
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock();
        // one reference in the map, one held by the finishing caller
        if locks.get(self.key).is_some_and(|l| Arc::strong_count(l) <= 2) {
            locks.remove(self.key);
        }
    }
}

// == Health Report ==
/// Result of checking each tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct HealthReport {
    /// Distributed store answered a ping (false when the tier is disabled)
    pub distributed: bool,
    /// Local tier completed a set/get/delete round trip
    pub local: bool,
    /// Ping round-trip time, when the ping succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distributed_latency_ms: Option<u64>,
}

// == Cache Manager ==
/// Two-tier cache with tags, statistics and fail-open semantics.
///
/// Construct one per process and share it as `Arc<CacheManager>`.
pub struct CacheManager {
    config: CacheConfig,
    codec: Codec,
    local: Option<LocalCache>,
    distributed: Option<DistributedCache>,
    tags: TagRegistry,
    stats: StatsRecorder,
    load_locks: LoadLocks,
}

impl CacheManager {
    // == Constructors ==
    /// Builds the manager from configuration, using Redis for the distributed
    /// tier when it is enabled. No connection is made until the first command.
    pub fn new(config: CacheConfig) -> Self {
        let distributed = if config.distributed.enabled {
            match RedisStore::new(&config.distributed) {
                Ok(store) => Some(DistributedCache::new(Arc::new(store), &config.distributed)),
                Err(e) => {
                    warn!(error = %e, "invalid Redis configuration, running without distributed tier");
                    None
                }
            }
        } else {
            None
        };
        Self::assemble(config, distributed)
    }

    /// Builds the manager over an explicit remote store. The distributed tier
    /// is enabled regardless of `config.distributed.enabled`.
    pub fn with_remote(config: CacheConfig, store: Arc<dyn RemoteStore>) -> Self {
        let distributed = Some(DistributedCache::new(store, &config.distributed));
        Self::assemble(config, distributed)
    }

    fn assemble(config: CacheConfig, distributed: Option<DistributedCache>) -> Self {
        let local = config
            .local
            .enabled
            .then(|| LocalCache::from_config(&config.local));

        info!(
            distributed = distributed.as_ref().map(|d| d.backend()).unwrap_or("disabled"),
            local = local.is_some(),
            local_max_size = config.local.max_size,
            default_ttl = config.default_ttl,
            compression = config.compression.enabled,
            "cache manager initialized"
        );

        Self {
            codec: Codec::new(&config.compression),
            local,
            distributed,
            tags: TagRegistry::new(),
            stats: StatsRecorder::new(),
            load_locks: Mutex::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Logs a swallowed failure and counts it.
    fn record_failure(&self, op: &'static str, key: &str, err: &CacheError) {
        self.stats.record_error();
        match err {
            CacheError::Codec(_) | CacheError::Compression(_) => {
                warn!(op, key = %key, error = %err, "unreadable cache payload, treating as miss")
            }
            e if e.is_connectivity() => {
                warn!(op, key = %key, error = %err, "distributed cache unavailable, falling back")
            }
            CacheError::Redis(_) => {
                warn!(op, key = %key, error = %err, "distributed cache command failed")
            }
            _ => error!(op, key = %key, error = %err, "cache operation failed"),
        }
    }

    /// Ttl for a local copy. With a distributed tier behind it the local copy
    /// lives at most `local.default_ttl` seconds.
    fn local_ttl(&self, ttl: u64) -> u64 {
        if self.distributed.is_some() {
            ttl.min(self.config.local.default_ttl.max(1))
        } else {
            ttl
        }
    }

    fn decode_entry<T: DeserializeOwned>(&self, key: &str, entry: &CacheEntry) -> Option<T> {
        match self.codec.decode(&entry.value, entry.compressed) {
            Ok(value) => Some(value),
            Err(e) => {
                self.record_failure("decode", key, &e);
                None
            }
        }
    }

    // == Get ==
    /// Returns the cached value for `key`, or `None` when both tiers miss or
    /// fail.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if let Some(dist) = &self.distributed {
            match dist.get(key).await {
                Ok(Some(entry)) => {
                    if let Some(value) = self.decode_entry(key, &entry) {
                        self.promote(key, entry);
                        self.stats.record_hit();
                        debug!(key = %key, "cache hit (distributed)");
                        return Some(value);
                    }
                }
                Ok(None) => {}
                Err(e) => self.record_failure("get", key, &e),
            }
        }

        if let Some(local) = &self.local {
            if let Some(entry) = local.get(key) {
                if let Some(value) = self.decode_entry(key, &entry) {
                    self.stats.record_hit();
                    debug!(key = %key, "cache hit (local)");
                    return Some(value);
                }
                local.delete(key);
            }
        }

        self.stats.record_miss();
        debug!(key = %key, "cache miss");
        None
    }

    /// Copies a distributed hit into the local tier for its remaining ttl,
    /// capped by the local ttl.
    fn promote(&self, key: &str, entry: CacheEntry) {
        if let Some(local) = &self.local {
            let remaining = self.local_ttl(entry.ttl_remaining());
            if remaining > 0 && local.set(key, entry.value, entry.compressed, Some(remaining)) {
                debug!(key = %key, ttl = remaining, "promoted into local cache");
            }
        }
    }

    // == Set ==
    /// Writes `value` to every enabled tier (write-through).
    ///
    /// `ttl` defaults to the configured default ttl and must lie in
    /// `1..=MAX_TTL_SECS`. The key's tag associations are replaced by `tags`.
    /// Returns true if at least one tier accepted the write.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<u64>,
        tags: &[&str],
    ) -> bool {
        let ttl = match check_ttl(ttl.unwrap_or(self.config.default_ttl)) {
            Ok(ttl) => ttl,
            Err(e) => {
                self.record_failure("set", key, &e);
                return false;
            }
        };

        let (data, compressed) = match self.codec.encode(value) {
            Ok(encoded) => encoded,
            Err(e) => {
                self.record_failure("set", key, &e);
                return false;
            }
        };

        let mut stored = false;

        if let Some(dist) = &self.distributed {
            let entry = CacheEntry::new(data.clone(), compressed, ttl);
            match dist.set(key, &entry).await {
                Ok(()) => stored = true,
                Err(e) => self.record_failure("set", key, &e),
            }
        }

        if let Some(local) = &self.local {
            if local.set(key, data, compressed, Some(self.local_ttl(ttl))) {
                stored = true;
            } else {
                self.stats.record_error();
            }
        }

        if stored {
            self.stats.record_set();
            let expires_at = current_timestamp_ms().saturating_add(ttl as i64 * 1000);
            self.tags.replace(key, tags, expires_at);
            debug!(key = %key, ttl, compressed, "cache set");
        }
        stored
    }

    // == Delete ==
    /// Removes `key` from both tiers and from every tag. True if either tier
    /// held it.
    pub async fn delete(&self, key: &str) -> bool {
        let mut removed = false;

        if let Some(dist) = &self.distributed {
            match dist.delete(key).await {
                Ok(found) => removed |= found,
                Err(e) => self.record_failure("delete", key, &e),
            }
        }

        if let Some(local) = &self.local {
            removed |= local.delete(key);
        }

        self.tags.remove_key(key);
        if removed {
            self.stats.record_delete();
        }
        removed
    }

    // == Exists ==
    /// True if either tier holds a live entry for `key`.
    pub async fn exists(&self, key: &str) -> bool {
        if let Some(dist) = &self.distributed {
            match dist.exists(key).await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => self.record_failure("exists", key, &e),
            }
        }

        self.local.as_ref().is_some_and(|local| local.exists(key))
    }

    // == Clear ==
    /// Flushes both tiers and the tag registry. False if a tier failed.
    pub async fn clear(&self) -> bool {
        let mut ok = true;

        if let Some(dist) = &self.distributed {
            match dist.flush_all().await {
                Ok(removed) => debug!(removed, "distributed cache flushed"),
                Err(e) => {
                    self.record_failure("clear", "*", &e);
                    ok = false;
                }
            }
        }

        if let Some(local) = &self.local {
            ok &= local.clear();
        }

        self.tags.clear();
        info!(ok, "cache cleared");
        ok
    }

    // == Invalidate By Tag ==
    /// Deletes every key written under `tag` from both tiers and clears the
    /// tag. Returns how many keys were actually removed.
    pub async fn invalidate_by_tag(&self, tag: &str) -> usize {
        let keys = self.tags.take(tag);
        if keys.is_empty() {
            return 0;
        }

        let mut removed = 0;
        for key in &keys {
            if self.delete(key).await {
                removed += 1;
            }
        }

        info!(tag = %tag, tagged = keys.len(), removed, "invalidated tag");
        removed
    }

    /// Keys currently associated with `tag`.
    pub fn tagged_keys(&self, tag: &str) -> Vec<String> {
        self.tags.keys(tag)
    }

    // == Get Or Set ==
    /// Returns the cached value for `key`, or runs `factory`, stores its
    /// result and returns it.
    ///
    /// The factory's error is returned unchanged and nothing is stored.
    /// Without `coalesce_loads`, concurrent callers that all miss each run
    /// the factory; with it, they queue on a per-key lock and the later ones
    /// find the value the first one stored.
    pub async fn get_or_set<T, E, F, Fut>(
        &self,
        key: &str,
        factory: F,
        ttl: Option<u64>,
        tags: &[&str],
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.get(key).await {
            return Ok(value);
        }

        if !self.config.coalesce_loads {
            return self.load(key, factory, ttl, tags).await;
        }

        let lock = self
            .load_locks
            .lock()
            .entry(key.to_string())
            .or_default()
            .clone();
        let _cleanup = LoadGuard {
            locks: &self.load_locks,
            key,
        };
        let _held = lock.lock().await;

        if let Some(value) = self.get(key).await {
            return Ok(value);
        }
        self.load(key, factory, ttl, tags).await
    }

    async fn load<T, E, F, Fut>(&self, key: &str, factory: F, ttl: Option<u64>, tags: &[&str]) -> Result<T, E>
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let value = factory().await?;
        if !self.set(key, &value, ttl, tags).await {
            debug!(key = %key, "computed value could not be cached");
        }
        Ok(value)
    }

    // == Increment ==
    /// Adds `amount` to the counter at `key` and returns the new value.
    ///
    /// Uses the distributed store's atomic increment when it is reachable.
    /// Otherwise falls back to a read-modify-write on the local tier, which
    /// is not atomic across processes. Returns 0 if neither path works or the
    /// result would leave the i64 range.
    pub async fn increment(&self, key: &str, amount: i64, ttl: Option<u64>) -> i64 {
        if let Some(Err(e)) = ttl.map(check_ttl) {
            self.record_failure("increment", key, &e);
            return 0;
        }

        if let Some(dist) = &self.distributed {
            match dist.increment(key, amount, ttl).await {
                Ok(value) => return value,
                Err(e @ CacheError::Overflow(_)) => {
                    self.record_failure("increment", key, &e);
                    return 0;
                }
                Err(e) => self.record_failure("increment", key, &e),
            }
        }

        let Some(local) = &self.local else {
            return 0;
        };

        let existing = local.get(key);
        let current = existing
            .as_ref()
            .and_then(|entry| self.decode_entry::<i64>(key, entry))
            .unwrap_or(0);
        let ttl = ttl
            .or_else(|| existing.as_ref().map(|entry| entry.ttl_remaining().max(1)))
            .unwrap_or(self.config.default_ttl);
        let Some(next) = current.checked_add(amount) else {
            self.record_failure("increment", key, &CacheError::Overflow(key.to_string()));
            return 0;
        };

        match self.codec.encode(&next) {
            Ok((data, compressed)) => {
                if local.set(key, data, compressed, Some(self.local_ttl(ttl))) {
                    next
                } else {
                    self.stats.record_error();
                    0
                }
            }
            Err(e) => {
                self.record_failure("increment", key, &e);
                0
            }
        }
    }

    // == Health Check ==
    /// Checks each tier independently. Never fails.
    ///
    /// The local check never stores a real entry, so a full local tier keeps
    /// all of its keys. Also drops tag entries whose keys have expired.
    pub async fn health_check(&self) -> HealthReport {
        let (distributed, distributed_latency_ms) = match &self.distributed {
            Some(dist) => match dist.ping().await {
                Ok(latency) => (true, Some(latency.as_millis() as u64)),
                Err(e) => {
                    self.record_failure("health_check", "ping", &e);
                    (false, None)
                }
            },
            None => (false, None),
        };

        let local = match &self.local {
            Some(local) => {
                let marker = current_timestamp_ms().to_string();
                let ok = local.self_check(HEALTH_CHECK_KEY, &marker);
                if !ok {
                    error!("local cache failed its health check");
                }
                ok
            }
            None => false,
        };

        let pruned = self.tags.prune_expired(current_timestamp_ms());
        if pruned > 0 {
            debug!(pruned, "dropped expired keys from tags");
        }

        HealthReport {
            distributed,
            local,
            distributed_latency_ms,
        }
    }

    // == Stats ==
    /// Returns the aggregate statistics plus tier gauges.
    pub fn get_stats(&self) -> CacheStats {
        let local = self.local.as_ref().map(|local| local.stats());
        let local_size = local.as_ref().map_or(0, |stats| stats.size);
        let connected = self
            .distributed
            .as_ref()
            .is_some_and(|dist| dist.is_connected());
        self.stats.snapshot(local_size, connected, local)
    }

    pub fn has_distributed(&self) -> bool {
        self.distributed.is_some()
    }

    pub fn has_local(&self) -> bool {
        self.local.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryStore;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct User {
        name: String,
    }

    fn local_only() -> CacheManager {
        CacheManager::new(CacheConfig::builder().default_ttl(60).build())
    }

    fn two_tier() -> (Arc<MemoryStore>, CacheManager) {
        let store = Arc::new(MemoryStore::new());
        let manager = CacheManager::with_remote(
            CacheConfig::builder().default_ttl(60).build(),
            store.clone(),
        );
        (store, manager)
    }

    #[tokio::test]
    async fn test_local_only_roundtrip() {
        let cache = local_only();
        assert!(!cache.has_distributed());

        let user = User {
            name: "Ada".to_string(),
        };
        assert!(cache.set("user:1", &user, None, &[]).await);
        assert_eq!(cache.get::<User>("user:1").await, Some(user));

        let stats = cache.get_stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.sets, 1);
        assert!(!stats.distributed_connected);
    }

    #[tokio::test]
    async fn test_distributed_hit_promotes_to_local() {
        let (store, cache) = two_tier();
        let writer = CacheManager::with_remote(CacheConfig::default(), store.clone());

        // written by another instance: only the shared store has it
        assert!(writer.set("k", &"v", Some(60), &[]).await);
        assert_eq!(cache.get_stats().local_size, 0);

        assert_eq!(cache.get::<String>("k").await.as_deref(), Some("v"));
        assert_eq!(cache.get_stats().local_size, 1);

        // store goes away: the promoted copy still answers
        store.set_failing(true);
        assert_eq!(cache.get::<String>("k").await.as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_zero_ttl_is_rejected() {
        let cache = local_only();
        assert!(!cache.set("k", &1, Some(0), &[]).await);
        assert_eq!(cache.get_stats().errors, 1);
        assert_eq!(cache.get::<i32>("k").await, None);
    }

    #[tokio::test]
    async fn test_corrupt_distributed_payload_is_miss() {
        let (store, cache) = two_tier();
        let mut record = HashMap::new();
        record.insert("value".to_string(), "{broken".to_string());
        record.insert("compressed".to_string(), "false".to_string());
        record.insert("ttl".to_string(), "60".to_string());
        record.insert(
            "createdAt".to_string(),
            crate::cache::current_timestamp_ms().to_string(),
        );
        store.put_raw("cache:k", record);

        assert_eq!(cache.get::<User>("k").await, None);
        let stats = cache.get_stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.errors, 1);
    }

    #[tokio::test]
    async fn test_type_mismatch_is_miss() {
        let cache = local_only();
        cache.set("k", &"not a number", None, &[]).await;
        assert_eq!(cache.get::<i64>("k").await, None);
        assert!(cache.get_stats().errors >= 1);
    }

    #[tokio::test]
    async fn test_delete_and_exists() {
        let (_, cache) = two_tier();
        cache.set("k", &1, None, &["t"]).await;

        assert!(cache.exists("k").await);
        assert!(cache.delete("k").await);
        assert!(!cache.exists("k").await);
        assert!(!cache.delete("k").await);
        assert!(cache.tagged_keys("t").is_empty());
        assert_eq!(cache.get_stats().deletes, 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let (store, cache) = two_tier();
        cache.set("a", &1, None, &["t"]).await;
        cache.set("b", &2, None, &[]).await;

        assert!(cache.clear().await);
        assert!(store.is_empty());
        assert_eq!(cache.get::<i32>("a").await, None);
        assert!(cache.tagged_keys("t").is_empty());
    }

    #[tokio::test]
    async fn test_retagging_moves_key() {
        let cache = local_only();
        cache.set("k", &1, None, &["old"]).await;
        cache.set("k", &2, None, &["new"]).await;

        assert_eq!(cache.invalidate_by_tag("old").await, 0);
        assert_eq!(cache.get::<i32>("k").await, Some(2));
        assert_eq!(cache.invalidate_by_tag("new").await, 1);
    }

    #[tokio::test]
    async fn test_get_or_set_propagates_factory_error() {
        let cache = local_only();
        let result: Result<i32, String> = cache
            .get_or_set("k", || async { Err("source down".to_string()) }, None, &[])
            .await;

        assert_eq!(result, Err("source down".to_string()));
        assert!(!cache.exists("k").await);
    }

    #[tokio::test]
    async fn test_coalesced_loads_run_factory_once() {
        let cache = Arc::new(CacheManager::new(
            CacheConfig::builder().coalesce_loads(true).build(),
        ));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_set(
                        "slow",
                        || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                            Ok::<_, String>(7)
                        },
                        None,
                        &[],
                    )
                    .await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(7));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.load_locks.lock().is_empty());
    }

    #[tokio::test]
    async fn test_increment_distributed() {
        let (_, cache) = two_tier();
        assert_eq!(cache.increment("hits", 1, Some(60)).await, 1);
        assert_eq!(cache.increment("hits", 4, None).await, 5);
    }

    #[tokio::test]
    async fn test_increment_local_fallback() {
        let (store, cache) = two_tier();
        store.set_failing(true);

        assert_eq!(cache.increment("hits", 1, Some(60)).await, 1);
        assert_eq!(cache.increment("hits", 2, None).await, 3);
        assert!(cache.get_stats().errors >= 2);
    }

    #[tokio::test]
    async fn test_increment_without_tiers() {
        let cache = CacheManager::new(CacheConfig::builder().local_enabled(false).build());
        assert_eq!(cache.increment("hits", 1, None).await, 0);
    }

    #[tokio::test]
    async fn test_health_check() {
        let (store, cache) = two_tier();

        let report = cache.health_check().await;
        assert!(report.distributed);
        assert!(report.local);
        assert!(report.distributed_latency_ms.is_some());
        assert!(!cache.exists(HEALTH_CHECK_KEY).await);

        store.set_failing(true);
        let report = cache.health_check().await;
        assert!(!report.distributed);
        assert!(report.local);
        assert!(!cache.get_stats().distributed_connected);
    }

    #[tokio::test]
    async fn test_health_check_keeps_full_local_tier() {
        let cache = CacheManager::new(CacheConfig::builder().local_max_size(2).build());
        cache.set("a", &1, None, &[]).await;
        cache.set("b", &2, None, &[]).await;

        assert!(cache.health_check().await.local);

        let local = cache.get_stats().local.unwrap();
        assert_eq!(local.evictions, 0);
        assert_eq!(local.size, 2);
        assert_eq!(cache.get::<i32>("a").await, Some(1));
        assert_eq!(cache.get::<i32>("b").await, Some(2));
    }

    #[tokio::test]
    async fn test_health_check_prunes_expired_tag_members() {
        let cache = local_only();
        cache.set("search:1", &1, Some(1), &["search"]).await;
        cache.set("search:2", &2, Some(60), &["search"]).await;

        tokio::time::sleep(std::time::Duration::from_millis(1200)).await;
        cache.health_check().await;

        assert_eq!(cache.tagged_keys("search"), vec!["search:2".to_string()]);
    }

    #[tokio::test]
    async fn test_ttl_above_bound_is_rejected() {
        let (store, cache) = two_tier();

        assert!(!cache.set("k", &1, Some(1 << 63), &["t"]).await);
        assert!(!cache.set("k", &1, Some(u64::MAX), &[]).await);
        assert_eq!(cache.get_stats().errors, 2);
        assert!(store.is_empty());
        assert!(cache.tagged_keys("t").is_empty());

        assert_eq!(cache.increment("c", 1, Some(u64::MAX)).await, 0);
        assert!(!store.exists("cache:c").await.unwrap());

        assert!(cache.set("k", &1, Some(crate::cache::MAX_TTL_SECS), &[]).await);
        assert_eq!(cache.get::<i32>("k").await, Some(1));
    }

    #[tokio::test]
    async fn test_local_increment_overflow_returns_zero() {
        let cache = local_only();
        assert_eq!(cache.increment("c", i64::MAX, None).await, i64::MAX);

        assert_eq!(cache.increment("c", 1, None).await, 0);
        assert_eq!(cache.get_stats().errors, 1);
        // counter is left as it was
        assert_eq!(cache.increment("c", 0, None).await, i64::MAX);
        assert_eq!(cache.increment("c", -1, None).await, i64::MAX - 1);
    }

    #[tokio::test]
    async fn test_distributed_increment_overflow_does_not_fall_back() {
        let (_, cache) = two_tier();
        assert_eq!(cache.increment("c", i64::MIN, None).await, i64::MIN);

        assert_eq!(cache.increment("c", -1, None).await, 0);
        assert_eq!(cache.get_stats().local_size, 0);
        assert_eq!(cache.increment("c", 1, None).await, i64::MIN + 1);
    }

    #[tokio::test]
    async fn test_local_copy_ttl_is_capped_with_distributed_tier() {
        let config = CacheConfig::builder().local_default_ttl(5).build();
        let store = Arc::new(MemoryStore::new());
        let cache = CacheManager::with_remote(config.clone(), store.clone());

        cache.set("k", &1, Some(3600), &[]).await;
        let local = cache.local.as_ref().unwrap().get("k").unwrap();
        assert_eq!(local.ttl, 5);

        // the distributed record keeps the full ttl
        let record = store.read_record("cache:k").await.unwrap();
        assert_eq!(record["ttl"], "3600");

        // promoted copies are capped too
        let reader = CacheManager::with_remote(config.clone(), store);
        reader.get::<i32>("k").await;
        assert_eq!(reader.local.as_ref().unwrap().get("k").unwrap().ttl, 5);

        // a local-only manager keeps the requested ttl
        let alone = CacheManager::new(config);
        alone.set("k", &1, Some(3600), &[]).await;
        assert_eq!(alone.local.as_ref().unwrap().get("k").unwrap().ttl, 3600);
    }

    #[tokio::test]
    async fn test_health_check_local_only() {
        let report = local_only().health_check().await;
        assert!(!report.distributed);
        assert!(report.local);
    }
}
