//! Cache Statistics Module
//!
//! Counters for the local tier and for the manager as a whole. Counters only
//! grow and are process-local; they reset when the process restarts.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

fn ratio(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

// == Local Stats ==
/// Counters kept by the local cache, mutated under its lock.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LocalStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub errors: u64,
    /// Entries dropped to make room for new ones
    pub evictions: u64,
    /// Current number of entries
    pub size: usize,
}

impl LocalStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        ratio(self.hits, self.misses)
    }
}

// == Stats Recorder ==
/// Lock-free aggregate counters owned by the cache manager.
#[derive(Debug, Default)]
pub struct StatsRecorder {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    errors: AtomicU64,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_set(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Captures the counters together with the point-in-time gauges.
    pub fn snapshot(
        &self,
        local_size: usize,
        distributed_connected: bool,
        local: Option<LocalStats>,
    ) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);

        CacheStats {
            hits,
            misses,
            sets: self.sets.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            hit_rate: ratio(hits, misses),
            local_size,
            distributed_connected,
            local,
        }
    }
}

// == Cache Stats ==
/// Point-in-time view of the manager's statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub errors: u64,
    pub hit_rate: f64,
    /// Entries currently held by the local tier
    pub local_size: usize,
    /// Whether the last distributed-store call succeeded
    pub distributed_connected: bool,
    /// The local tier's own counters, when it is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local: Option<LocalStats>,
}
