//! Cache Module
//!
//! The two-tier cache: payload codec, in-process tier, tag registry,
//! statistics and the manager that ties them to the distributed tier.

mod codec;
mod entry;
mod local;
mod manager;
mod order;
mod stats;
mod tags;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use codec::Codec;
pub use entry::{check_ttl, current_timestamp_ms, CacheEntry, MAX_TTL_SECS};
pub use local::LocalCache;
pub use manager::{CacheManager, HealthReport};
pub use order::EvictionOrder;
pub use stats::{CacheStats, LocalStats, StatsRecorder};
pub use tags::TagRegistry;
