//! Tiered Cache - a two-tier (in-process + Redis) cache layer
//!
//! Read-through/write-through caching with tag invalidation, payload
//! compression, atomic counters and fail-open degradation when the
//! distributed store is unavailable.

pub mod api;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod models;
pub mod remote;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheManager, CacheStats, HealthReport};
pub use config::{CacheConfig, Config, EvictionPolicy};
pub use error::CacheError;
pub use remote::{MemoryStore, RedisStore, RemoteStore};
pub use tasks::spawn_health_monitor;
