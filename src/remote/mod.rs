//! Remote Store Module
//!
//! The distributed tier: a [`RemoteStore`] seam over the key-value server,
//! its Redis and in-memory implementations, and the [`DistributedCache`]
//! adapter the manager talks to.

mod adapter;
mod memory;
mod redis_store;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;

pub use adapter::DistributedCache;
pub use memory::MemoryStore;
pub use redis_store::RedisStore;

// == Remote Store ==
/// Primitive operations the distributed tier needs from a key-value server.
///
/// Keys arrive fully qualified (prefix already applied). Implementations
/// report every failure as an error and never retry on their own beyond
/// what their connection layer does.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Writes all `fields` of the record at `key` and sets the key to expire
    /// after `ttl_secs`, as one atomic step.
    async fn write_record(&self, key: &str, fields: &[(&'static str, String)], ttl_secs: u64)
        -> Result<()>;

    /// Reads every field of the record at `key`. An absent key yields an
    /// empty map.
    async fn read_record(&self, key: &str) -> Result<HashMap<String, String>>;

    /// Removes `key`; true if it existed.
    async fn delete(&self, key: &str) -> Result<bool>;

    async fn exists(&self, key: &str) -> Result<bool>;

    /// Atomically adds `amount` to the integer at `key` (missing counts as 0)
    /// and, when `ttl_secs` is given, refreshes the key's expiry.
    async fn increment(&self, key: &str, amount: i64, ttl_secs: Option<u64>) -> Result<i64>;

    /// Removes every key starting with `prefix` (everything when empty).
    /// Returns how many keys were removed, when known.
    async fn flush(&self, prefix: &str) -> Result<u64>;

    /// Round-trip health ping.
    async fn ping(&self) -> Result<()>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}
