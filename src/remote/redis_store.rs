//! Redis-backed [`RemoteStore`].
//!
//! Records are hashes (`HSET` + `EXPIRE` in one MULTI block), counters are
//! plain integers (`INCRBY`). The connection is a multiplexed
//! `ConnectionManager`, created on first use and re-created if that first
//! attempt failed; afterwards the manager reconnects on its own.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, Client};
use tokio::sync::Mutex;
use tracing::info;

use super::RemoteStore;
use crate::cache::check_ttl;
use crate::config::DistributedConfig;
use crate::error::{CacheError, Result};

const SCAN_BATCH: usize = 200;

/// EXPIRE argument for a ttl, refusing values Redis would treat as already
/// expired.
fn expire_secs(ttl_secs: u64) -> Result<i64> {
    check_ttl(ttl_secs).map(|ttl| ttl as i64)
}

/// INCRBY refuses to leave the i64 range with a plain response error.
fn increment_error(key: &str, err: redis::RedisError) -> CacheError {
    if err.kind() == redis::ErrorKind::ResponseError && err.to_string().contains("overflow") {
        CacheError::Overflow(key.to_string())
    } else {
        err.into()
    }
}

/// Redis implementation of the distributed tier's store.
pub struct RedisStore {
    client: Client,
    max_retries: usize,
    connect_timeout: Duration,
    response_timeout: Duration,
    conn: Mutex<Option<ConnectionManager>>,
}

impl RedisStore {
    /// Creates the store without connecting.
    pub fn new(config: &DistributedConfig) -> Result<Self> {
        let client = Client::open(config.connection_info())?;
        Ok(Self {
            client,
            max_retries: config.max_retries,
            connect_timeout: config.connect_timeout,
            response_timeout: config.command_timeout,
            conn: Mutex::new(None),
        })
    }

    fn manager_config(&self) -> ConnectionManagerConfig {
        ConnectionManagerConfig::new()
            .set_number_of_retries(self.max_retries)
            .set_connection_timeout(self.connect_timeout)
            .set_response_timeout(self.response_timeout)
    }

    /// Returns a handle to the shared connection, establishing it if needed.
    async fn connection(&self) -> Result<ConnectionManager> {
        let mut slot = self.conn.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }

        let conn = ConnectionManager::new_with_config(self.client.clone(), self.manager_config())
            .await?;
        info!(
            addr = %self.client.get_connection_info().addr,
            "connected to Redis"
        );
        *slot = Some(conn.clone());
        Ok(conn)
    }
}

#[async_trait]
impl RemoteStore for RedisStore {
    async fn write_record(
        &self,
        key: &str,
        fields: &[(&'static str, String)],
        ttl_secs: u64,
    ) -> Result<()> {
        let ttl = expire_secs(ttl_secs)?;
        let mut conn = self.connection().await?;
        let _: () = redis::pipe()
            .atomic()
            .hset_multiple(key, fields)
            .ignore()
            .expire(key, ttl)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn read_record(&self, key: &str) -> Result<HashMap<String, String>> {
        let mut conn = self.connection().await?;
        let record: HashMap<String, String> = conn.hgetall(key).await?;
        Ok(record)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        let removed: i64 = conn.del(key).await?;
        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        let found: bool = conn.exists(key).await?;
        Ok(found)
    }

    async fn increment(&self, key: &str, amount: i64, ttl_secs: Option<u64>) -> Result<i64> {
        let ttl = ttl_secs.map(expire_secs).transpose()?;
        let mut conn = self.connection().await?;
        let mut pipe = redis::pipe();
        pipe.atomic().incr(key, amount);
        if let Some(ttl) = ttl {
            pipe.expire(key, ttl).ignore();
        }
        let (value,): (i64,) = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| increment_error(key, e))?;
        Ok(value)
    }

    async fn flush(&self, prefix: &str) -> Result<u64> {
        let mut conn = self.connection().await?;

        if prefix.is_empty() {
            let _: () = redis::cmd("FLUSHDB").query_async(&mut conn).await?;
            return Ok(0);
        }

        let pattern = format!("{}*", prefix);
        let mut cursor: u64 = 0;
        let mut removed: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                let n: u64 = conn.del(&keys).await?;
                removed += n;
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }
        Ok(removed)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
