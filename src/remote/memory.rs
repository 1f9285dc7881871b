//! In-process [`RemoteStore`] with store-level expiry.
//!
//! Behaves like the Redis backend for the commands the cache uses, and can be
//! switched into a failing state to exercise the fallback paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::RemoteStore;
use crate::cache::check_ttl;
use crate::error::{CacheError, Result};

#[derive(Debug, Clone)]
enum Stored {
    Record(HashMap<String, String>),
    Counter(i64),
}

#[derive(Debug, Clone)]
struct Item {
    value: Stored,
    expires_at: Option<Instant>,
}

impl Item {
    fn is_live(&self) -> bool {
        self.expires_at.map_or(true, |at| Instant::now() < at)
    }
}

/// Shared in-memory key-value store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<String, Item>>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While `failing` is true every call returns an `Unavailable` error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn is_failing(&self) -> bool {
        self.failing.load(Ordering::SeqCst)
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.items.lock().values().filter(|item| item.is_live()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inserts a raw record, bypassing the adapter. Used to plant corrupt or
    /// foreign data.
    pub fn put_raw(&self, key: &str, fields: HashMap<String, String>) {
        self.items.lock().insert(
            key.to_string(),
            Item {
                value: Stored::Record(fields),
                expires_at: None,
            },
        );
    }

    fn check(&self) -> Result<()> {
        if self.is_failing() {
            Err(CacheError::Unavailable("memory store forced offline".to_string()))
        } else {
            Ok(())
        }
    }

    fn live_item(items: &mut HashMap<String, Item>, key: &str) -> Option<Item> {
        match items.get(key) {
            Some(item) if item.is_live() => Some(item.clone()),
            Some(_) => {
                items.remove(key);
                None
            }
            None => None,
        }
    }
}

/// Store-level deadline for a ttl, with the same bounds the Redis backend
/// enforces.
fn deadline(ttl_secs: u64) -> Result<Instant> {
    let ttl = check_ttl(ttl_secs)?;
    Instant::now()
        .checked_add(Duration::from_secs(ttl))
        .ok_or(CacheError::InvalidTtl(ttl_secs))
}

fn wrong_type(key: &str) -> CacheError {
    CacheError::Internal(format!("wrong value type at '{}'", key))
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn write_record(
        &self,
        key: &str,
        fields: &[(&'static str, String)],
        ttl_secs: u64,
    ) -> Result<()> {
        self.check()?;
        let expires_at = deadline(ttl_secs)?;
        let record = fields
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        self.items.lock().insert(
            key.to_string(),
            Item {
                value: Stored::Record(record),
                expires_at: Some(expires_at),
            },
        );
        Ok(())
    }

    async fn read_record(&self, key: &str) -> Result<HashMap<String, String>> {
        self.check()?;
        let mut items = self.items.lock();
        match Self::live_item(&mut items, key) {
            Some(Item {
                value: Stored::Record(record),
                ..
            }) => Ok(record),
            Some(_) => Err(wrong_type(key)),
            None => Ok(HashMap::new()),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.check()?;
        let mut items = self.items.lock();
        let live = Self::live_item(&mut items, key).is_some();
        items.remove(key);
        Ok(live)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.check()?;
        let mut items = self.items.lock();
        Ok(Self::live_item(&mut items, key).is_some())
    }

    async fn increment(&self, key: &str, amount: i64, ttl_secs: Option<u64>) -> Result<i64> {
        self.check()?;
        let new_deadline = ttl_secs.map(deadline).transpose()?;
        let mut items = self.items.lock();
        let (current, expires_at) = match Self::live_item(&mut items, key) {
            Some(Item {
                value: Stored::Counter(n),
                expires_at,
            }) => (n, expires_at),
            Some(_) => return Err(wrong_type(key)),
            None => (0, None),
        };

        let next = current
            .checked_add(amount)
            .ok_or_else(|| CacheError::Overflow(key.to_string()))?;
        let expires_at = new_deadline.or(expires_at);
        items.insert(
            key.to_string(),
            Item {
                value: Stored::Counter(next),
                expires_at,
            },
        );
        Ok(next)
    }

    async fn flush(&self, prefix: &str) -> Result<u64> {
        self.check()?;
        let mut items = self.items.lock();
        let before = items.len();
        items.retain(|key, _| !key.starts_with(prefix));
        Ok((before - items.len()) as u64)
    }

    async fn ping(&self) -> Result<()> {
        self.check()
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
