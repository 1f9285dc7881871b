//! User profile cache: `user:<id>` keys tagged `user` and `user:<id>`.

use std::future::Future;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};

use crate::cache::CacheManager;

const USER_TAG: &str = "user";
const DEFAULT_USER_TTL: u64 = 1800;

#[derive(Clone)]
pub struct UserCache {
    cache: Arc<CacheManager>,
    ttl: u64,
}

impl UserCache {
    pub fn new(cache: Arc<CacheManager>) -> Self {
        Self::with_ttl(cache, DEFAULT_USER_TTL)
    }

    pub fn with_ttl(cache: Arc<CacheManager>, ttl: u64) -> Self {
        Self { cache, ttl }
    }

    pub fn key(id: &str) -> String {
        format!("user:{}", id)
    }

    pub async fn get<T: DeserializeOwned>(&self, id: &str) -> Option<T> {
        self.cache.get(&Self::key(id)).await
    }

    pub async fn set<T: Serialize>(&self, id: &str, user: &T) -> bool {
        let key = Self::key(id);
        self.cache
            .set(&key, user, Some(self.ttl), &[USER_TAG, key.as_str()])
            .await
    }

    /// Returns the cached profile or loads it with `load` and caches it.
    pub async fn get_or_load<T, E, F, Fut>(&self, id: &str, load: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = Self::key(id);
        self.cache
            .get_or_set(&key, load, Some(self.ttl), &[USER_TAG, key.as_str()])
            .await
    }

    /// Drops everything cached for one user.
    pub async fn invalidate(&self, id: &str) -> usize {
        self.cache.invalidate_by_tag(&Self::key(id)).await
    }

    /// Drops every cached user.
    pub async fn invalidate_all(&self) -> usize {
        self.cache.invalidate_by_tag(USER_TAG).await
    }
}
