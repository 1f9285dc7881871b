//! Search result cache keyed by the SHA-256 of the normalized query.

use std::fmt::Write as _;
use std::future::Future;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};

use crate::cache::CacheManager;

const SEARCH_TAG: &str = "search";
const DEFAULT_SEARCH_TTL: u64 = 600;

#[derive(Clone)]
pub struct SearchCache {
    cache: Arc<CacheManager>,
    ttl: u64,
}

impl SearchCache {
    pub fn new(cache: Arc<CacheManager>) -> Self {
        Self::with_ttl(cache, DEFAULT_SEARCH_TTL)
    }

    pub fn with_ttl(cache: Arc<CacheManager>, ttl: u64) -> Self {
        Self { cache, ttl }
    }

    /// `search:<hex sha256>` of the trimmed, lowercased query, so equivalent
    /// queries share an entry.
    pub fn key(query: &str) -> String {
        let normalized = query.trim().to_lowercase();
        let digest = Sha256::digest(normalized.as_bytes());

        let mut key = String::with_capacity(7 + digest.len() * 2);
        key.push_str("search:");
        for byte in digest {
            let _ = write!(key, "{:02x}", byte);
        }
        key
    }

    pub async fn get<T: DeserializeOwned>(&self, query: &str) -> Option<T> {
        self.cache.get(&Self::key(query)).await
    }

    pub async fn set<T: Serialize + ?Sized>(&self, query: &str, results: &T) -> bool {
        self.cache
            .set(&Self::key(query), results, Some(self.ttl), &[SEARCH_TAG])
            .await
    }

    pub async fn get_or_search<T, E, F, Fut>(&self, query: &str, search: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.cache
            .get_or_set(&Self::key(query), search, Some(self.ttl), &[SEARCH_TAG])
            .await
    }

    /// Drops every cached search, e.g. after the indexed data changed.
    pub async fn invalidate_all(&self) -> usize {
        self.cache.invalidate_by_tag(SEARCH_TAG).await
    }
}
