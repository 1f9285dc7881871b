//! Recent-notification inbox per user.
//!
//! The list lives under `notifications:<user>`, tagged with the same name, and
//! the unread counter under `notifications:<user>:unread`. Appends are
//! read-modify-write: concurrent pushes for one user can drop an entry.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::CacheManager;

const DEFAULT_CAPACITY: usize = 50;
const DEFAULT_INBOX_TTL: u64 = 7 * 24 * 3600;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(id: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            body: body.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Clone)]
pub struct NotificationInbox {
    cache: Arc<CacheManager>,
    capacity: usize,
    ttl: u64,
}

impl NotificationInbox {
    pub fn new(cache: Arc<CacheManager>) -> Self {
        Self::with_limits(cache, DEFAULT_CAPACITY, DEFAULT_INBOX_TTL)
    }

    pub fn with_limits(cache: Arc<CacheManager>, capacity: usize, ttl: u64) -> Self {
        Self {
            cache,
            capacity: capacity.max(1),
            ttl,
        }
    }

    fn tag(user: &str) -> String {
        format!("notifications:{}", user)
    }

    fn unread_key(user: &str) -> String {
        format!("notifications:{}:unread", user)
    }

    /// Prepends `notification`, keeping at most `capacity` entries, and bumps
    /// the unread counter.
    pub async fn push(&self, user: &str, notification: Notification) -> bool {
        let key = Self::tag(user);
        let mut list: Vec<Notification> = self.cache.get(&key).await.unwrap_or_default();
        list.insert(0, notification);
        list.truncate(self.capacity);

        let stored = self
            .cache
            .set(&key, &list, Some(self.ttl), &[key.as_str()])
            .await;
        if stored {
            self.cache
                .increment(&Self::unread_key(user), 1, Some(self.ttl))
                .await;
        }
        stored
    }

    /// Newest first.
    pub async fn recent(&self, user: &str) -> Vec<Notification> {
        self.cache.get(&Self::tag(user)).await.unwrap_or_default()
    }

    /// Reads the counter through a zero increment, since a distributed
    /// counter is not a cache record. Also refreshes its expiry.
    pub async fn unread_count(&self, user: &str) -> i64 {
        self.cache
            .increment(&Self::unread_key(user), 0, Some(self.ttl))
            .await
    }

    pub async fn mark_all_read(&self, user: &str) -> bool {
        self.cache.delete(&Self::unread_key(user)).await
    }

    /// Removes the user's list. Returns how many cache keys went away.
    pub async fn clear(&self, user: &str) -> usize {
        let removed = self.cache.invalidate_by_tag(&Self::tag(user)).await;
        let unread = usize::from(self.cache.delete(&Self::unread_key(user)).await);
        removed + unread
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::remote::MemoryStore;

    fn inbox(capacity: usize) -> NotificationInbox {
        let cache = Arc::new(CacheManager::new(CacheConfig::default()));
        NotificationInbox::with_limits(cache, capacity, 60)
    }

    #[tokio::test]
    async fn test_push_keeps_newest_first_and_bounded() {
        let inbox = inbox(2);
        for i in 1..=3 {
            assert!(inbox.push("u1", Notification::new(i.to_string(), "t", "b")).await);
        }

        let ids: Vec<String> = inbox.recent("u1").await.into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec!["3", "2"]);
        assert_eq!(inbox.unread_count("u1").await, 3);
        assert!(inbox.recent("u2").await.is_empty());
    }

    #[tokio::test]
    async fn test_mark_read_and_clear() {
        let inbox = inbox(10);
        inbox.push("u1", Notification::new("1", "t", "b")).await;

        assert!(inbox.mark_all_read("u1").await);
        assert_eq!(inbox.unread_count("u1").await, 0);

        inbox.push("u1", Notification::new("2", "t", "b")).await;
        assert_eq!(inbox.clear("u1").await, 2);
        assert!(inbox.recent("u1").await.is_empty());
    }

    #[tokio::test]
    async fn test_unread_counter_with_distributed_store() {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(CacheManager::with_remote(CacheConfig::default(), store));
        let inbox = NotificationInbox::with_limits(cache, 10, 60);

        inbox.push("u1", Notification::new("1", "t", "b")).await;
        inbox.push("u1", Notification::new("2", "t", "b")).await;

        assert_eq!(inbox.unread_count("u1").await, 2);
        assert_eq!(inbox.recent("u1").await.len(), 2);
    }
}
