//! Tag Registry
//!
//! Maps invalidation tags to the keys written under them. Membership is
//! in-process only: after a restart keys written earlier are no longer
//! reachable through their tags.
//!
//! Keys written with a deadline stay listed after their entry expires until
//! [`TagRegistry::prune_expired`] runs; the health monitor calls it on every
//! tick.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

#[derive(Debug, Default)]
struct Registry {
    keys_by_tag: HashMap<String, HashSet<String>>,
    tags_by_key: HashMap<String, HashSet<String>>,
    /// Unix ms after which a tagged key's entry is gone
    deadlines: HashMap<String, i64>,
}

impl Registry {
    fn attach(&mut self, tag: &str, key: &str) {
        self.keys_by_tag
            .entry(tag.to_string())
            .or_default()
            .insert(key.to_string());
        self.tags_by_key
            .entry(key.to_string())
            .or_default()
            .insert(tag.to_string());
    }

    fn detach(&mut self, key: &str) {
        self.deadlines.remove(key);
        if let Some(tags) = self.tags_by_key.remove(key) {
            for tag in tags {
                if let Some(keys) = self.keys_by_tag.get_mut(&tag) {
                    keys.remove(key);
                    if keys.is_empty() {
                        self.keys_by_tag.remove(&tag);
                    }
                }
            }
        }
    }
}

/// Tag -> keys index with a reverse key -> tags index.
///
/// A key is listed under a tag exactly when its most recent write carried
/// that tag.
#[derive(Debug, Default)]
pub struct TagRegistry {
    inner: Mutex<Registry>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `key` to `tag`'s set without a deadline. Idempotent.
    pub fn associate(&self, tag: &str, key: &str) {
        self.inner.lock().attach(tag, key);
    }

    /// Replaces every association of `key` with `tags`, as a fresh write of
    /// the key does. `expires_at` (Unix ms) is when the written entry lapses.
    pub fn replace(&self, key: &str, tags: &[&str], expires_at: i64) {
        let mut reg = self.inner.lock();
        reg.detach(key);
        if tags.is_empty() {
            return;
        }
        for tag in tags {
            reg.attach(tag, key);
        }
        reg.deadlines.insert(key.to_string(), expires_at);
    }

    /// Detaches every key whose deadline is before `now_ms`. Returns how many
    /// keys were dropped.
    pub fn prune_expired(&self, now_ms: i64) -> usize {
        let mut reg = self.inner.lock();
        let expired: Vec<String> = reg
            .deadlines
            .iter()
            .filter(|(_, at)| **at < now_ms)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            reg.detach(key);
        }
        expired.len()
    }

    /// Removes `key` from every tag.
    pub fn remove_key(&self, key: &str) {
        self.inner.lock().detach(key);
    }

    /// Clears `tag` and returns the keys that were under it. Those keys are
    /// also detached from any other tag, since the caller is about to delete
    /// them.
    pub fn take(&self, tag: &str) -> Vec<String> {
        let mut reg = self.inner.lock();
        let keys: Vec<String> = reg
            .keys_by_tag
            .remove(tag)
            .map(|keys| keys.into_iter().collect())
            .unwrap_or_default();
        for key in &keys {
            reg.detach(key);
        }
        keys
    }

    /// Keys currently under `tag`, in no particular order.
    pub fn keys(&self, tag: &str) -> Vec<String> {
        self.inner
            .lock()
            .keys_by_tag
            .get(tag)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn tag_count(&self) -> usize {
        self.inner.lock().keys_by_tag.len()
    }

    pub fn clear(&self) {
        let mut reg = self.inner.lock();
        reg.keys_by_tag.clear();
        reg.tags_by_key.clear();
        reg.deadlines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(mut keys: Vec<String>) -> Vec<String> {
        keys.sort();
        keys
    }

    #[test]
    fn test_associate_is_idempotent() {
        let tags = TagRegistry::new();
        tags.associate("user", "user:1");
        tags.associate("user", "user:1");

        assert_eq!(tags.keys("user"), vec!["user:1".to_string()]);
    }

    #[test]
    fn test_take_clears_tag() {
        let tags = TagRegistry::new();
        tags.associate("T", "a");
        tags.associate("T", "b");

        assert_eq!(sorted(tags.take("T")), vec!["a", "b"]);
        assert!(tags.keys("T").is_empty());
        assert!(tags.take("T").is_empty());
        assert_eq!(tags.tag_count(), 0);
    }

    #[test]
    fn test_take_unknown_tag() {
        let tags = TagRegistry::new();
        assert!(tags.take("nothing").is_empty());
    }

    #[test]
    fn test_replace_drops_old_tags() {
        let tags = TagRegistry::new();
        tags.replace("k", &["old"], i64::MAX);
        tags.replace("k", &["new"], i64::MAX);

        assert!(tags.keys("old").is_empty());
        assert_eq!(tags.keys("new"), vec!["k".to_string()]);

        tags.replace("k", &[], i64::MAX);
        assert!(tags.keys("new").is_empty());
    }

    #[test]
    fn test_take_detaches_from_other_tags() {
        let tags = TagRegistry::new();
        tags.replace("k", &["a", "b"], i64::MAX);

        tags.take("a");
        assert!(tags.keys("b").is_empty());
    }

    #[test]
    fn test_prune_expired_drops_lapsed_keys() {
        let tags = TagRegistry::new();
        tags.replace("search:1", &["search"], 1_000);
        tags.replace("search:2", &["search"], 5_000);
        tags.replace("user:1", &["user", "search"], 2_000);
        tags.associate("search", "pinned");

        assert_eq!(tags.prune_expired(2_500), 2);
        assert_eq!(
            sorted(tags.keys("search")),
            vec!["pinned".to_string(), "search:2".to_string()]
        );
        assert!(tags.keys("user").is_empty());
        assert_eq!(tags.tag_count(), 1);

        assert_eq!(tags.prune_expired(2_500), 0);
    }

    #[test]
    fn test_rewrite_extends_deadline() {
        let tags = TagRegistry::new();
        tags.replace("k", &["t"], 1_000);
        tags.replace("k", &["t"], 10_000);

        assert_eq!(tags.prune_expired(5_000), 0);
        assert_eq!(tags.keys("t"), vec!["k".to_string()]);
    }

    #[test]
    fn test_remove_key() {
        let tags = TagRegistry::new();
        tags.associate("T", "a");
        tags.associate("T", "b");

        tags.remove_key("a");
        assert_eq!(tags.keys("T"), vec!["b".to_string()]);
    }

    #[test]
    fn test_clear() {
        let tags = TagRegistry::new();
        tags.associate("T", "a");
        tags.clear();
        assert_eq!(tags.tag_count(), 0);
    }
}
