//! Eviction Order Module
//!
//! Tracks which key the local cache gives up first when it is full.

use std::collections::VecDeque;

use crate::config::EvictionPolicy;

// == Eviction Order ==
/// Tracks key order for eviction.
///
/// Keys are stored in a VecDeque where:
/// - Front = Newest (most recently inserted, or used under LRU)
/// - Back = Next to be evicted
///
/// Under FIFO only insertion of a new key changes the order; overwriting an
/// existing key or reading it leaves its position alone. Under LRU every
/// read and write moves the key to the front.
#[derive(Debug)]
pub struct EvictionOrder {
    policy: EvictionPolicy,
    order: VecDeque<String>,
}

impl EvictionOrder {
    // == Constructor ==
    pub fn new(policy: EvictionPolicy) -> Self {
        Self {
            policy,
            order: VecDeque::new(),
        }
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    // == Record Insert ==
    /// Registers a write of `key`. `is_new` is false when overwriting a live key.
    pub fn record_insert(&mut self, key: &str, is_new: bool) {
        if is_new {
            self.order.push_front(key.to_string());
        } else if self.policy == EvictionPolicy::Lru {
            self.move_to_front(key);
        }
    }

    // == Record Access ==
    /// Registers a read hit on `key`.
    pub fn record_access(&mut self, key: &str) {
        if self.policy == EvictionPolicy::Lru {
            self.move_to_front(key);
        }
    }

    fn move_to_front(&mut self, key: &str) {
        self.remove(key);
        self.order.push_front(key.to_string());
    }

    // == Remove ==
    /// Removes a key from the tracker.
    pub fn remove(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
    }

    // == Pop Oldest ==
    /// Returns and removes the next key to evict.
    ///
    /// Returns None if tracker is empty.
    pub fn pop_oldest(&mut self) -> Option<String> {
        self.order.pop_back()
    }

    pub fn clear(&mut self) {
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
