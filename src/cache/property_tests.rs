//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the local tier, the codec and the manager against
//! simple models over generated operation sequences.

use proptest::prelude::*;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::cache::{CacheManager, Codec, LocalCache};
use crate::config::{CacheConfig, CompressionConfig, EvictionPolicy};
use crate::remote::MemoryStore;

// == Test Configuration ==
const TEST_DEFAULT_TTL: u64 = 300;

// == Strategies ==
/// Small key space so operations collide often
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-h]{1,2}"
}

fn value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{0,64}"
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String },
    Get { key: String },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), value_strategy()).prop_map(|(key, value)| CacheOp::Set { key, value }),
        key_strategy().prop_map(|key| CacheOp::Get { key }),
        key_strategy().prop_map(|key| CacheOp::Delete { key }),
    ]
}

/// Reference model of the local tier's eviction order.
struct OrderModel {
    policy: EvictionPolicy,
    capacity: usize,
    order: VecDeque<String>,
    values: HashMap<String, String>,
}

impl OrderModel {
    fn new(policy: EvictionPolicy, capacity: usize) -> Self {
        Self {
            policy,
            capacity,
            order: VecDeque::new(),
            values: HashMap::new(),
        }
    }

    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.order.push_back(key.to_string());
    }

    fn set(&mut self, key: &str, value: &str) {
        let is_new = !self.values.contains_key(key);
        if is_new && self.values.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.values.remove(&oldest);
            }
        }
        if is_new || self.policy == EvictionPolicy::Lru {
            self.touch(key);
        }
        self.values.insert(key.to_string(), value.to_string());
    }

    fn get(&mut self, key: &str) -> Option<String> {
        let value = self.values.get(key).cloned();
        if value.is_some() && self.policy == EvictionPolicy::Lru {
            self.touch(key);
        }
        value
    }

    fn delete(&mut self, key: &str) -> bool {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.values.remove(key).is_some()
    }
}

fn policy_strategy() -> impl Strategy<Value = EvictionPolicy> {
    prop_oneof![Just(EvictionPolicy::Fifo), Just(EvictionPolicy::Lru)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Hits, misses, sets and deletes match what the operations observed.
    #[test]
    fn prop_local_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let cache = LocalCache::new(100, TEST_DEFAULT_TTL, EvictionPolicy::Fifo);
        let (mut hits, mut misses, mut sets, mut deletes) = (0u64, 0u64, 0u64, 0u64);

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    if cache.set(&key, value, false, None) {
                        sets += 1;
                    }
                }
                CacheOp::Get { key } => match cache.get(&key) {
                    Some(_) => hits += 1,
                    None => misses += 1,
                },
                CacheOp::Delete { key } => {
                    if cache.delete(&key) {
                        deletes += 1;
                    }
                }
            }
        }

        let stats = cache.stats();
        prop_assert_eq!(stats.hits, hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, misses, "Misses mismatch");
        prop_assert_eq!(stats.sets, sets, "Sets mismatch");
        prop_assert_eq!(stats.deletes, deletes, "Deletes mismatch");
        prop_assert_eq!(stats.size, cache.len(), "Size mismatch");
    }

    // The local tier never holds more than max_size entries.
    #[test]
    fn prop_capacity_bound(
        max_size in 1usize..8,
        policy in policy_strategy(),
        ops in prop::collection::vec(cache_op_strategy(), 1..80),
    ) {
        let cache = LocalCache::new(max_size, TEST_DEFAULT_TTL, policy);

        for op in ops {
            match op {
                CacheOp::Set { key, value } => { cache.set(&key, value, false, None); }
                CacheOp::Get { key } => { cache.get(&key); }
                CacheOp::Delete { key } => { cache.delete(&key); }
            }
            prop_assert!(cache.len() <= max_size);
        }
    }

    // Inserting max_size + 1 distinct keys evicts exactly the first one.
    #[test]
    fn prop_overflow_evicts_earliest(
        keys in prop::collection::hash_set("[a-z]{1,8}", 2..20),
        policy in policy_strategy(),
    ) {
        let keys: Vec<String> = keys.into_iter().collect();
        let max_size = keys.len() - 1;
        let cache = LocalCache::new(max_size, TEST_DEFAULT_TTL, policy);

        for key in &keys {
            prop_assert!(cache.set(key, key.clone(), false, None));
        }

        prop_assert!(cache.get(&keys[0]).is_none());
        prop_assert_eq!(cache.len(), max_size);
        prop_assert_eq!(cache.stats().evictions, 1);
        for key in &keys[1..] {
            prop_assert!(cache.exists(key));
        }
    }

    // Reads and evictions agree with a reference model of FIFO and LRU order.
    #[test]
    fn prop_eviction_order_matches_model(
        max_size in 1usize..6,
        policy in policy_strategy(),
        ops in prop::collection::vec(cache_op_strategy(), 1..80),
    ) {
        let cache = LocalCache::new(max_size, TEST_DEFAULT_TTL, policy);
        let mut model = OrderModel::new(policy, max_size);

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    cache.set(&key, value.clone(), false, None);
                    model.set(&key, &value);
                }
                CacheOp::Get { key } => {
                    let actual = cache.get(&key).map(|entry| entry.value);
                    prop_assert_eq!(actual, model.get(&key));
                }
                CacheOp::Delete { key } => {
                    prop_assert_eq!(cache.delete(&key), model.delete(&key));
                }
            }
        }
    }

    // decode(encode(v)) == v on both sides of the compression threshold.
    #[test]
    fn prop_codec_roundtrip(
        values in prop::collection::vec("[ -~]{0,40}", 0..80),
        threshold in 0usize..512,
        enabled in any::<bool>(),
    ) {
        let codec = Codec::new(&CompressionConfig { enabled, threshold });

        let (data, compressed) = codec.encode(&values).unwrap();
        let serialized_len = serde_json::to_string(&values).unwrap().len();
        prop_assert_eq!(compressed, enabled && serialized_len >= threshold);

        let decoded: Vec<String> = codec.decode(&data, compressed).unwrap();
        prop_assert_eq!(decoded, values);
    }

    // Sequential writes through the manager are visible to the next read,
    // with or without a working distributed store.
    #[test]
    fn prop_manager_read_your_writes(
        writes in prop::collection::vec((key_strategy(), value_strategy()), 1..20),
        failing in any::<bool>(),
    ) {
        let store = Arc::new(MemoryStore::new());
        store.set_failing(failing);
        let manager = CacheManager::with_remote(CacheConfig::default(), store);

        tokio_test::block_on(async {
            for (key, value) in &writes {
                prop_assert!(manager.set(key, value, None, &[]).await);
                let read: Option<String> = manager.get(key).await;
                prop_assert_eq!(read.as_ref(), Some(value));
            }
            Ok(())
        })?;
    }
}
