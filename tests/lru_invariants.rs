// ==============================================
// EVICTION ACCOUNTING PROPERTIES (integration)
// ==============================================
//
// Drives the eviction cache with arbitrary operation sequences and checks
// the byte-accounting invariant against a shadow model after every step.
// The eviction hook feeds the model, so evictions and explicit removals are
// observed the same way a real subscriber would observe them.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use proptest::prelude::*;

use geecache::byteview::ByteView;
use geecache::policy::lru::LruCache;

#[derive(Debug, Clone)]
enum Op {
    Add { key: u8, value_len: usize },
    Get { key: u8 },
    RemoveOldest,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u8..16, 0usize..24).prop_map(|(key, value_len)| Op::Add { key, value_len }),
        3 => (0u8..16).prop_map(|key| Op::Get { key }),
        1 => Just(Op::RemoveOldest),
    ]
}

proptest! {
    #[test]
    fn accounting_matches_shadow_model(
        capacity in 0u64..128,
        ops in prop::collection::vec(op_strategy(), 1..200),
    ) {
        let evicted: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&evicted);
        let mut cache: LruCache<ByteView> =
            LruCache::with_evict_hook(capacity, move |key, _value| sink.lock().push(key.to_owned()));

        // key -> charged bytes (key length + value weight)
        let mut model: HashMap<String, u64> = HashMap::new();

        for op in ops {
            match op {
                Op::Add { key, value_len } => {
                    let key = format!("key{key}");
                    let value = "x".repeat(value_len);
                    model.insert(key.clone(), (key.len() + value_len) as u64);
                    cache.add(&key, ByteView::from(value));
                }
                Op::Get { key } => {
                    let key = format!("key{key}");
                    prop_assert_eq!(cache.get(&key).is_some(), model.contains_key(&key));
                }
                Op::RemoveOldest => {
                    let _ = cache.remove_oldest();
                }
            }

            for key in evicted.lock().drain(..) {
                model.remove(&key);
            }

            let expected: u64 = model.values().sum();
            prop_assert_eq!(cache.used_bytes(), expected);
            prop_assert_eq!(cache.len(), model.len());
            if capacity > 0 {
                prop_assert!(cache.used_bytes() <= capacity);
            }
            cache.debug_validate_invariants();
        }
    }

    #[test]
    fn repeat_adds_never_double_count(
        value_lens in prop::collection::vec(0usize..32, 1..50),
    ) {
        let mut cache: LruCache<ByteView> = LruCache::new(0);
        for len in &value_lens {
            cache.add("key", ByteView::from("y".repeat(*len)));
            prop_assert_eq!(cache.len(), 1);
            prop_assert_eq!(cache.used_bytes(), (3 + len) as u64);
        }
    }
}
