//! Weight-bounded least-recently-used eviction cache.
//!
//! Single-threaded core; thread safety is provided by the owning facade
//! ([`LocalCache`](crate::cache::LocalCache)). Capacity is a byte budget,
//! not an entry count: every entry is charged `key.len() + value.weight()`
//! against the budget, and inserts evict from the cold end until the cache
//! fits again.
//!
//! ## Architecture
//!
//! ```text
//!   index: FxHashMap<String, slot>     recency list over arena slots
//!   ┌─────────┬────────┐              head ─► [A] ◄──► [B] ◄──► [C] ◄── tail
//!   │  key A  │  2     │                 MRU                       LRU
//!   │  key B  │  0     │              slots: Vec<Option<Node>> + free list
//!   └─────────┴────────┘              (stable indices, no raw pointers)
//! ```
//!
//! ## Behavior
//! - `add(k, v)`: insert at MRU or update-in-place and promote, then evict
//!   LRU entries while over budget
//! - `get(k)`: promote to MRU and return the value; misses do not mutate
//! - `remove_oldest()`: pop the LRU entry and fire the eviction hook
//! - `capacity_bytes == 0` disables the budget entirely
//!
//! ## Invariants
//! - `used_bytes` equals the sum of `key.len() + value.weight()` over all
//!   live entries at every quiescent point
//! - with a nonzero budget, `used_bytes <= capacity_bytes` after every
//!   mutating call returns
//!
//! ## Performance
//! - `add` / `get` / `remove_oldest`: O(1) amortized
//!
//! `debug_validate_invariants()` runs automatically in debug/test builds.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::traits::Weighted;

/// Notification fired once per evicted entry, in eviction order.
pub type EvictHook<V> = Box<dyn FnMut(&str, &V) + Send>;

#[derive(Debug)]
struct Node<V> {
    key: String,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

/// LRU cache bounded by total byte weight.
///
/// # Example
///
/// ```
/// use geecache::byteview::ByteView;
/// use geecache::policy::lru::LruCache;
///
/// // Budget covers both entries exactly; a third insert evicts the coldest.
/// let mut cache: LruCache<ByteView> = LruCache::new(20);
/// cache.add("key1", ByteView::from("value1"));
/// cache.add("key2", ByteView::from("value2"));
/// cache.add("key3", ByteView::from("value3"));
///
/// assert!(cache.get("key1").is_none());
/// assert_eq!(cache.len(), 2);
/// ```
pub struct LruCache<V> {
    capacity_bytes: u64,
    used_bytes: u64,
    slots: Vec<Option<Node<V>>>,
    free_list: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    index: FxHashMap<String, usize>,
    on_evict: Option<EvictHook<V>>,
}

impl<V> LruCache<V>
where
    V: Weighted,
{
    /// Creates a cache with the given byte budget. Zero means unbounded.
    pub fn new(capacity_bytes: u64) -> Self {
        Self {
            capacity_bytes,
            used_bytes: 0,
            slots: Vec::new(),
            free_list: Vec::new(),
            head: None,
            tail: None,
            index: FxHashMap::default(),
            on_evict: None,
        }
    }

    /// Creates a cache that notifies `hook` for every evicted entry.
    pub fn with_evict_hook(
        capacity_bytes: u64,
        hook: impl FnMut(&str, &V) + Send + 'static,
    ) -> Self {
        let mut cache = Self::new(capacity_bytes);
        cache.on_evict = Some(Box::new(hook));
        cache
    }

    /// Returns the value for `key`, promoting it to most-recently-used.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        let idx = *self.index.get(key)?;
        self.unlink(idx);
        self.push_front(idx);
        self.slots[idx].as_ref().map(|node| &node.value)
    }

    /// Inserts or updates `key`, then evicts from the cold end while the
    /// cache is over budget.
    ///
    /// An entry larger than the whole budget is admitted and immediately
    /// evicted again, together with everything that was colder than it.
    pub fn add(&mut self, key: &str, value: V) {
        if let Some(&idx) = self.index.get(key) {
            if let Some(node) = self.slots[idx].as_mut() {
                let old_weight = node.value.weight() as u64;
                let new_weight = value.weight() as u64;
                node.value = value;
                self.used_bytes = self.used_bytes - old_weight + new_weight;
            }
            self.unlink(idx);
            self.push_front(idx);
        } else {
            self.used_bytes += (key.len() + value.weight()) as u64;
            let idx = self.alloc(Node {
                key: key.to_owned(),
                value,
                prev: None,
                next: None,
            });
            self.index.insert(key.to_owned(), idx);
            self.push_front(idx);
        }

        while self.capacity_bytes > 0 && self.used_bytes > self.capacity_bytes {
            if self.remove_oldest().is_none() {
                break;
            }
        }

        #[cfg(debug_assertions)]
        self.debug_validate_invariants();
    }

    /// Removes and returns the least-recently-used entry, firing the
    /// eviction hook.
    pub fn remove_oldest(&mut self) -> Option<(String, V)> {
        let idx = self.tail?;
        self.unlink(idx);
        let node = self.slots[idx].take()?;
        self.free_list.push(idx);
        self.index.remove(&node.key);
        self.used_bytes -= (node.key.len() + node.value.weight()) as u64;
        if let Some(hook) = self.on_evict.as_mut() {
            hook(&node.key, &node.value);
        }
        Some((node.key, node.value))
    }

    /// Returns `true` if `key` is present, without promoting it.
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Returns the number of live entries.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Returns the bytes currently charged against the budget.
    pub fn used_bytes(&self) -> u64 {
        self.used_bytes
    }

    /// Returns the configured byte budget (zero means unbounded).
    pub fn capacity_bytes(&self) -> u64 {
        self.capacity_bytes
    }

    /// Removes all entries without firing the eviction hook.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free_list.clear();
        self.index.clear();
        self.head = None;
        self.tail = None;
        self.used_bytes = 0;
    }

    fn alloc(&mut self, node: Node<V>) -> usize {
        if let Some(idx) = self.free_list.pop() {
            self.slots[idx] = Some(node);
            idx
        } else {
            self.slots.push(Some(node));
            self.slots.len() - 1
        }
    }

    /// Detaches a slot from the recency list without freeing it.
    fn unlink(&mut self, idx: usize) {
        let (prev, next) = match self.slots[idx].as_ref() {
            Some(node) => (node.prev, node.next),
            None => return,
        };

        match prev {
            Some(p) => {
                if let Some(node) = self.slots[p].as_mut() {
                    node.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(node) = self.slots[n].as_mut() {
                    node.prev = prev;
                }
            }
            None => self.tail = prev,
        }
        if let Some(node) = self.slots[idx].as_mut() {
            node.prev = None;
            node.next = None;
        }
    }

    /// Attaches a detached slot at the MRU position.
    fn push_front(&mut self, idx: usize) {
        let old_head = self.head;
        if let Some(node) = self.slots[idx].as_mut() {
            node.prev = None;
            node.next = old_head;
        }
        match old_head {
            Some(h) => {
                if let Some(node) = self.slots[h].as_mut() {
                    node.prev = Some(idx);
                }
            }
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        let mut count = 0usize;
        let mut sum = 0u64;
        let mut current = self.head;
        let mut prev: Option<usize> = None;
        while let Some(idx) = current {
            let node = self.slots[idx]
                .as_ref()
                .unwrap_or_else(|| panic!("recency list references vacant slot {idx}"));
            assert_eq!(self.index.get(&node.key), Some(&idx));
            assert_eq!(node.prev, prev);
            count += 1;
            sum += (node.key.len() + node.value.weight()) as u64;
            assert!(count <= self.index.len(), "cycle in recency list");
            prev = current;
            current = node.next;
        }
        assert_eq!(count, self.index.len());
        assert_eq!(self.tail, prev);
        assert_eq!(sum, self.used_bytes);
        if self.capacity_bytes > 0 {
            assert!(self.used_bytes <= self.capacity_bytes);
        }
    }
}

impl<V> fmt::Debug for LruCache<V>
where
    V: Weighted,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("len", &self.len())
            .field("used_bytes", &self.used_bytes)
            .field("capacity_bytes", &self.capacity_bytes)
            .finish_non_exhaustive()
    }
}
