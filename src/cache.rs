//! Mutex-serialized facade over one eviction cache.
//!
//! [`LocalCache`] is what a [`Group`](crate::group::Group) actually talks
//! to. It serializes every access, reads included, through one exclusive
//! lock, because a read promotes the entry and therefore mutates the
//! recency list. The underlying [`LruCache`] is built lazily on the first
//! write, so a group that never misses never allocates cache storage.
//!
//! Hit and miss counters are recorded under the same lock and exposed as a
//! [`CacheStats`] snapshot.

use parking_lot::Mutex;

use crate::byteview::ByteView;
use crate::policy::lru::LruCache;

/// Point-in-time counters for one group's local cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that fell through to a load.
    pub misses: u64,
    /// Live entries.
    pub entries: usize,
    /// Bytes currently charged against the budget.
    pub used_bytes: u64,
}

#[derive(Default)]
struct CacheCell {
    lru: Option<LruCache<ByteView>>,
    hits: u64,
    misses: u64,
}

/// Thread-safe, lazily-initialized wrapper around one [`LruCache`].
pub struct LocalCache {
    capacity_bytes: u64,
    inner: Mutex<CacheCell>,
}

impl LocalCache {
    /// Creates a facade with the given byte budget (zero means unbounded).
    pub fn new(capacity_bytes: u64) -> Self {
        Self {
            capacity_bytes,
            inner: Mutex::new(CacheCell::default()),
        }
    }

    /// Returns a clone of the cached view, promoting the entry.
    ///
    /// Before the first `add` this is a miss that allocates nothing.
    pub fn get(&self, key: &str) -> Option<ByteView> {
        let mut cell = self.inner.lock();
        let Some(lru) = cell.lru.as_mut() else {
            cell.misses += 1;
            return None;
        };
        match lru.get(key).cloned() {
            Some(view) => {
                cell.hits += 1;
                Some(view)
            }
            None => {
                cell.misses += 1;
                None
            }
        }
    }

    /// Stores `value` under `key`, building the eviction cache on first use.
    pub fn add(&self, key: &str, value: ByteView) {
        let mut cell = self.inner.lock();
        let capacity_bytes = self.capacity_bytes;
        cell.lru
            .get_or_insert_with(|| LruCache::new(capacity_bytes))
            .add(key, value);
    }

    /// Returns the current counters and occupancy.
    pub fn stats(&self) -> CacheStats {
        let cell = self.inner.lock();
        CacheStats {
            hits: cell.hits,
            misses: cell.misses,
            entries: cell.lru.as_ref().map_or(0, LruCache::len),
            used_bytes: cell.lru.as_ref().map_or(0, LruCache::used_bytes),
        }
    }
}
