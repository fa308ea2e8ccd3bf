//! Consistent-hash ring for key-to-node routing.
//!
//! Every real node contributes `replicas` virtual positions so the keyspace
//! splits evenly even with few nodes. A key is owned by the node whose
//! nearest clockwise virtual position follows the key's hash; adding or
//! removing one node only remaps the keys whose nearest successor changed,
//! unlike modulo hashing where almost every key moves.
//!
//! ## Architecture
//!
//! ```text
//!   ring: sorted Vec<u32>                nodes: FxHashMap<u32, String>
//!
//!        0 ──► 02 ──► 04 ──► 06 ─┐       02 ─► "node-2"   04 ─► "node-4"
//!        ▲                       │       12 ─► "node-2"   14 ─► "node-4"
//!        └── 26 ◄── 22 ◄── 12 ◄──┘       ...
//!
//!   resolve(k): binary-search the first ring value >= hash(k),
//!   wrapping past the largest value back to index 0.
//! ```
//!
//! ## Behavior
//! - `add_nodes(ids)`: append `replicas` positions per id, re-sort once
//! - `resolve(key)`: nearest-successor lookup; empty ring yields `None`
//! - the hash function is pluggable; the default is a 32-bit CRC
//!
//! ## Performance
//! - `resolve`: O(log n) over virtual positions
//! - `add_nodes`: O(n log n) re-sort, paid only on topology change

use std::fmt;

use rustc_hash::FxHashMap;

/// Consistent-hash router mapping keys to node identities.
///
/// # Example
///
/// ```
/// use geecache::ds::ring::HashRing;
///
/// let mut ring = HashRing::new(3);
/// ring.add_nodes(["node-a", "node-b"]);
///
/// let owner = ring.resolve("some-key").map(str::to_owned).expect("ring is non-empty");
/// // The same key always resolves to the same node.
/// assert_eq!(ring.resolve("some-key"), Some(owner.as_str()));
/// ```
pub struct HashRing {
    replicas: usize,
    hash: Box<dyn Fn(&[u8]) -> u32 + Send + Sync>,
    ring: Vec<u32>,
    nodes: FxHashMap<u32, String>,
}

impl HashRing {
    /// Creates a ring using the default 32-bit CRC hash.
    ///
    /// `replicas` is the number of virtual positions per node, clamped to
    /// at least 1.
    pub fn new(replicas: usize) -> Self {
        Self::with_hasher(replicas, |bytes| crc32fast::hash(bytes))
    }

    /// Creates a ring with a caller-supplied hash function.
    pub fn with_hasher(
        replicas: usize,
        hash: impl Fn(&[u8]) -> u32 + Send + Sync + 'static,
    ) -> Self {
        Self {
            replicas: replicas.max(1),
            hash: Box::new(hash),
            ring: Vec::new(),
            nodes: FxHashMap::default(),
        }
    }

    /// Adds real nodes to the ring.
    ///
    /// Each id contributes `replicas` virtual positions named by
    /// `hash("{i}{id}")`. The ring is re-sorted once per call, so batched
    /// additions cost one sort.
    pub fn add_nodes<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for id in ids {
            let id = id.into();
            for i in 0..self.replicas {
                let position = (self.hash)(format!("{i}{id}").as_bytes());
                self.ring.push(position);
                self.nodes.insert(position, id.clone());
            }
        }
        self.ring.sort_unstable();
    }

    /// Returns the node owning `key`, or `None` on an empty ring.
    pub fn resolve(&self, key: &str) -> Option<&str> {
        if self.ring.is_empty() {
            return None;
        }
        let hash = (self.hash)(key.as_bytes());
        let idx = self.ring.partition_point(|&position| position < hash);
        let position = self.ring[if idx == self.ring.len() { 0 } else { idx }];
        self.nodes.get(&position).map(String::as_str)
    }

    /// Returns the number of virtual positions on the ring.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns `true` if no nodes have been added.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}

impl fmt::Debug for HashRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashRing")
            .field("replicas", &self.replicas)
            .field("virtual_nodes", &self.ring.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Digit-string keys hash to their numeric value, making ring
    /// positions predictable.
    fn identity_ring() -> HashRing {
        HashRing::with_hasher(3, |bytes| {
            std::str::from_utf8(bytes)
                .ok()
                .and_then(|text| text.parse().ok())
                .unwrap_or(0)
        })
    }

    #[test]
    fn resolves_nearest_successor_with_wraparound() {
        let mut ring = identity_ring();
        // Virtual positions: 02/12/22, 04/14/24, 06/16/26.
        ring.add_nodes(["6", "4", "2"]);

        let cases = [("2", "2"), ("11", "2"), ("23", "4"), ("27", "2")];
        for (key, node) in cases {
            assert_eq!(ring.resolve(key), Some(node), "key {key}");
        }
    }

    #[test]
    fn adding_node_remaps_only_adjacent_keys() {
        let mut ring = identity_ring();
        ring.add_nodes(["6", "4", "2"]);
        ring.add_nodes(["8"]);

        // 27 now lands on 8's virtual position 28; the rest are unchanged.
        let cases = [("2", "2"), ("11", "2"), ("23", "4"), ("27", "8")];
        for (key, node) in cases {
            assert_eq!(ring.resolve(key), Some(node), "key {key}");
        }
    }

    #[test]
    fn empty_ring_resolves_to_none() {
        let ring = HashRing::new(3);
        assert!(ring.is_empty());
        assert_eq!(ring.resolve("anything"), None);
    }

    #[test]
    fn replica_count_is_clamped() {
        let mut ring = HashRing::new(0);
        ring.add_nodes(["only"]);
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.resolve("key"), Some("only"));
    }

    #[test]
    fn default_hash_is_deterministic() {
        let mut a = HashRing::new(50);
        let mut b = HashRing::new(50);
        a.add_nodes(["http://localhost:8001", "http://localhost:8002"]);
        b.add_nodes(["http://localhost:8001", "http://localhost:8002"]);

        for key in ["Tom", "Jack", "Sam", "unknown"] {
            assert_eq!(a.resolve(key), b.resolve(key));
        }
    }

    #[test]
    fn single_node_owns_every_key() {
        let mut ring = HashRing::new(50);
        ring.add_nodes(["http://localhost:8001"]);
        for key in ["a", "b", "c", "d"] {
            assert_eq!(ring.resolve(key), Some("http://localhost:8001"));
        }
    }
}
