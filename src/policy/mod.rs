//! Eviction policies.

pub mod lru;

pub use lru::{EvictHook, LruCache};
