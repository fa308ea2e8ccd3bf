//! Data structures backing the cache engine.

pub mod ring;

pub use ring::HashRing;
