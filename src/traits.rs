//! Capability traits shared across the crate.
//!
//! Two small seams keep the cache engine decoupled from its surroundings:
//!
//! | Trait        | Capability                                            |
//! |--------------|-------------------------------------------------------|
//! | [`Weighted`] | report a value's byte footprint for budget accounting |
//! | [`Loader`]   | synchronously produce source bytes for a missing key  |
//!
//! [`Weighted`] is what the eviction cache charges against its byte budget;
//! [`ByteView`](crate::byteview::ByteView) is the only implementor used by
//! groups, but the cache itself is polymorphic over any weighted value.
//!
//! [`Loader`] is supplied by the embedding application at group creation.
//! The blanket impl lets a plain closure serve as a loader:
//!
//! ```
//! use geecache::error::LoaderError;
//! use geecache::traits::Loader;
//!
//! let loader = |key: &str| -> Result<Vec<u8>, LoaderError> {
//!     match key {
//!         "Tom" => Ok(b"630".to_vec()),
//!         _ => Err(LoaderError::new(format!("{key} not found"))),
//!     }
//! };
//! assert_eq!(loader.load("Tom").unwrap(), b"630");
//! assert!(loader.load("Jerry").is_err());
//! ```

use crate::error::LoaderError;

/// Byte footprint of a cached value, charged against the cache budget.
pub trait Weighted {
    /// Returns the value's size in bytes.
    fn weight(&self) -> usize;
}

/// Source of truth consulted on a cache miss.
///
/// A loader produces the authoritative bytes for a key, typically from a
/// database or an upstream service. Concurrent misses for the same key are
/// collapsed before the loader is reached, so one miss window invokes it at
/// most once.
pub trait Loader: Send + Sync {
    /// Fetches the bytes for `key` from the backing source.
    fn load(&self, key: &str) -> Result<Vec<u8>, LoaderError>;
}

impl<F> Loader for F
where
    F: Fn(&str) -> Result<Vec<u8>, LoaderError> + Send + Sync,
{
    fn load(&self, key: &str) -> Result<Vec<u8>, LoaderError> {
        self(key)
    }
}
