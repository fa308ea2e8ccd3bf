//! geecache: embeddable peer-to-peer distributed cache.
//!
//! A process hosts named cache groups, each pairing a weight-bounded LRU
//! cache with a user loader. Groups can be spread across nodes with
//! consistent-hash routing so every key has one owning node, concurrent
//! duplicate loads collapse into a single execution, and peers exchange
//! values over a small HTTP protocol.
//!
//! ```
//! use geecache::error::LoaderError;
//! use geecache::group::Registry;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let registry = Registry::new();
//!     let group = registry.add_group("echo", 2 << 10, |key: &str| -> Result<Vec<u8>, LoaderError> {
//!         Ok(key.as_bytes().to_vec())
//!     });
//!
//!     let view = group.get("Tom").await.expect("loader always succeeds");
//!     assert_eq!(view.to_string(), "Tom");
//! }
//! ```

pub mod byteview;
pub mod cache;
pub mod ds;
pub mod error;
pub mod group;
pub mod http;
pub mod peer;
pub mod policy;
pub mod prelude;
pub mod singleflight;
pub mod traits;
pub mod wire;
