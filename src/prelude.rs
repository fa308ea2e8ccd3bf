//! Convenience re-exports of the public surface.

pub use crate::byteview::ByteView;
pub use crate::cache::{CacheStats, LocalCache};
pub use crate::ds::ring::HashRing;
pub use crate::error::{GetError, LoaderError, TransportError};
pub use crate::group::{Group, Registry};
pub use crate::http::{HttpFetcher, HttpPool, DEFAULT_BASE_PATH, DEFAULT_REPLICAS};
pub use crate::peer::{PeerFetcher, PeerPicker};
pub use crate::policy::lru::{EvictHook, LruCache};
pub use crate::singleflight::FlightGroup;
pub use crate::traits::{Loader, Weighted};
