//! Peer capabilities: routing keys to peers and fetching from them.
//!
//! Distribution is split into two seams so each can be faked on its own:
//!
//! | Trait           | Capability                                   |
//! |-----------------|----------------------------------------------|
//! | [`PeerPicker`]  | map a key to the peer that owns it           |
//! | [`PeerFetcher`] | fetch one group's value from a specific peer |
//!
//! [`Group`](crate::group::Group) composes the two: the picker decides
//! whether a key is served remotely, and if so hands back the fetcher for
//! the owning peer. [`HttpPool`](crate::http::HttpPool) implements the
//! picker over a consistent-hash ring and hands out HTTP fetchers.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TransportError;

/// Fetches a value for `(group, key)` from one remote peer.
#[async_trait]
pub trait PeerFetcher: Send + Sync {
    /// Returns the raw value bytes held by the peer.
    async fn fetch(&self, group: &str, key: &str) -> Result<Vec<u8>, TransportError>;
}

/// Routes a key to the peer that owns it.
pub trait PeerPicker: Send + Sync {
    /// Returns the fetcher for the owning peer, or `None` when the key
    /// should be served locally (no peers configured, or the key hashes to
    /// this node).
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerFetcher>>;
}
