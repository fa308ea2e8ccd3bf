//! Cache groups and the group registry.
//!
//! A [`Group`] is one named cache namespace: a byte-budgeted local cache, a
//! user [`Loader`] as the source of truth, a single-flight guard, and an
//! optional peer picker for distribution. The [`Registry`] owns every group
//! in the process and hands out shared handles; it is an explicit object
//! passed to whoever needs lookup, not a hidden global.
//!
//! ## Lookup flow
//!
//! ```text
//!   Group::get(key)
//!       │
//!       ├─ empty key ───────────────► GetError::EmptyKey
//!       ├─ local cache hit ─────────► clone of cached view
//!       └─ miss ─► single flight ─┬─ peer owns key ─► remote fetch
//!                                 │        │ success: return, do NOT cache
//!                                 │        └ failure: warn, fall through
//!                                 └─ otherwise ─► loader ─► populate cache
//! ```
//!
//! Values fetched from a peer are returned without entering the local
//! cache; only the key's owning node caches it, so a value occupies cluster
//! memory once instead of once per node that happened to proxy it.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::byteview::ByteView;
use crate::cache::{CacheStats, LocalCache};
use crate::error::GetError;
use crate::peer::PeerPicker;
use crate::singleflight::FlightGroup;
use crate::traits::Loader;

/// Process-wide mapping from group name to group handle.
///
/// # Example
///
/// ```
/// use geecache::error::LoaderError;
/// use geecache::group::Registry;
///
/// let registry = Registry::new();
/// registry.add_group("scores", 2 << 10, |key: &str| -> Result<Vec<u8>, LoaderError> {
///     Ok(key.as_bytes().to_vec())
/// });
///
/// assert!(registry.get_group("scores").is_some());
/// assert!(registry.get_group("users").is_none());
/// ```
#[derive(Default)]
pub struct Registry {
    groups: RwLock<FxHashMap<String, Arc<Group>>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a group and registers it under `name`.
    ///
    /// `capacity_bytes` bounds the group's local cache; zero means
    /// unbounded. Registering a name that already exists replaces the old
    /// group and logs a warning.
    pub fn add_group(
        &self,
        name: impl Into<String>,
        capacity_bytes: u64,
        loader: impl Loader + 'static,
    ) -> Arc<Group> {
        let name = name.into();
        let group = Arc::new(Group {
            name: name.clone(),
            loader: Box::new(loader),
            cache: LocalCache::new(capacity_bytes),
            peers: OnceCell::new(),
            flight: FlightGroup::new(),
        });

        let mut groups = self.groups.write();
        if groups.insert(name.clone(), Arc::clone(&group)).is_some() {
            warn!(group = %name, "replacing existing group registration");
        }
        group
    }

    /// Returns the group registered under `name`, if any.
    pub fn get_group(&self, name: &str) -> Option<Arc<Group>> {
        let groups = self.groups.read();
        groups.get(name).cloned()
    }
}

/// One named cache namespace.
pub struct Group {
    name: String,
    loader: Box<dyn Loader>,
    cache: LocalCache,
    peers: OnceCell<Arc<dyn PeerPicker>>,
    flight: FlightGroup<Result<ByteView, GetError>>,
}

impl Group {
    /// Returns the group's registered name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns counters for the group's local cache.
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Wires the group to a peer picker for distributed lookups.
    ///
    /// # Panics
    ///
    /// Panics if called more than once; wiring peers twice is a
    /// programming mistake, caught at setup time.
    pub fn register_peer_picker(&self, picker: Arc<dyn PeerPicker>) {
        if self.peers.set(picker).is_err() {
            panic!("register_peer_picker called more than once");
        }
    }

    /// Returns the value for `key`, loading it on a miss.
    ///
    /// Concurrent misses for the same key collapse into one load; every
    /// caller receives the same outcome.
    pub async fn get(&self, key: &str) -> Result<ByteView, GetError> {
        if key.is_empty() {
            return Err(GetError::EmptyKey);
        }
        if let Some(view) = self.cache.get(key) {
            debug!(group = %self.name, key, "cache hit");
            return Ok(view);
        }
        self.load(key).await
    }

    async fn load(&self, key: &str) -> Result<ByteView, GetError> {
        self.flight
            .run(key, || async {
                if let Some(picker) = self.peers.get() {
                    if let Some(peer) = picker.pick_peer(key) {
                        match peer.fetch(&self.name, key).await {
                            Ok(bytes) => return Ok(ByteView::from(bytes)),
                            Err(error) => {
                                warn!(group = %self.name, key, %error, "failed to get from peer");
                            }
                        }
                    }
                }
                self.load_locally(key)
            })
            .await
    }

    fn load_locally(&self, key: &str) -> Result<ByteView, GetError> {
        let bytes = self.loader.load(key).map_err(|source| GetError::Loader {
            key: key.to_owned(),
            source,
        })?;
        let view = ByteView::from(bytes);
        self.cache.add(key, view.clone());
        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;
    use crate::error::{LoaderError, TransportError};
    use crate::peer::PeerFetcher;

    fn scores_db() -> HashMap<&'static str, &'static str> {
        HashMap::from([("Tom", "630"), ("Jack", "345"), ("Sam", "562")])
    }

    fn scores_group(registry: &Registry) -> (Arc<Group>, Arc<Mutex<HashMap<String, usize>>>) {
        let load_counts: Arc<Mutex<HashMap<String, usize>>> = Arc::new(Mutex::new(HashMap::new()));
        let counts = Arc::clone(&load_counts);
        let group = registry.add_group("scores", 2 << 10, move |key: &str| {
            *counts.lock().entry(key.to_owned()).or_insert(0) += 1;
            match scores_db().get(key) {
                Some(value) => Ok(value.as_bytes().to_vec()),
                None => Err(LoaderError::new(format!("{key} not exist"))),
            }
        });
        (group, load_counts)
    }

    #[tokio::test]
    async fn empty_key_is_rejected() {
        let registry = Registry::new();
        let (group, _) = scores_group(&registry);
        assert_eq!(group.get("").await, Err(GetError::EmptyKey));
    }

    #[tokio::test]
    async fn loader_runs_once_per_key() {
        let registry = Registry::new();
        let (group, load_counts) = scores_group(&registry);

        for (key, value) in scores_db() {
            let view = group.get(key).await.expect("known key loads");
            assert_eq!(view.to_string(), value);

            // Second lookup is a cache hit; the loader is not consulted.
            let view = group.get(key).await.expect("cached key loads");
            assert_eq!(view.to_string(), value);
            assert_eq!(load_counts.lock()[key], 1, "cache {key} miss");
        }
    }

    #[tokio::test]
    async fn unknown_key_is_loader_error_and_not_cached() {
        let registry = Registry::new();
        let (group, load_counts) = scores_group(&registry);

        for _ in 0..2 {
            let err = group.get("Unknown").await.unwrap_err();
            assert!(matches!(err, GetError::Loader { .. }));
        }
        // No cache entry was created, so every lookup reached the loader.
        assert_eq!(load_counts.lock()["Unknown"], 2);
        assert_eq!(group.stats().entries, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_misses_collapse_to_one_load() {
        let registry = Registry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let group = registry.add_group(
            "scores",
            2 << 10,
            move |_key: &str| -> Result<Vec<u8>, LoaderError> {
                counter.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(100));
                Ok(b"630".to_vec())
            },
        );

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let group = Arc::clone(&group);
            tasks.push(tokio::spawn(async move { group.get("Tom").await }));
        }
        for task in tasks {
            let view = task.await.expect("task panicked").expect("load succeeds");
            assert_eq!(view.to_string(), "630");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn registry_returns_registered_groups() {
        let registry = Registry::new();
        let (group, _) = scores_group(&registry);

        let found = registry.get_group("scores").expect("group is registered");
        assert_eq!(found.name(), group.name());
        assert!(registry.get_group("users").is_none());
    }

    #[tokio::test]
    async fn reregistering_replaces_the_group() {
        let registry = Registry::new();
        registry.add_group("scores", 0, |_: &str| -> Result<Vec<u8>, LoaderError> {
            Ok(b"old".to_vec())
        });
        registry.add_group("scores", 0, |_: &str| -> Result<Vec<u8>, LoaderError> {
            Ok(b"new".to_vec())
        });

        let group = registry.get_group("scores").expect("group is registered");
        let view = group.get("any").await.expect("load succeeds");
        assert_eq!(view.to_string(), "new");
    }

    struct StubFetcher {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl PeerFetcher for StubFetcher {
        async fn fetch(&self, _group: &str, key: &str) -> Result<Vec<u8>, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(TransportError::Status { status: 500 })
            } else {
                Ok(format!("peer:{key}").into_bytes())
            }
        }
    }

    struct StubPicker {
        fetcher: Option<Arc<StubFetcher>>,
    }

    impl PeerPicker for StubPicker {
        fn pick_peer(&self, _key: &str) -> Option<Arc<dyn PeerFetcher>> {
            self.fetcher
                .as_ref()
                .map(|fetcher| Arc::clone(fetcher) as Arc<dyn PeerFetcher>)
        }
    }

    #[tokio::test]
    async fn remote_values_are_returned_but_not_cached() {
        let registry = Registry::new();
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let group = registry.add_group(
            "scores",
            2 << 10,
            move |_key: &str| -> Result<Vec<u8>, LoaderError> {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(b"local".to_vec())
            },
        );

        let fetcher = Arc::new(StubFetcher {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        group.register_peer_picker(Arc::new(StubPicker {
            fetcher: Some(Arc::clone(&fetcher)),
        }));

        for _ in 0..2 {
            let view = group.get("Tom").await.expect("remote fetch succeeds");
            assert_eq!(view.to_string(), "peer:Tom");
        }
        // Both lookups went to the peer: remote values never enter the
        // local cache and the loader is never consulted.
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
        assert_eq!(loads.load(Ordering::SeqCst), 0);
        assert_eq!(group.stats().entries, 0);
    }

    #[tokio::test]
    async fn failed_remote_fetch_falls_back_to_loader() {
        let registry = Registry::new();
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let group = registry.add_group(
            "scores",
            2 << 10,
            move |_key: &str| -> Result<Vec<u8>, LoaderError> {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(b"local".to_vec())
            },
        );

        let fetcher = Arc::new(StubFetcher {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        group.register_peer_picker(Arc::new(StubPicker {
            fetcher: Some(Arc::clone(&fetcher)),
        }));

        let view = group.get("Tom").await.expect("fallback succeeds");
        assert_eq!(view.to_string(), "local");
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        // The fallback populated the cache, so the peer is not retried.
        let view = group.get("Tom").await.expect("cache hit");
        assert_eq!(view.to_string(), "local");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_peer_resolved_serves_locally() {
        let registry = Registry::new();
        let (group, load_counts) = scores_group(&registry);
        group.register_peer_picker(Arc::new(StubPicker { fetcher: None }));

        let view = group.get("Tom").await.expect("local load succeeds");
        assert_eq!(view.to_string(), "630");
        assert_eq!(load_counts.lock()["Tom"], 1);
        assert_eq!(group.stats().entries, 1);
    }

    #[test]
    #[should_panic(expected = "register_peer_picker called more than once")]
    fn double_peer_registration_panics() {
        let registry = Registry::new();
        let (group, _) = scores_group(&registry);
        group.register_peer_picker(Arc::new(StubPicker { fetcher: None }));
        group.register_peer_picker(Arc::new(StubPicker { fetcher: None }));
    }
}
