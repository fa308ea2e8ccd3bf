//! HTTP peer transport: server side and per-peer clients.
//!
//! One [`HttpPool`] per process plays both roles. As a server it answers
//! `GET {base_path}{group}/{key}` for every group in the registry; as a
//! [`PeerPicker`] it routes keys through a consistent-hash ring and hands
//! out the [`HttpFetcher`] for the owning peer.
//!
//! ## Wire protocol
//!
//! | Outcome            | Status | Body                                  |
//! |--------------------|--------|---------------------------------------|
//! | value found        | 200    | [`FetchResponse`] (octet-stream)      |
//! | malformed path     | 400    | `bad request`                         |
//! | unknown group      | 404    | `no such group: {name}`               |
//! | lookup failed      | 500    | error text                            |
//!
//! Group and key path segments are URL-escaped by the client and unescaped
//! by the server, so keys may contain any byte sequence including `/`.
//!
//! Peers are statically configured through [`HttpPool::set_peers`]; there
//! is no discovery or health checking. A dead peer surfaces as a fetch
//! error at call time, and the group falls back to its local loader.

use std::convert::Infallible;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::header::CONTENT_TYPE;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use prost::Message;
use rustc_hash::FxHashMap;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::ds::ring::HashRing;
use crate::error::TransportError;
use crate::group::Registry;
use crate::peer::{PeerFetcher, PeerPicker};
use crate::wire::FetchResponse;

/// Path prefix the peer server answers on.
pub const DEFAULT_BASE_PATH: &str = "/_geecache/";

/// Virtual positions per peer on the routing ring.
pub const DEFAULT_REPLICAS: usize = 50;

struct PoolState {
    ring: HashRing,
    fetchers: FxHashMap<String, Arc<HttpFetcher>>,
}

/// HTTP transport bound to one node.
///
/// `self_addr` is this node's own base address (for example
/// `"http://10.0.0.2:8008"`) and must appear verbatim in the peer list so
/// the picker can recognize keys it owns itself.
pub struct HttpPool {
    self_addr: String,
    base_path: String,
    registry: Arc<Registry>,
    client: reqwest::Client,
    state: Mutex<PoolState>,
}

impl HttpPool {
    /// Creates a transport using [`DEFAULT_BASE_PATH`].
    pub fn new(self_addr: impl Into<String>, registry: Arc<Registry>) -> Self {
        Self::with_base_path(self_addr, registry, DEFAULT_BASE_PATH)
    }

    /// Creates a transport answering on a custom path prefix.
    ///
    /// `base_path` must start and end with `/`.
    pub fn with_base_path(
        self_addr: impl Into<String>,
        registry: Arc<Registry>,
        base_path: impl Into<String>,
    ) -> Self {
        let base_path = base_path.into();
        debug_assert!(base_path.starts_with('/') && base_path.ends_with('/'));
        Self {
            self_addr: self_addr.into(),
            base_path,
            registry,
            client: reqwest::Client::new(),
            state: Mutex::new(PoolState {
                ring: HashRing::new(DEFAULT_REPLICAS),
                fetchers: FxHashMap::default(),
            }),
        }
    }

    /// Returns this node's own base address.
    pub fn self_addr(&self) -> &str {
        &self.self_addr
    }

    /// Returns the path prefix the server answers on.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Replaces the peer set wholesale.
    ///
    /// Rebuilds the routing ring and the per-peer clients under one lock,
    /// so lookups observe either the old topology or the new one, never a
    /// mix. The peer list should include `self_addr`.
    pub fn set_peers<I, S>(&self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let peers: Vec<String> = peers.into_iter().map(Into::into).collect();

        let mut state = self.state.lock();
        let mut ring = HashRing::new(DEFAULT_REPLICAS);
        ring.add_nodes(peers.iter().cloned());
        let mut fetchers = FxHashMap::default();
        for peer in &peers {
            fetchers.insert(
                peer.clone(),
                Arc::new(HttpFetcher {
                    base_url: format!("{}{}", peer, self.base_path),
                    client: self.client.clone(),
                }),
            );
        }
        state.ring = ring;
        state.fetchers = fetchers;
        info!(peers = peers.len(), "peer set updated");
    }

    /// Accepts connections forever, answering peer fetches.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> std::io::Result<()> {
        info!(addr = %listener.local_addr()?, "peer server listening");
        loop {
            let (stream, _remote) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let pool = Arc::clone(&self);
            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let pool = Arc::clone(&pool);
                    async move { Ok::<_, Infallible>(pool.handle(req).await) }
                });
                if let Err(error) = http1::Builder::new().serve_connection(io, service).await {
                    debug!(error = %error, "peer connection error");
                }
            });
        }
    }

    async fn handle(&self, req: Request<Incoming>) -> Response<Full<Bytes>> {
        info!(method = %req.method(), path = req.uri().path(), "serving request");

        let Some((group_name, key)) = self.parse_path(req.uri().path()) else {
            return plain_response(StatusCode::BAD_REQUEST, "bad request");
        };
        let Some(group) = self.registry.get_group(&group_name) else {
            return plain_response(
                StatusCode::NOT_FOUND,
                format!("no such group: {group_name}"),
            );
        };
        match group.get(&key).await {
            Ok(view) => {
                let payload = FetchResponse {
                    value: view.to_vec(),
                }
                .encode_to_vec();
                Response::builder()
                    .status(StatusCode::OK)
                    .header(CONTENT_TYPE, "application/octet-stream")
                    .body(Full::new(Bytes::from(payload)))
                    .unwrap()
            }
            Err(error) => plain_response(StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
        }
    }

    /// Splits `{base_path}{group}/{key}` into unescaped group and key.
    fn parse_path(&self, path: &str) -> Option<(String, String)> {
        let rest = path.strip_prefix(&self.base_path)?;
        let (group, key) = rest.split_once('/')?;
        let group = urlencoding::decode(group).ok()?;
        let key = urlencoding::decode(key).ok()?;
        Some((group.into_owned(), key.into_owned()))
    }
}

impl PeerPicker for HttpPool {
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerFetcher>> {
        let state = self.state.lock();
        let peer = state.ring.resolve(key)?;
        if peer == self.self_addr {
            return None;
        }
        debug!(peer, key, "picked peer");
        let fetcher: Arc<dyn PeerFetcher> = state.fetchers.get(peer)?.clone();
        Some(fetcher)
    }
}

fn plain_response(status: StatusCode, body: impl Into<String>) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .body(Full::new(Bytes::from(body.into())))
        .unwrap()
}

/// Client side of the transport: fetches values from one peer.
pub struct HttpFetcher {
    base_url: String,
    client: reqwest::Client,
}

#[async_trait]
impl PeerFetcher for HttpFetcher {
    async fn fetch(&self, group: &str, key: &str) -> Result<Vec<u8>, TransportError> {
        let url = format!(
            "{}{}/{}",
            self.base_url,
            urlencoding::encode(group),
            urlencoding::encode(key)
        );
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(TransportError::Status {
                status: response.status().as_u16(),
            });
        }
        let body = response.bytes().await?;
        let payload = FetchResponse::decode(body)?;
        Ok(payload.value)
    }
}
