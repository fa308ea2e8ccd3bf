//! Demo cluster node.
//!
//! Runs one member of a three-node loopback cluster (ports 8001..8003)
//! backed by a hardcoded score table standing in for a slow database.
//! One node may additionally serve the user-facing API on port 9999:
//!
//! ```text
//!   geecache --port 8001
//!   geecache --port 8002
//!   geecache --port 8003 --api
//!   curl "http://localhost:9999/api?key=Tom"   # -> 630
//! ```

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use clap::Parser;
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::header::CONTENT_TYPE;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use geecache::error::LoaderError;
use geecache::group::{Group, Registry};
use geecache::http::HttpPool;

#[derive(Parser)]
#[command(name = "geecache", about = "Demo distributed cache node")]
struct Args {
    /// Peer server port (one of 8001, 8002, 8003)
    #[arg(long, default_value_t = 8001)]
    port: u16,

    /// Also serve the user-facing API on port 9999
    #[arg(long)]
    api: bool,
}

fn slow_db() -> HashMap<&'static str, &'static str> {
    HashMap::from([("Tom", "630"), ("Jack", "589"), ("Sam", "245")])
}

fn create_group(registry: &Registry) -> Arc<Group> {
    registry.add_group("scores", 2 << 10, |key: &str| {
        info!(key, "slow db lookup");
        slow_db()
            .get(key)
            .map(|value| value.as_bytes().to_vec())
            .ok_or_else(|| LoaderError::new(format!("{key} not exist")))
    })
}

async fn handle_api(group: Arc<Group>, req: Request<Incoming>) -> Response<Full<Bytes>> {
    if req.uri().path() != "/api" {
        return plain(StatusCode::NOT_FOUND, "not found");
    }
    let key = req
        .uri()
        .query()
        .and_then(|query| {
            query
                .split('&')
                .find_map(|pair| pair.strip_prefix("key="))
        })
        .and_then(|raw| urlencoding::decode(raw).ok())
        .map(|decoded| decoded.into_owned())
        .unwrap_or_default();

    match group.get(&key).await {
        Ok(view) => Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(Full::new(Bytes::from(view.to_vec())))
            .unwrap(),
        Err(error) => plain(StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
    }
}

fn plain(status: StatusCode, body: impl Into<String>) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .body(Full::new(Bytes::from(body.into())))
        .unwrap()
}

async fn run_api_server(addr: &str, group: Arc<Group>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr, "frontend server listening");
    loop {
        let (stream, _remote) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let group = Arc::clone(&group);
        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let group = Arc::clone(&group);
                async move { Ok::<_, Infallible>(handle_api(group, req).await) }
            });
            let _ = http1::Builder::new().serve_connection(io, service).await;
        });
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();

    let args = Args::parse();

    let peer_addrs: Vec<String> = [8001u16, 8002, 8003]
        .iter()
        .map(|port| format!("http://localhost:{port}"))
        .collect();
    let self_addr = format!("http://localhost:{}", args.port);

    let registry = Arc::new(Registry::new());
    let group = create_group(&registry);

    let pool = Arc::new(HttpPool::new(self_addr.clone(), Arc::clone(&registry)));
    pool.set_peers(peer_addrs);
    group.register_peer_picker(pool.clone());

    if args.api {
        let group = Arc::clone(&group);
        tokio::spawn(async move {
            if let Err(error) = run_api_server("127.0.0.1:9999", group).await {
                eprintln!("frontend server failed: {error}");
            }
        });
    }

    let listener = TcpListener::bind(("127.0.0.1", args.port)).await?;
    info!(addr = %self_addr, "geecache is running");
    pool.serve(listener).await
}
