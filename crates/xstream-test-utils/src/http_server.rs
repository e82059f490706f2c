//! Shared async HTTP test server helpers.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use tokio::net::TcpListener;
use url::Url;

/// Lightweight HTTP test server wrapper.
pub struct TestHttpServer {
    base_url: Url,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestHttpServer {
    /// Spawn `router` on a random localhost port.
    pub async fn new(router: Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test HTTP listener");
        let addr = listener
            .local_addr()
            .expect("read test listener local addr");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let server = axum::serve(listener, router).with_graceful_shutdown(async {
            shutdown_rx.await.ok();
        });

        tokio::spawn(async move {
            server.await.expect("run test HTTP server");
        });

        Self {
            base_url: Url::parse(&format!("http://{addr}")).expect("parse base URL"),
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Join path to server base URL.
    #[must_use]
    pub fn url(&self, path: &str) -> Url {
        self.base_url.join(path).expect("join server URL path")
    }

    /// Base URL of this server.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

impl Drop for TestHttpServer {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
    }
}

#[derive(Clone)]
struct BlobState {
    data: Arc<Vec<u8>>,
    fail_offsets: Arc<HashSet<u64>>,
    hits: Arc<Mutex<Vec<u64>>>,
}

/// Fixture server exposing one blob at `/blob` with the range-request
/// contract the HTTP backend expects: 206 for satisfiable ranges (clipped
/// at the end), 416 at/after end-of-resource, 500 for scripted failure
/// offsets. Records the start offset of every range request.
pub struct BlobServer {
    server: TestHttpServer,
    state: BlobState,
}

impl BlobServer {
    pub async fn serve(data: Vec<u8>) -> Self {
        Self::serve_with_failures(data, []).await
    }

    pub async fn serve_with_failures(
        data: Vec<u8>,
        fail_offsets: impl IntoIterator<Item = u64>,
    ) -> Self {
        let state = BlobState {
            data: Arc::new(data),
            fail_offsets: Arc::new(fail_offsets.into_iter().collect()),
            hits: Arc::new(Mutex::new(Vec::new())),
        };
        let router = Router::new()
            .route("/blob", get(blob_endpoint))
            .with_state(state.clone());
        Self {
            server: TestHttpServer::new(router).await,
            state,
        }
    }

    /// URL of the served blob.
    #[must_use]
    pub fn url(&self) -> Url {
        self.server.url("/blob")
    }

    /// URL of a path the server does not serve (404).
    #[must_use]
    pub fn missing_url(&self) -> Url {
        self.server.url("/missing")
    }

    /// Start offsets of all range requests seen so far.
    pub fn requests(&self) -> Vec<u64> {
        self.state.hits.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.hits.lock().unwrap().len()
    }
}

async fn blob_endpoint(State(state): State<BlobState>, headers: HeaderMap) -> impl IntoResponse {
    let Some((start, end)) = parse_range(&headers) else {
        return (StatusCode::BAD_REQUEST, HeaderMap::new(), Vec::new());
    };

    state.hits.lock().unwrap().push(start);

    if state.fail_offsets.contains(&start) {
        return (StatusCode::INTERNAL_SERVER_ERROR, HeaderMap::new(), Vec::new());
    }

    let total = state.data.len() as u64;
    if start >= total {
        return (StatusCode::RANGE_NOT_SATISFIABLE, HeaderMap::new(), Vec::new());
    }

    let end = end.unwrap_or(total - 1).min(total - 1);
    let slice = state.data[start as usize..=end as usize].to_vec();

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::CONTENT_RANGE,
        format!("bytes {start}-{end}/{total}").parse().unwrap(),
    );
    (StatusCode::PARTIAL_CONTENT, response_headers, slice)
}

fn parse_range(headers: &HeaderMap) -> Option<(u64, Option<u64>)> {
    let raw = headers.get(header::RANGE)?.to_str().ok()?;
    let spec = raw.strip_prefix("bytes=")?;
    let (start, end) = spec.split_once('-')?;
    let start = start.parse().ok()?;
    let end = if end.is_empty() {
        None
    } else {
        Some(end.parse().ok()?)
    };
    Some((start, end))
}
