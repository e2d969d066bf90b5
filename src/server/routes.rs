//! HTTP routes
//!
//! Health check plus the stream endpoint. Every stream request gets its own
//! [`ConnectionHandler`] task, tracked so shutdown can wait for it.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{ConnectInfo, Path, State};
use axum::http::header::HOST;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::backend::Backend;
use super::config::ServerConfig;
use super::handler::{ConnectionHandler, StreamHead};
use super::sink::{stream_response, BodySink};
use crate::error::Error;
use crate::registry::{ContentKey, RegistryError};
use crate::session::ConnectionContext;
use crate::stats::ServerStats;

/// Path answered by the health check
pub const HEALTH_PATH: &str = "/healthz";

#[derive(Debug, Default)]
pub(crate) struct StreamCounters {
    next_session_id: AtomicU64,
    total: AtomicU64,
    active: AtomicU64,
    rejected: AtomicU64,
}

impl StreamCounters {
    pub(crate) fn snapshot(&self) -> ServerStats {
        ServerStats {
            total_connections: self.total.load(Ordering::Relaxed),
            active_connections: self.active.load(Ordering::Relaxed),
            rejected_connections: self.rejected.load(Ordering::Relaxed),
        }
    }
}

/// Shared state of every request handler
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) config: Arc<ServerConfig>,
    pub(crate) backend: Arc<Backend>,
    pub(crate) counters: Arc<StreamCounters>,
    pub(crate) stream_limit: Option<Arc<Semaphore>>,
    pub(crate) tracker: TaskTracker,
    pub(crate) shutdown: CancellationToken,
}

impl AppState {
    /// Take a stream slot; `Err` when the connection limit is reached
    fn acquire(&self) -> Result<Option<OwnedSemaphorePermit>, ()> {
        match &self.stream_limit {
            Some(limit) => Arc::clone(limit).try_acquire_owned().map(Some).map_err(|_| ()),
            None => Ok(None),
        }
    }
}

/// Build the router for `state`
///
/// Single-file mode streams on every path; library mode only on
/// `/:record/:track`.
pub(crate) fn router(state: AppState) -> Router {
    let router = Router::new().route(HEALTH_PATH, get(health));

    let router = if state.backend.is_library() {
        router.route("/:record/:track", get(stream_track))
    } else {
        router
            .route("/", get(stream_single))
            .route("/*path", get(stream_single))
    };

    router.with_state(state)
}

async fn health() -> &'static str {
    "ok\n"
}

async fn stream_single(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
) -> Response {
    open_stream(state, None, method, headers, peer.map(|ConnectInfo(addr)| addr)).await
}

async fn stream_track(
    State(state): State<AppState>,
    Path((record, track)): Path<(String, String)>,
    method: Method,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
) -> Response {
    let key = match ContentKey::new(record, track) {
        Ok(key) => key,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected stream path");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    open_stream(state, Some(key), method, headers, peer.map(|ConnectInfo(addr)| addr)).await
}

/// Map a stream open failure to the status sent to the client
fn error_status(error: &Error) -> StatusCode {
    match error {
        Error::Registry(RegistryError::InvalidKey(_)) | Error::BadRequest(_) => StatusCode::BAD_REQUEST,
        Error::Registry(RegistryError::ShuttingDown(_)) => StatusCode::SERVICE_UNAVAILABLE,
        Error::ContentLoad { .. } | Error::EmptyContent { .. } => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn open_stream(
    state: AppState,
    key: Option<ContentKey>,
    method: Method,
    headers: HeaderMap,
    peer: Option<SocketAddr>,
) -> Response {
    let Ok(permit) = state.acquire() else {
        state.counters.rejected.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(peer = ?peer, "Stream rejected: limit reached");
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    };

    let (pool, subscriber, label) = match state.backend.open(key.as_ref()).await {
        Ok(opened) => opened,
        Err(e) => {
            let status = error_status(&e);
            if status == StatusCode::NOT_FOUND {
                tracing::warn!(error = %e, "Stream content unavailable");
            } else {
                tracing::debug!(error = %e, status = status.as_u16(), "Stream request refused");
            }
            return status.into_response();
        }
    };

    let head = StreamHead::new(state.config.content_type.clone());

    if method == Method::HEAD {
        pool.unregister(subscriber.id());
        return stream_response(&head, Body::empty());
    }

    let session_id = state.counters.next_session_id.fetch_add(1, Ordering::Relaxed) + 1;
    let host = headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let context = ConnectionContext::new(session_id, peer)
        .with_host(host)
        .with_stream(label);

    let handler = ConnectionHandler::new(pool, subscriber, context, head, state.shutdown.clone());
    let (mut sink, pending) = BodySink::channel();

    state.counters.total.fetch_add(1, Ordering::Relaxed);
    state.counters.active.fetch_add(1, Ordering::Relaxed);
    let counters = Arc::clone(&state.counters);

    state.tracker.spawn(async move {
        let _permit = permit;

        if let Err(e) = handler.serve(&mut sink).await {
            tracing::debug!(session_id = session_id, error = %e, "Stream ended with error");
        }

        counters.active.fetch_sub(1, Ordering::Relaxed);
    });

    pending.into_response().await
}
