//! HTTP front-end that answers requests through the cache gate.
//!
//! The Rust stand-in for the browser's fetch-event delivery: every incoming
//! request becomes a resolve call, and the gate's answer is relayed with its
//! original status, content type, and body. Responses carry an
//! `x-goatherd-cache: hit|miss` header for debugging.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::gate::{CacheGate, Resolution};
use crate::key::RequestKey;
use crate::net::Network;
use crate::store::CacheStore;

/// Response header naming whether the gate answered from cache or network.
pub const CACHE_HEADER: &str = "x-goatherd-cache";

/// Builds the router: a single fallback route funnels everything through the
/// gate.
pub fn router<S, N>(gate: Arc<CacheGate<S, N>>) -> Router
where
    S: CacheStore + 'static,
    N: Network + 'static,
{
    Router::new()
        .fallback(handle_request::<S, N>)
        .with_state(gate)
}

/// Binds `addr` and serves until `shutdown` is cancelled.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve<S, N>(
    gate: Arc<CacheGate<S, N>>,
    addr: SocketAddr,
    shutdown: CancellationToken,
) -> Result<()>
where
    S: CacheStore + 'static,
    N: Network + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve_on(listener, gate, shutdown).await
}

/// Serves on an already-bound listener until `shutdown` is cancelled.
///
/// # Errors
///
/// Returns an error if the server fails.
pub async fn serve_on<S, N>(
    listener: tokio::net::TcpListener,
    gate: Arc<CacheGate<S, N>>,
    shutdown: CancellationToken,
) -> Result<()>
where
    S: CacheStore + 'static,
    N: Network + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        log::info!("cache gate serving on http://{addr}");
    }
    axum::serve(listener, router(gate))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}

async fn handle_request<S, N>(
    State(gate): State<Arc<CacheGate<S, N>>>,
    uri: Uri,
) -> Response
where
    S: CacheStore + 'static,
    N: Network + 'static,
{
    let raw = uri
        .path_and_query()
        .map_or_else(|| uri.path().to_string(), ToString::to_string);
    let key = RequestKey::new(&raw);

    match gate.resolve(&key).await {
        Ok(resolution) => relay(&resolution),
        Err(Error::NotActive) => {
            (StatusCode::SERVICE_UNAVAILABLE, "cache gate is not active\n").into_response()
        }
        Err(e) => {
            // A miss whose origin fetch failed surfaces as a failed load,
            // the same way the page would have seen it without the gate.
            log::error!("resolve {key} failed: {e}");
            (StatusCode::BAD_GATEWAY, format!("origin fetch failed: {e}\n")).into_response()
        }
    }
}

/// Relays a resolution with its original status, content type, and body.
fn relay(resolution: &Resolution) -> Response {
    let status =
        StatusCode::from_u16(resolution.response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut builder = axum::http::Response::builder()
        .status(status)
        .header(CACHE_HEADER, resolution.source.label());
    if let Some(ct) = &resolution.response.content_type {
        builder = builder.header(CONTENT_TYPE, ct.as_str());
    }

    builder
        .body(Body::from(resolution.response.body.clone()))
        .unwrap_or_else(|e| {
            log::error!("could not build relay response: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })
}
