//! Inbound HTTP adapter for the responder.
//!
//! Translates `GET /` and `GET /heartbeat` into `Responder::handle` calls and
//! the response back into a status code and JSON body. Also advertises the
//! server-side handling time in `x-response-time-ms`.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::{CrossbeatError, Result};
use crate::heartbeat::{HeartbeatRequest, Responder, PEER_LATENCY_HEADER};

/// Build the router serving heartbeat checks.
pub fn build_router(responder: Arc<Responder>) -> Router {
    Router::new()
        .route("/", get(heartbeat))
        .route("/heartbeat", get(heartbeat))
        .with_state(responder)
        .layer(TraceLayer::new_for_http())
}

/// GET / and GET /heartbeat
async fn heartbeat(State(responder): State<Arc<Responder>>, headers: HeaderMap) -> Response {
    let start = Instant::now();
    let reply = responder.handle(&HeartbeatRequest::from_headers(&headers));

    let status = StatusCode::from_u16(reply.status_code()).unwrap_or(StatusCode::FORBIDDEN);
    let mut response = (status, Json(reply.body())).into_response();

    let elapsed_ms = format!("{:.3}", start.elapsed().as_secs_f64() * 1000.0);
    if let Ok(value) = HeaderValue::from_str(&elapsed_ms) {
        response.headers_mut().insert(PEER_LATENCY_HEADER, value);
    }
    response
}

/// Serve the responder on `addr` until `shutdown` resolves.
pub async fn serve<F>(addr: SocketAddr, responder: Arc<Responder>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve_on(listener, responder, shutdown).await
}

/// Serve on an already-bound listener.
pub async fn serve_on<F>(
    listener: tokio::net::TcpListener,
    responder: Arc<Responder>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(%addr, role = responder.role(), "Heartbeat responder listening");

    axum::serve(listener, build_router(responder))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| CrossbeatError::Server(e.to_string()))?;

    info!(%addr, "Heartbeat responder stopped");
    Ok(())
}
