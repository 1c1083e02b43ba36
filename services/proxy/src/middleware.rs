//! Request-scoped middleware: the firewall IP check (upstream-proxy
//! surface only, §4.J), `x-request-id` propagation/generation, and
//! per-request metrics recording.

use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;

use crate::error::AppError;
use crate::handlers::new_request_id;
use crate::state::AppState;

pub async fn firewall_check(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let forwarded_for = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok());

    state.firewall.check(peer.ip(), forwarded_for).await?;
    Ok(next.run(request).await)
}

/// Propagate an incoming `x-request-id`, or mint one, onto both the
/// request (so handlers can read it) and the response (so callers can
/// correlate logs).
pub async fn request_id(mut request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(new_request_id);

    if let Ok(value) = HeaderValue::from_str(&id) {
        request.headers_mut().insert("x-request-id", value.clone());
        let mut response = next.run(request).await;
        response.headers_mut().insert("x-request-id", value);
        response
    } else {
        next.run(request).await
    }
}

/// Record `proxy_requests_total`/`proxy_request_duration_seconds` for
/// every request. Every route this proxy serves is a static path (no
/// `{id}`-style params), so the raw request path is already a safe,
/// low-cardinality metrics label.
pub async fn record_metrics(request: Request, next: Next) -> Response {
    let route = request.uri().path().to_string();
    let start = Instant::now();
    let response = next.run(request).await;
    let duration = start.elapsed().as_secs_f64();

    crate::metrics::record_request(response.status().as_u16(), &route, duration);
    response
}
