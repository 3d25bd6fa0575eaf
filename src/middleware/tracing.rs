use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{info, info_span, warn, Instrument};

/// Request logging middleware: one span per request plus a completion line
/// with status and latency.
pub async fn observability_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str())
        .unwrap_or("unknown")
        .to_string();

    let span = info_span!(
        "http_request",
        method = %method,
        uri = %uri,
        route = %route,
    );

    let start_time = Instant::now();
    let response = next.run(request).instrument(span).await;
    let latency_ms = start_time.elapsed().as_millis();
    let status = response.status().as_u16();

    if status >= 500 {
        warn!(%method, %route, status, latency_ms, "request failed");
    } else {
        info!(%method, %route, status, latency_ms, "request completed");
    }

    response
}
