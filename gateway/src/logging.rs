use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};

/// Middleware that logs one line per HTTP request.
///
/// Gateway failures (5xx: model timeouts, unavailable or misbehaving
/// models) are logged at WARN, everything else at INFO.
pub async fn request_logger(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let duration_ms = started.elapsed().as_millis() as u64;
    if response.status().is_server_error() {
        tracing::warn!(%method, %path, status, duration_ms, "HTTP request failed");
    } else {
        tracing::info!(%method, %path, status, duration_ms, "HTTP request");
    }

    response
}
