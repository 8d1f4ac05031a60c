//! Request latency and in-flight tracking.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use telemetry::metrics;

/// Records latency and in-flight count for every request.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    metrics().active_connections.inc();

    let response = next.run(request).await;

    metrics().active_connections.dec();
    metrics()
        .request_latency_ms
        .observe(start.elapsed().as_millis() as u64);
    response
}
