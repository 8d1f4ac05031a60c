//! Health check and metrics endpoints.

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use telemetry::{health, metrics, HealthReport, MetricsSnapshot};

use crate::extractors::AdminContext;
use crate::response::{ApiResponse, ApiResult};

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub storage_connected: bool,
    pub auth_connected: bool,
    pub active_connections: u64,
    pub report: HealthReport,
}

/// GET /health - Full health check.
pub async fn health_handler() -> Json<HealthResponse> {
    let report = health().report();

    Json(HealthResponse {
        status: format!("{:?}", report.status).to_lowercase(),
        storage_connected: health().storage.is_healthy(),
        auth_connected: health().auth.is_healthy(),
        active_connections: metrics().active_connections.get(),
        report,
    })
}

/// GET /health/ready - Readiness probe (can accept traffic).
pub async fn ready_handler() -> StatusCode {
    if health().is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health/live - Liveness probe (service is running).
pub async fn live_handler() -> StatusCode {
    if health().is_alive() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /hashbar/v1/metrics - In-process metrics snapshot.
pub async fn metrics_handler(_admin: AdminContext) -> ApiResult<MetricsSnapshot> {
    Ok(ApiResponse::ok(metrics().snapshot()))
}
