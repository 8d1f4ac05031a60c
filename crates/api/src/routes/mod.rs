//! API routes.

pub mod abtest;
pub mod analytics;
pub mod campaigns;
pub mod health;
pub mod track;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::middleware::{metrics::track_requests, rate_limit::rate_limit};
use crate::state::AppState;

/// Prefix for every non-health route.
pub const API_PREFIX: &str = "/hashbar/v1";

/// Public endpoints called from visitors' browsers; rate limited per IP.
fn public_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/popup-ab-test/track", post(track::track_popup))
        .route("/popup-ab-test/assign", post(abtest::popup_assign))
        .route("/ab-test/track", post(track::track_bar))
        .route("/ab-test/assign", post(abtest::bar_assign))
        .route("/announcement-analytics/track", post(track::track_bar))
        .route("/popup-analytics/track", post(track::track_popup))
        .route_layer(middleware::from_fn_with_state(state, rate_limit))
}

/// Admin endpoints; every handler takes an `AdminContext`.
fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/popup-ab-test/stats/:popup_id", get(abtest::popup_stats))
        .route("/popup-ab-test/winner/:popup_id", get(abtest::popup_winner))
        .route("/ab-test/stats/:bar_id", get(abtest::bar_stats))
        .route("/ab-test/winner/:bar_id", get(abtest::bar_winner))
        .route("/announcement-analytics/:bar_id", get(analytics::bar_overview))
        .route("/popup-analytics/:popup_id", get(analytics::popup_overview))
        .route(
            "/bars",
            get(campaigns::list_bars).post(campaigns::create_bar),
        )
        .route(
            "/bars/:id",
            get(campaigns::get_bar)
                .put(campaigns::update_bar)
                .delete(campaigns::delete_bar),
        )
        .route(
            "/popups",
            get(campaigns::list_popups).post(campaigns::create_popup),
        )
        .route(
            "/popups/:id",
            get(campaigns::get_popup)
                .put(campaigns::update_popup)
                .delete(campaigns::delete_popup),
        )
        .route("/metrics", get(health::metrics_handler))
}

/// Creates the API router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = public_routes(state.clone()).merge(admin_routes());

    Router::new()
        .nest(API_PREFIX, api)
        .route("/health", get(health::health_handler))
        .route("/health/ready", get(health::ready_handler))
        .route("/health/live", get(health::live_handler))
        .layer(middleware::from_fn(track_requests))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
