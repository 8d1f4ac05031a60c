//! Tests for event tracking and the analytics overview.

use axum::http::{HeaderName, HeaderValue, StatusCode};
use hashbar_core::{CampaignKind, EventType};
use integration_tests::{
    fixtures,
    mocks::{FailingAnalyticsStore, FailureMode},
    setup::{TestContext, PREFIX},
};
use serde_json::{json, Value};
use std::sync::Arc;

#[tokio::test]
async fn test_track_is_idempotent_per_session_and_type() {
    let ctx = TestContext::new().await;
    let id = ctx
        .create_campaign("/popups", &fixtures::campaign_body("Exit", &[("b", 50)]))
        .await;
    let body = fixtures::popup_track(id, Some("b"), "view", "sess-1");

    let first = ctx.public_post("/popup-ab-test/track", &body).await;
    first.assert_status_ok();
    let first: Value = first.json();
    assert_eq!(first["data"]["tracked"], true);
    assert_eq!(first["data"]["duplicate"], false);

    let second = ctx.public_post("/popup-ab-test/track", &body).await;
    second.assert_status_ok();
    let second: Value = second.json();
    assert_eq!(second["data"]["duplicate"], true);

    // Another event type in the same session is recorded
    let click = fixtures::popup_track(id, Some("b"), "click", "sess-1");
    let third: Value = ctx.public_post("/popup-ab-test/track", &click).await.json();
    assert_eq!(third["data"]["duplicate"], false);

    let stats: Value = ctx.admin_get(&format!("/popup-ab-test/stats/{}", id)).await.json();
    assert_eq!(stats["data"]["total_impressions"], 1);
    assert_eq!(stats["data"]["total_clicks"], 1);
    assert_eq!(stats["data"]["total_visitors"], 1);
}

#[tokio::test]
async fn test_ab_and_analytics_track_share_dedup() {
    let ctx = TestContext::new().await;
    let body = fixtures::bar_track(7, None, "impression", "sess-9");

    let a: Value = ctx.public_post("/ab-test/track", &body).await.json();
    let b: Value = ctx.public_post("/announcement-analytics/track", &body).await.json();
    assert_eq!(a["data"]["duplicate"], false);
    assert_eq!(b["data"]["duplicate"], true);
}

#[tokio::test]
async fn test_track_rejects_unknown_event_type() {
    let ctx = TestContext::new().await;

    let response = ctx
        .public_post("/ab-test/track", &fixtures::bar_track(1, None, "hover", "s"))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "VALID_002");
}

#[tokio::test]
async fn test_track_requires_campaign_id() {
    let ctx = TestContext::new().await;

    let response = ctx
        .public_post("/ab-test/track", &json!({"event_type": "view", "session_id": "s"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALID_001");
    assert!(body["message"].as_str().unwrap_or_default().contains("bar_id"));
}

#[tokio::test]
async fn test_track_malformed_json() {
    let ctx = TestContext::new().await;

    let response = ctx
        .server
        .post(&format!("{}/popup-analytics/track", PREFIX))
        .content_type("application/json")
        .text("{\"popup_id\": 1,")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALID_001");
}

#[tokio::test]
async fn test_track_without_session_is_never_deduplicated() {
    let ctx = TestContext::new().await;
    let body = json!({"popup_id": 3, "event_type": "view"});

    let first: Value = ctx.public_post("/popup-analytics/track", &body).await.json();
    let second: Value = ctx.public_post("/popup-analytics/track", &body).await.json();

    assert_eq!(first["data"]["duplicate"], false);
    assert_eq!(second["data"]["duplicate"], false);
    assert_ne!(first["data"]["session_id"], second["data"]["session_id"]);
}

#[tokio::test]
async fn test_track_enriches_event() {
    let store = Arc::new(FailingAnalyticsStore::new(FailureMode::None));
    let ctx = TestContext::with_analytics(store.clone()).await;

    let response = ctx
        .server
        .post(&format!("{}/announcement-analytics/track", PREFIX))
        .add_header(
            HeaderName::from_static("user-agent"),
            HeaderValue::from_static(fixtures::DESKTOP_UA),
        )
        .add_header(
            HeaderName::from_static("x-forwarded-for"),
            HeaderValue::from_static("198.51.100.7, 10.0.0.1"),
        )
        .json(&fixtures::bar_track(11, Some("b"), "cta", "sess-ua"))
        .await;
    response.assert_status_ok();

    let events = store.stored_events();
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.campaign_type, CampaignKind::Announcement);
    assert_eq!(event.event_type, EventType::Cta);
    assert_eq!(event.variant_id.as_deref(), Some("b"));
    assert_eq!(event.ip, "198.51.100.7");
    assert_eq!(event.device_type, "desktop");
    assert_eq!(event.browser, "Chrome");
    assert_eq!(event.country, "Germany");
    assert_eq!(event.country_code, "DE");
    assert_eq!(event.page_type, "home");
}

#[tokio::test]
async fn test_track_fails_when_table_missing() {
    let store = Arc::new(FailingAnalyticsStore::new(FailureMode::TableMissing));
    let ctx = TestContext::with_analytics(store).await;

    let response = ctx
        .public_post("/popup-ab-test/track", &fixtures::popup_track(1, None, "view", "s"))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "DB_002");
}

#[tokio::test]
async fn test_stats_zeroed_when_table_missing() {
    let store = Arc::new(FailingAnalyticsStore::new(FailureMode::TableMissing));
    let ctx = TestContext::with_analytics(store).await;
    let id = ctx
        .create_campaign("/popups", &fixtures::campaign_body("Gone", &[("b", 50)]))
        .await;

    let response = ctx.admin_get(&format!("/popup-ab-test/stats/{}", id)).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["total_impressions"], 0);
    assert!(body["data"]["winner"].is_null());
}

#[tokio::test]
async fn test_track_insert_failure_is_500() {
    let store = Arc::new(FailingAnalyticsStore::new(FailureMode::InsertFails));
    let ctx = TestContext::with_analytics(store.clone()).await;

    let response = ctx
        .public_post("/ab-test/track", &fixtures::bar_track(1, None, "view", "s"))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["code"], "DB_001");

    store.set_mode(FailureMode::None);
    let response = ctx
        .public_post("/ab-test/track", &fixtures::bar_track(1, None, "view", "s"))
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_analytics_overview() {
    let ctx = TestContext::new().await;
    let id = ctx
        .create_campaign("/popups", &fixtures::campaign_body("Overview", &[("b", 50)]))
        .await;

    let mut mobile = fixtures::popup_track(id, Some("b"), "view", "m1");
    mobile["device_type"] = json!("mobile");
    ctx.public_post("/popup-analytics/track", &mobile).await.assert_status_ok();
    ctx.public_post("/popup-analytics/track", &fixtures::popup_track(id, None, "view", "d1"))
        .await
        .assert_status_ok();
    ctx.public_post("/popup-analytics/track", &fixtures::popup_track(id, None, "submit", "d1"))
        .await
        .assert_status_ok();

    let response = ctx.admin_get(&format!("/popup-analytics/{}?days=7", id)).await;
    response.assert_status_ok();
    let body: Value = response.json();
    let data = &body["data"];

    assert_eq!(data["days"], 7);
    assert_eq!(data["stats"]["total_impressions"], 2);
    assert_eq!(data["stats"]["total_clicks"], 1);

    let daily = data["daily"].as_array().cloned().unwrap_or_default();
    assert_eq!(daily.len(), 1);
    assert_eq!(daily[0]["impressions"], 2);

    let devices = data["devices"].as_array().cloned().unwrap_or_default();
    assert_eq!(devices.len(), 2);
}

#[tokio::test]
async fn test_analytics_overview_rejects_bad_days() {
    let ctx = TestContext::new().await;
    let id = ctx
        .create_campaign("/bars", &fixtures::campaign_body("Days", &[]))
        .await;

    let response = ctx
        .admin_get(&format!("/announcement-analytics/{}?days=lots", id))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = ctx
        .admin_get(&format!("/announcement-analytics/{}", id))
        .await
        .json();
    assert_eq!(body["data"]["days"], 30);
}
