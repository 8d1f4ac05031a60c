//! Tests for variant assignment, statistics and winner selection.

use axum::http::StatusCode;
use hashbar_core::{CampaignKind, EventType};
use integration_tests::{fixtures, setup::TestContext};
use serde_json::{json, Value};
use std::collections::HashMap;

/// Seeds the A(120/30/10) vs B(150/20/5) scenario.
async fn seed_scenario(ctx: &TestContext, kind: CampaignKind, id: u64) {
    for (variant, impressions, clicks, conversions) in [("a", 120, 30, 10), ("b", 150, 20, 5)] {
        ctx.seed(fixtures::events(kind, id, variant, EventType::View, impressions)).await;
        ctx.seed(fixtures::events(kind, id, variant, EventType::Click, clicks)).await;
        ctx.seed(fixtures::events(kind, id, variant, EventType::Conversion, conversions)).await;
    }
}

fn variant<'a>(stats: &'a Value, id: &str) -> &'a Value {
    stats["variants"]
        .as_array()
        .and_then(|vs| vs.iter().find(|v| v["variant_id"] == id))
        .unwrap_or_else(|| panic!("variant {} missing", id))
}

#[tokio::test]
async fn test_assign_returns_control_when_ab_disabled() {
    let ctx = TestContext::new().await;
    let id = ctx
        .create_campaign("/popups", &fixtures::campaign_body("Newsletter", &[]))
        .await;

    let response = ctx
        .public_post("/popup-ab-test/assign", &json!({"popup_id": id, "visitor_id": "v-1"}))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["variant_id"], "control");
}

#[tokio::test]
async fn test_assign_is_sticky_per_visitor() {
    let ctx = TestContext::new().await;
    let id = ctx
        .create_campaign("/bars", &fixtures::campaign_body("Free shipping", &[("b", 40), ("c", 30)]))
        .await;

    for visitor in 0..20 {
        let body = json!({"bar_id": id, "visitor_id": format!("visitor-{}", visitor)});
        let first: Value = ctx.public_post("/ab-test/assign", &body).await.json();
        let first = first["data"]["variant_id"].clone();
        assert!(["control", "b", "c"].contains(&first.as_str().unwrap_or_default()));

        for _ in 0..3 {
            let again: Value = ctx.public_post("/ab-test/assign", &body).await.json();
            assert_eq!(again["data"]["variant_id"], first);
        }
    }
}

#[tokio::test]
async fn test_assign_approximates_traffic_split() {
    let ctx = TestContext::new().await;
    let id = ctx
        .create_campaign("/popups", &fixtures::campaign_body("Exit intent", &[("b", 30)]))
        .await;

    let mut counts: HashMap<String, u32> = HashMap::new();
    for visitor in 0..2000 {
        let body: Value = ctx
            .public_post(
                "/popup-ab-test/assign",
                &json!({"popup_id": id, "visitor_id": format!("v{}", visitor)}),
            )
            .await
            .json();
        let variant = body["data"]["variant_id"].as_str().unwrap_or_default().to_string();
        *counts.entry(variant).or_default() += 1;
    }

    let b_share = counts.get("b").copied().unwrap_or(0) as f64 / 2000.0;
    assert!((b_share - 0.30).abs() < 0.05, "b share was {}", b_share);
    assert_eq!(counts.len(), 2);
}

#[tokio::test]
async fn test_assign_unknown_or_wrong_kind_is_404() {
    let ctx = TestContext::new().await;
    let bar_id = ctx
        .create_campaign("/bars", &fixtures::campaign_body("Sale", &[("b", 50)]))
        .await;

    let response = ctx
        .public_post("/popup-ab-test/assign", &json!({"popup_id": bar_id, "visitor_id": "v"}))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "NOT_FOUND");

    let response = ctx
        .public_post("/ab-test/assign", &json!({"bar_id": 9999, "visitor_id": "v"}))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_assign_missing_fields_is_400() {
    let ctx = TestContext::new().await;

    let response = ctx.public_post("/ab-test/assign", &json!({"visitor_id": "v"})).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["message"].as_str().unwrap_or_default().contains("bar_id"));

    let response = ctx.public_post("/ab-test/assign", &json!({"bar_id": 1})).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["message"].as_str().unwrap_or_default().contains("visitor_id"));
}

#[tokio::test]
async fn test_stats_scenario() {
    let ctx = TestContext::new().await;
    let id = ctx
        .create_campaign("/popups", &fixtures::campaign_body("Spin", &[("a", 50), ("b", 50)]))
        .await;
    seed_scenario(&ctx, CampaignKind::Popup, id).await;

    let response = ctx.admin_get(&format!("/popup-ab-test/stats/{}", id)).await;
    response.assert_status_ok();
    let body: Value = response.json();
    let stats = &body["data"];

    assert_eq!(stats["total_impressions"], 270);
    assert_eq!(stats["total_clicks"], 50);
    assert_eq!(stats["total_conversions"], 15);
    assert_eq!(stats["total_visitors"], 335);

    // Ordered by impressions descending
    assert_eq!(stats["variants"][0]["variant_id"], "b");

    let a = variant(stats, "a");
    assert_eq!(a["ctr"], 25.0);
    assert_eq!(a["conversion_rate"], 8.33);
    assert_eq!(a["variant_name"], "Variant A");

    let b = variant(stats, "b");
    assert_eq!(b["ctr"], 13.33);
    assert_eq!(b["conversion_rate"], 3.33);

    assert_eq!(stats["winner"]["variant_id"], "a");
    assert_eq!(stats["winner"]["confidence"], "low");
    assert_eq!(stats["winner"]["confidence_method"], "impression_threshold");
}

#[tokio::test]
async fn test_winner_endpoint() {
    let ctx = TestContext::new().await;
    let id = ctx
        .create_campaign("/bars", &fixtures::campaign_body("Banner", &[("a", 50), ("b", 50)]))
        .await;
    seed_scenario(&ctx, CampaignKind::Announcement, id).await;

    let response = ctx.admin_get(&format!("/ab-test/winner/{}", id)).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["winner"]["variant_id"], "a");
    assert_eq!(body["data"]["winner"]["conversion_rate"], 8.33);
}

#[tokio::test]
async fn test_winner_null_with_single_variant() {
    let ctx = TestContext::new().await;
    let id = ctx
        .create_campaign("/popups", &fixtures::campaign_body("Solo", &[("a", 100)]))
        .await;
    ctx.seed(fixtures::events(CampaignKind::Popup, id, "a", EventType::View, 600)).await;
    ctx.seed(fixtures::events(CampaignKind::Popup, id, "a", EventType::Submission, 60)).await;

    let body: Value = ctx.admin_get(&format!("/popup-ab-test/winner/{}", id)).await.json();
    assert!(body["data"]["winner"].is_null());

    let body: Value = ctx.admin_get(&format!("/popup-ab-test/stats/{}", id)).await.json();
    assert_eq!(body["data"]["total_conversions"], 60);
    assert!(body["data"]["winner"].is_null());
}

#[tokio::test]
async fn test_stats_empty_campaign() {
    let ctx = TestContext::new().await;
    let id = ctx
        .create_campaign("/bars", &fixtures::campaign_body("Quiet", &[("b", 50)]))
        .await;

    let body: Value = ctx.admin_get(&format!("/ab-test/stats/{}", id)).await.json();
    assert_eq!(body["data"]["total_impressions"], 0);
    assert_eq!(body["data"]["variants"].as_array().map(Vec::len), Some(0));
    assert!(body["data"]["winner"].is_null());
}

#[tokio::test]
async fn test_stats_for_wrong_kind_is_404() {
    let ctx = TestContext::new().await;
    let id = ctx
        .create_campaign("/popups", &fixtures::campaign_body("Popup", &[]))
        .await;

    let response = ctx.admin_get(&format!("/ab-test/stats/{}", id)).await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["message"], format!("Announcement bar {} not found", id));
}
