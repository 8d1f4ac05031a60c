//! Test fixtures and request bodies.

use hashbar_core::{AnalyticsEvent, CampaignKind, EventType};
use serde_json::{json, Value};
use uuid::Uuid;

/// Key the mock auth service treats as an administrator.
pub const ADMIN_KEY: &str = "hbk_test_ABC123xyz789DEF456ghi012JKL345mn";

/// Valid key without `manage_options`.
pub const EDITOR_KEY: &str = "hbk_test_EDT123xyz789DEF456ghi012JKL345mn";

/// Key the mock auth service reports as revoked.
pub const REVOKED_KEY: &str = "hbk_live_REV123xyz789DEF456ghi012JKL345mn";

/// Well-formed key the mock auth service does not know.
pub const UNKNOWN_KEY: &str = "hbk_live_UNK123xyz789DEF456ghi012JKL345mn";

pub const DESKTOP_UA: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Body for creating a campaign with the given variant split.
pub fn campaign_body(title: &str, variants: &[(&str, u8)]) -> Value {
    let variants: Vec<Value> = variants
        .iter()
        .map(|(id, pct)| {
            json!({
                "id": id,
                "name": format!("Variant {}", id.to_uppercase()),
                "traffic_percent": pct,
            })
        })
        .collect();

    json!({
        "title": title,
        "status": "published",
        "config": {
            "schema_version": 1,
            "ab_test": { "enabled": !variants.is_empty(), "variants": variants },
            "settings": { "background_color": "#111111", "position": "top" }
        }
    })
}

/// Track body for a popup event.
pub fn popup_track(popup_id: u64, variant: Option<&str>, event_type: &str, session: &str) -> Value {
    json!({
        "popup_id": popup_id,
        "variant_id": variant,
        "event_type": event_type,
        "session_id": session,
        "page_url": "https://shop.example.com/product/blue-hat",
    })
}

/// Track body for an announcement bar event.
pub fn bar_track(bar_id: u64, variant: Option<&str>, event_type: &str, session: &str) -> Value {
    json!({
        "bar_id": bar_id,
        "variant_id": variant,
        "event_type": event_type,
        "session_id": session,
        "page_url": "https://shop.example.com/",
        "country": "Germany",
        "country_code": "de",
    })
}

/// Generates `n` events of a type for one variant, each in its own session.
pub fn events(
    kind: CampaignKind,
    campaign_id: u64,
    variant: &str,
    event_type: EventType,
    n: usize,
) -> Vec<AnalyticsEvent> {
    (0..n)
        .map(|_| {
            AnalyticsEvent::new(
                kind,
                campaign_id,
                Some(variant.to_string()),
                event_type,
                Uuid::new_v4().to_string(),
            )
        })
        .collect()
}
