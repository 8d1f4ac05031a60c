//! Analytics event types for campaign tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::campaign::{CampaignKind, CONTROL_VARIANT};
use crate::error::{Error, Result};
use crate::limits::MAX_PAGE_URL_LEN;

/// Tracked event types (allow-list).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    View,
    Impression,
    Click,
    Interaction,
    Cta,
    Secondary,
    Submit,
    Conversion,
    Submission,
    FormSubmit,
    Close,
}

/// Which statistic an event type counts towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCategory {
    Impression,
    Click,
    Conversion,
    Other,
}

impl EventType {
    pub const ALL: [EventType; 11] = [
        Self::View,
        Self::Impression,
        Self::Click,
        Self::Interaction,
        Self::Cta,
        Self::Secondary,
        Self::Submit,
        Self::Conversion,
        Self::Submission,
        Self::FormSubmit,
        Self::Close,
    ];

    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Impression => "impression",
            Self::Click => "click",
            Self::Interaction => "interaction",
            Self::Cta => "cta",
            Self::Secondary => "secondary",
            Self::Submit => "submit",
            Self::Conversion => "conversion",
            Self::Submission => "submission",
            Self::FormSubmit => "form_submit",
            Self::Close => "close",
        }
    }

    /// Parses an event type, rejecting anything outside the allow-list.
    pub fn parse(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::InvalidEventType(s.to_string()))
    }

    pub fn category(&self) -> EventCategory {
        match self {
            Self::View | Self::Impression => EventCategory::Impression,
            Self::Click | Self::Interaction | Self::Cta | Self::Secondary | Self::Submit => {
                EventCategory::Click
            }
            Self::Conversion | Self::Submission | Self::FormSubmit => EventCategory::Conversion,
            Self::Close => EventCategory::Other,
        }
    }
}

/// Event types counted as impressions, as SQL string literals.
pub fn impression_types() -> Vec<&'static str> {
    types_in(EventCategory::Impression)
}

/// Event types counted as clicks.
pub fn click_types() -> Vec<&'static str> {
    types_in(EventCategory::Click)
}

/// Event types counted as conversions.
pub fn conversion_types() -> Vec<&'static str> {
    types_in(EventCategory::Conversion)
}

fn types_in(category: EventCategory) -> Vec<&'static str> {
    EventType::ALL
        .iter()
        .filter(|t| t.category() == category)
        .map(|t| t.as_str())
        .collect()
}

/// Device, page and location context captured with an event.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct EventContext {
    #[validate(length(max = 32))]
    pub device_type: Option<String>,
    #[validate(length(max = 64))]
    pub browser: Option<String>,
    #[validate(length(max = 64))]
    pub os: Option<String>,
    #[validate(length(max = 100))]
    pub country: Option<String>,
    #[validate(length(max = 2))]
    pub country_code: Option<String>,
    #[validate(length(max = 2048))]
    pub page_url: Option<String>,
    #[validate(length(max = 64))]
    pub page_type: Option<String>,
}

/// A single append-only analytics row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub id: Uuid,
    pub campaign_id: u64,
    pub campaign_type: CampaignKind,
    /// None is reported as control
    pub variant_id: Option<String>,
    pub event_type: EventType,
    pub event_value: Option<String>,
    pub session_id: String,
    pub device_type: String,
    pub browser: String,
    pub os: String,
    pub country: String,
    pub country_code: String,
    pub page_url: String,
    pub page_type: String,
    pub ip: String,
    pub event_timestamp: DateTime<Utc>,
}

impl AnalyticsEvent {
    /// Creates an event with a generated id and the current timestamp.
    pub fn new(
        kind: CampaignKind,
        campaign_id: u64,
        variant_id: Option<String>,
        event_type: EventType,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            campaign_id,
            campaign_type: kind,
            variant_id: variant_id.filter(|v| !v.is_empty()),
            event_type,
            event_value: None,
            session_id: session_id.into(),
            device_type: "unknown".into(),
            browser: "unknown".into(),
            os: "unknown".into(),
            country: String::new(),
            country_code: String::new(),
            page_url: String::new(),
            page_type: String::new(),
            ip: String::new(),
            event_timestamp: Utc::now(),
        }
    }

    /// Variant the event is reported under.
    pub fn reported_variant(&self) -> &str {
        self.variant_id.as_deref().unwrap_or(CONTROL_VARIANT)
    }

    /// Copies the supplied context onto the event.
    ///
    /// Page URLs that do not parse are dropped; the page type falls back
    /// to one derived from the URL path.
    pub fn with_context(mut self, ctx: EventContext) -> Self {
        if let Some(device_type) = ctx.device_type.filter(|s| !s.is_empty()) {
            self.device_type = device_type.to_lowercase();
        }
        if let Some(browser) = ctx.browser.filter(|s| !s.is_empty()) {
            self.browser = browser;
        }
        if let Some(os) = ctx.os.filter(|s| !s.is_empty()) {
            self.os = os;
        }
        if let Some(country) = ctx.country {
            self.country = country;
        }
        if let Some(code) = ctx.country_code {
            self.country_code = code.to_uppercase();
        }

        let parsed = ctx
            .page_url
            .as_deref()
            .filter(|u| u.len() <= MAX_PAGE_URL_LEN)
            .and_then(|u| url::Url::parse(u).ok());
        if let Some(page) = parsed {
            if self.page_type.is_empty() {
                self.page_type = page_type_for_path(page.path()).to_string();
            }
            self.page_url = page.to_string();
        }
        if let Some(page_type) = ctx.page_type.filter(|s| !s.is_empty()) {
            self.page_type = page_type;
        }
        self
    }
}

/// Coarse page classification from a URL path.
pub fn page_type_for_path(path: &str) -> &'static str {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return "home";
    }
    let first = trimmed.split('/').next().unwrap_or_default();
    match first {
        "product" | "products" | "shop" => "product",
        "cart" | "checkout" => "checkout",
        "category" | "tag" => "archive",
        "blog" => "post",
        _ => "page",
    }
}
