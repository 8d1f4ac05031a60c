//! Event tracking endpoints.
//!
//! The A/B and analytics families share one body shape; analytics
//! clients usually send the richer page and location context.

use axum::{body::Bytes, extract::State};
use hashbar_core::{
    AnalyticsEvent, CampaignKind, Error, EventContext, EventType, Result,
};
use hashbar_store::{track_event, TrackOutcome};
use serde::{Deserialize, Serialize};
use telemetry::metrics;
use tracing::{debug, warn};
use uuid::Uuid;
use validator::Validate;

use crate::extractors::{ClientIp, UserAgent};
use crate::response::{parse_body, ApiError, ApiResponse, ApiResult};
use crate::state::AppState;

/// Track request body.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TrackRequest {
    pub popup_id: Option<u64>,
    pub bar_id: Option<u64>,
    #[validate(length(max = 64))]
    pub variant_id: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub event_type: String,
    #[validate(length(max = 1000))]
    pub event_value: Option<String>,
    #[validate(length(max = 128))]
    pub session_id: Option<String>,
    #[serde(flatten)]
    #[validate(nested)]
    pub context: EventContext,
}

impl TrackRequest {
    /// Id field for the kind; zero counts as missing.
    pub fn campaign_id(&self, kind: CampaignKind) -> Result<u64> {
        let (field, id) = match kind {
            CampaignKind::Popup => ("popup_id", self.popup_id),
            CampaignKind::Announcement => ("bar_id", self.bar_id),
        };
        id.filter(|id| *id > 0).ok_or_else(|| Error::missing_field(field))
    }

    /// Builds the event row. A missing session id gets a fresh uuid.
    pub fn into_event(self, kind: CampaignKind) -> Result<AnalyticsEvent> {
        let campaign_id = self.campaign_id(kind)?;
        let event_type = EventType::parse(&self.event_type)?;
        let session_id = self
            .session_id
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut event =
            AnalyticsEvent::new(kind, campaign_id, self.variant_id, event_type, session_id)
                .with_context(self.context);
        event.event_value = self.event_value.filter(|v| !v.is_empty());
        Ok(event)
    }
}

/// Track response data.
#[derive(Debug, Serialize, Deserialize)]
pub struct TrackResponse {
    pub tracked: bool,
    /// The event was already recorded for this session
    pub duplicate: bool,
    pub session_id: String,
}

async fn track(
    state: AppState,
    kind: CampaignKind,
    client_ip: String,
    user_agent: String,
    body: Bytes,
) -> ApiResult<TrackResponse> {
    metrics().events_received.inc();

    let mut event = parse_body::<TrackRequest>(&body)
        .and_then(|req| req.into_event(kind).map_err(ApiError::from))
        .map_err(|e| {
            metrics().events_rejected.inc();
            debug!(kind = kind.as_str(), error = %e.response.message, "Rejected track request");
            e
        })?;

    event.ip = client_ip;
    state.device_detector.enrich(&mut event, &user_agent);

    let session_id = event.session_id.clone();
    let outcome = track_event(state.analytics.as_ref(), event)
        .await
        .map_err(|e| {
            warn!(kind = kind.as_str(), error = %e, "Failed to record event");
            e
        })?;

    Ok(ApiResponse::ok(TrackResponse {
        tracked: true,
        duplicate: outcome == TrackOutcome::Duplicate,
        session_id,
    }))
}

/// POST /popup-ab-test/track, /popup-analytics/track
pub async fn track_popup(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    UserAgent(ua): UserAgent,
    body: Bytes,
) -> ApiResult<TrackResponse> {
    track(state, CampaignKind::Popup, ip, ua, body).await
}

/// POST /ab-test/track, /announcement-analytics/track
pub async fn track_bar(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    UserAgent(ua): UserAgent,
    body: Bytes,
) -> ApiResult<TrackResponse> {
    track(state, CampaignKind::Announcement, ip, ua, body).await
}
