//! A/B test endpoints: statistics, winner and visitor assignment.

use axum::{body::Bytes, extract::State};
use hashbar_core::{CampaignKind, CampaignStats, Error, Result, Winner};
use hashbar_store::campaign_stats;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::extractors::{AdminContext, CampaignId};
use crate::response::{parse_body, ApiResponse, ApiResult};
use crate::routes::campaigns::load_campaign;
use crate::state::AppState;

/// Assign request body.
#[derive(Debug, Deserialize, Validate)]
pub struct AssignRequest {
    pub popup_id: Option<u64>,
    pub bar_id: Option<u64>,
    #[validate(length(max = 128))]
    pub visitor_id: Option<String>,
}

impl AssignRequest {
    fn target(&self, kind: CampaignKind) -> Result<(u64, &str)> {
        let (field, id) = match kind {
            CampaignKind::Popup => ("popup_id", self.popup_id),
            CampaignKind::Announcement => ("bar_id", self.bar_id),
        };
        let id = id
            .filter(|id| *id > 0)
            .ok_or_else(|| Error::missing_field(field))?;
        let visitor = self
            .visitor_id
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::missing_field("visitor_id"))?;
        Ok((id, visitor))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssignResponse {
    pub variant_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WinnerResponse {
    pub winner: Option<Winner>,
}

async fn stats(state: &AppState, kind: CampaignKind, id: u64) -> ApiResult<CampaignStats> {
    let campaign = load_campaign(state, kind, id).await?;
    let stats = campaign_stats(state.analytics.as_ref(), &campaign).await?;
    Ok(ApiResponse::ok(stats))
}

async fn winner(state: &AppState, kind: CampaignKind, id: u64) -> ApiResult<WinnerResponse> {
    let campaign = load_campaign(state, kind, id).await?;
    let stats = campaign_stats(state.analytics.as_ref(), &campaign).await?;
    Ok(ApiResponse::ok(WinnerResponse {
        winner: stats.winner,
    }))
}

async fn assign(state: &AppState, kind: CampaignKind, body: &Bytes) -> ApiResult<AssignResponse> {
    let req: AssignRequest = parse_body(body)?;
    let (id, visitor) = req.target(kind)?;

    let campaign = load_campaign(state, kind, id).await?;
    let variant_id = state.assigner.assign(&campaign, visitor).await;

    Ok(ApiResponse::ok(AssignResponse { variant_id }))
}

/// GET /popup-ab-test/stats/:popup_id
pub async fn popup_stats(
    State(state): State<AppState>,
    _admin: AdminContext,
    CampaignId(id): CampaignId,
) -> ApiResult<CampaignStats> {
    stats(&state, CampaignKind::Popup, id).await
}

/// GET /ab-test/stats/:bar_id
pub async fn bar_stats(
    State(state): State<AppState>,
    _admin: AdminContext,
    CampaignId(id): CampaignId,
) -> ApiResult<CampaignStats> {
    stats(&state, CampaignKind::Announcement, id).await
}

/// GET /popup-ab-test/winner/:popup_id
pub async fn popup_winner(
    State(state): State<AppState>,
    _admin: AdminContext,
    CampaignId(id): CampaignId,
) -> ApiResult<WinnerResponse> {
    winner(&state, CampaignKind::Popup, id).await
}

/// GET /ab-test/winner/:bar_id
pub async fn bar_winner(
    State(state): State<AppState>,
    _admin: AdminContext,
    CampaignId(id): CampaignId,
) -> ApiResult<WinnerResponse> {
    winner(&state, CampaignKind::Announcement, id).await
}

/// POST /popup-ab-test/assign
pub async fn popup_assign(State(state): State<AppState>, body: Bytes) -> ApiResult<AssignResponse> {
    assign(&state, CampaignKind::Popup, &body).await
}

/// POST /ab-test/assign
pub async fn bar_assign(State(state): State<AppState>, body: Bytes) -> ApiResult<AssignResponse> {
    assign(&state, CampaignKind::Announcement, &body).await
}
