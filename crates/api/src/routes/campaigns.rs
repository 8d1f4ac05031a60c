//! Campaign management endpoints for announcement bars and popups.

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
};
use hashbar_core::{Campaign, CampaignKind, CampaignStatus, CampaignUpdate, Error, NewCampaign};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::extractors::{AdminContext, CampaignId};
use crate::response::{parse_body, ApiError, ApiResponse, ApiResult};
use crate::state::AppState;

/// Loads a campaign of the given kind or fails with 404.
pub(crate) async fn load_campaign(
    state: &AppState,
    kind: CampaignKind,
    id: u64,
) -> Result<Campaign, ApiError> {
    state
        .campaigns
        .get(kind, id)
        .await?
        .ok_or_else(|| kind.not_found(id).into())
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub deleted: bool,
    pub id: u64,
}

async fn list(
    state: &AppState,
    kind: CampaignKind,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Vec<Campaign>> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let status = match query.status.as_deref() {
        None | Some("") | Some("any") => None,
        Some(s) => Some(
            CampaignStatus::parse(s)
                .ok_or_else(|| Error::validation(format!("unknown status {}", s)))?,
        ),
    };

    let campaigns = state.campaigns.list(kind, status).await?;
    Ok(ApiResponse::ok(campaigns))
}

async fn create(
    state: &AppState,
    admin: &AdminContext,
    kind: CampaignKind,
    body: &Bytes,
) -> ApiResult<Campaign> {
    let new_campaign: NewCampaign = parse_body(body)?;
    new_campaign.check()?;

    let campaign = state.campaigns.create(kind, new_campaign).await?;
    info!(
        user = %admin.user,
        kind = kind.as_str(),
        campaign_id = campaign.id,
        "Campaign created"
    );
    Ok(ApiResponse::ok(campaign))
}

async fn update(
    state: &AppState,
    admin: &AdminContext,
    kind: CampaignKind,
    id: u64,
    body: &Bytes,
) -> ApiResult<Campaign> {
    let changes: CampaignUpdate = parse_body(body)?;
    let mut campaign = load_campaign(state, kind, id).await?;

    changes.apply(&mut campaign)?;
    state.campaigns.save(&campaign).await?;

    info!(user = %admin.user, kind = kind.as_str(), campaign_id = id, "Campaign updated");
    Ok(ApiResponse::ok(campaign))
}

async fn delete(
    state: &AppState,
    admin: &AdminContext,
    kind: CampaignKind,
    id: u64,
) -> ApiResult<DeleteResponse> {
    if !state.campaigns.delete(kind, id).await? {
        return Err(kind.not_found(id).into());
    }

    info!(user = %admin.user, kind = kind.as_str(), campaign_id = id, "Campaign deleted");
    Ok(ApiResponse::ok(DeleteResponse { deleted: true, id }))
}

/// GET /bars
pub async fn list_bars(
    State(state): State<AppState>,
    _admin: AdminContext,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Vec<Campaign>> {
    list(&state, CampaignKind::Announcement, query).await
}

/// GET /popups
pub async fn list_popups(
    State(state): State<AppState>,
    _admin: AdminContext,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Vec<Campaign>> {
    list(&state, CampaignKind::Popup, query).await
}

/// GET /bars/:id
pub async fn get_bar(
    State(state): State<AppState>,
    _admin: AdminContext,
    CampaignId(id): CampaignId,
) -> ApiResult<Campaign> {
    let campaign = load_campaign(&state, CampaignKind::Announcement, id).await?;
    Ok(ApiResponse::ok(campaign))
}

/// GET /popups/:id
pub async fn get_popup(
    State(state): State<AppState>,
    _admin: AdminContext,
    CampaignId(id): CampaignId,
) -> ApiResult<Campaign> {
    let campaign = load_campaign(&state, CampaignKind::Popup, id).await?;
    Ok(ApiResponse::ok(campaign))
}

/// POST /bars
pub async fn create_bar(
    State(state): State<AppState>,
    admin: AdminContext,
    body: Bytes,
) -> ApiResult<Campaign> {
    create(&state, &admin, CampaignKind::Announcement, &body).await
}

/// POST /popups
pub async fn create_popup(
    State(state): State<AppState>,
    admin: AdminContext,
    body: Bytes,
) -> ApiResult<Campaign> {
    create(&state, &admin, CampaignKind::Popup, &body).await
}

/// PUT /bars/:id
pub async fn update_bar(
    State(state): State<AppState>,
    admin: AdminContext,
    CampaignId(id): CampaignId,
    body: Bytes,
) -> ApiResult<Campaign> {
    update(&state, &admin, CampaignKind::Announcement, id, &body).await
}

/// PUT /popups/:id
pub async fn update_popup(
    State(state): State<AppState>,
    admin: AdminContext,
    CampaignId(id): CampaignId,
    body: Bytes,
) -> ApiResult<Campaign> {
    update(&state, &admin, CampaignKind::Popup, id, &body).await
}

/// DELETE /bars/:id
pub async fn delete_bar(
    State(state): State<AppState>,
    admin: AdminContext,
    CampaignId(id): CampaignId,
) -> ApiResult<DeleteResponse> {
    delete(&state, &admin, CampaignKind::Announcement, id).await
}

/// DELETE /popups/:id
pub async fn delete_popup(
    State(state): State<AppState>,
    admin: AdminContext,
    CampaignId(id): CampaignId,
) -> ApiResult<DeleteResponse> {
    delete(&state, &admin, CampaignKind::Popup, id).await
}
