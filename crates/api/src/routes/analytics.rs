//! Analytics overview endpoints.

use axum::extract::{rejection::QueryRejection, Query, State};
use hashbar_core::{
    limits::{DEFAULT_OVERVIEW_DAYS, MAX_OVERVIEW_DAYS},
    CampaignKind,
};
use hashbar_store::{analytics_overview, AnalyticsOverview};
use serde::Deserialize;

use crate::extractors::{AdminContext, CampaignId};
use crate::response::{ApiError, ApiResponse, ApiResult};
use crate::routes::campaigns::load_campaign;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OverviewQuery {
    pub days: Option<u32>,
}

impl OverviewQuery {
    /// Requested window clamped to `1..=MAX_OVERVIEW_DAYS`.
    pub fn days(&self) -> u32 {
        self.days
            .unwrap_or(DEFAULT_OVERVIEW_DAYS)
            .clamp(1, MAX_OVERVIEW_DAYS)
    }
}

async fn overview(
    state: &AppState,
    kind: CampaignKind,
    id: u64,
    query: Result<Query<OverviewQuery>, QueryRejection>,
) -> ApiResult<AnalyticsOverview> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let campaign = load_campaign(state, kind, id).await?;

    let overview = analytics_overview(state.analytics.as_ref(), &campaign, query.days()).await?;
    Ok(ApiResponse::ok(overview))
}

/// GET /announcement-analytics/:bar_id?days=N
pub async fn bar_overview(
    State(state): State<AppState>,
    _admin: AdminContext,
    CampaignId(id): CampaignId,
    query: Result<Query<OverviewQuery>, QueryRejection>,
) -> ApiResult<AnalyticsOverview> {
    overview(&state, CampaignKind::Announcement, id, query).await
}

/// GET /popup-analytics/:popup_id?days=N
pub async fn popup_overview(
    State(state): State<AppState>,
    _admin: AdminContext,
    CampaignId(id): CampaignId,
    query: Result<Query<OverviewQuery>, QueryRejection>,
) -> ApiResult<AnalyticsOverview> {
    overview(&state, CampaignKind::Popup, id, query).await
}
