//! Event tracking and statistics on top of an `AnalyticsStore`.

use hashbar_core::{
    build_stats, AnalyticsEvent, Campaign, CampaignStats, Result,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use telemetry::metrics;
use tracing::{debug, warn};

use crate::store::{AnalyticsStore, DailyCounts, DeviceCounts};

/// Outcome of a track call. Both count as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    Recorded,
    /// An event with the same campaign, session and type already exists
    Duplicate,
}

/// Records an event unless one exists for `(campaign, session, event_type)`.
///
/// Check and insert are separate statements; concurrent duplicates can
/// both pass the check.
pub async fn track_event(store: &dyn AnalyticsStore, event: AnalyticsEvent) -> Result<TrackOutcome> {
    let exists = store
        .event_exists(
            event.campaign_type,
            event.campaign_id,
            &event.session_id,
            event.event_type,
        )
        .await?;

    if exists {
        debug!(
            campaign_id = event.campaign_id,
            session_id = %event.session_id,
            event_type = event.event_type.as_str(),
            "Duplicate event suppressed"
        );
        metrics().events_deduplicated.inc();
        return Ok(TrackOutcome::Duplicate);
    }

    let start = Instant::now();
    store.insert_event(event).await?;
    metrics().store_latency_ms.observe(start.elapsed().as_millis() as u64);
    metrics().events_recorded.inc();

    Ok(TrackOutcome::Recorded)
}

/// Aggregates A/B statistics for a campaign.
///
/// A missing analytics table yields zeroed statistics.
pub async fn campaign_stats(store: &dyn AnalyticsStore, campaign: &Campaign) -> Result<CampaignStats> {
    let start = Instant::now();
    metrics().stats_queries.inc();

    let counts = match store.variant_counts(campaign.kind, campaign.id).await {
        Ok(counts) => counts,
        Err(e) if e.is_table_missing() => {
            warn!(
                campaign_id = campaign.id,
                table = campaign.kind.analytics_table(),
                "Analytics table missing, returning empty stats"
            );
            return Ok(CampaignStats::empty());
        }
        Err(e) => return Err(e),
    };
    let visitors = store.unique_visitors(campaign.kind, campaign.id).await?;

    metrics().store_latency_ms.observe(start.elapsed().as_millis() as u64);
    Ok(build_stats(campaign, counts, visitors))
}

/// Statistics plus time series and device breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsOverview {
    pub campaign_id: u64,
    pub days: u32,
    pub stats: CampaignStats,
    pub daily: Vec<DailyCounts>,
    pub devices: Vec<DeviceCounts>,
}

/// Builds the analytics overview for the last `days` days.
pub async fn analytics_overview(
    store: &dyn AnalyticsStore,
    campaign: &Campaign,
    days: u32,
) -> Result<AnalyticsOverview> {
    let stats = campaign_stats(store, campaign).await?;

    let (daily, devices) = if stats.variants.is_empty() {
        (Vec::new(), Vec::new())
    } else {
        (
            store.daily_counts(campaign.kind, campaign.id, days).await?,
            store.device_counts(campaign.kind, campaign.id).await?,
        )
    };

    Ok(AnalyticsOverview {
        campaign_id: campaign.id,
        days,
        stats,
        daily,
        devices,
    })
}
