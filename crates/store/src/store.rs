//! Storage traits for campaigns and analytics events.

use async_trait::async_trait;
use hashbar_core::{
    AnalyticsEvent, Campaign, CampaignKind, CampaignStatus, EventType, NewCampaign, Result,
    VariantCounts,
};
use serde::{Deserialize, Serialize};

/// Impressions, clicks and conversions for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCounts {
    /// ISO date, e.g. "2026-10-18"
    pub day: String,
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
}

/// Impressions, clicks and conversions for one device type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCounts {
    pub device_type: String,
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
}

/// Append-only analytics event storage.
///
/// Implementations return `Error::TableMissing` when the kind's table
/// does not exist.
#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    /// Whether an event exists for `(campaign, session, event_type)`.
    async fn event_exists(
        &self,
        kind: CampaignKind,
        campaign_id: u64,
        session_id: &str,
        event_type: EventType,
    ) -> Result<bool>;

    /// Appends one event.
    async fn insert_event(&self, event: AnalyticsEvent) -> Result<()>;

    /// Per-variant counts, null variant as "control", by impressions descending.
    async fn variant_counts(&self, kind: CampaignKind, campaign_id: u64) -> Result<Vec<VariantCounts>>;

    /// Distinct sessions across all variants.
    async fn unique_visitors(&self, kind: CampaignKind, campaign_id: u64) -> Result<u64>;

    /// Daily counts over the last `days` days, oldest first.
    async fn daily_counts(
        &self,
        kind: CampaignKind,
        campaign_id: u64,
        days: u32,
    ) -> Result<Vec<DailyCounts>>;

    /// Counts per device type, by impressions descending.
    async fn device_counts(&self, kind: CampaignKind, campaign_id: u64) -> Result<Vec<DeviceCounts>>;
}

/// Campaign configuration storage.
#[async_trait]
pub trait CampaignStore: Send + Sync {
    /// Campaigns of a kind, newest first.
    async fn list(&self, kind: CampaignKind, status: Option<CampaignStatus>) -> Result<Vec<Campaign>>;

    /// A campaign of the given kind. Ids of another kind resolve to None.
    async fn get(&self, kind: CampaignKind, id: u64) -> Result<Option<Campaign>>;

    /// Stores a new campaign under a freshly allocated id.
    async fn create(&self, kind: CampaignKind, campaign: NewCampaign) -> Result<Campaign>;

    /// Overwrites an existing campaign.
    async fn save(&self, campaign: &Campaign) -> Result<()>;

    /// Deletes a campaign. Returns false if it did not exist.
    async fn delete(&self, kind: CampaignKind, id: u64) -> Result<bool>;
}
