//! In-memory storage for development mode and tests.
//!
//! Mirrors the ClickHouse stores' semantics, including result ordering.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use hashbar_core::{
    AnalyticsEvent, Campaign, CampaignKind, CampaignStatus, EventCategory, EventType,
    NewCampaign, Result, VariantCounts,
};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

use crate::store::{AnalyticsStore, CampaignStore, DailyCounts, DeviceCounts};

#[derive(Default)]
struct Tally {
    impressions: u64,
    clicks: u64,
    conversions: u64,
}

impl Tally {
    fn add(&mut self, event_type: EventType) {
        match event_type.category() {
            EventCategory::Impression => self.impressions += 1,
            EventCategory::Click => self.clicks += 1,
            EventCategory::Conversion => self.conversions += 1,
            EventCategory::Other => {}
        }
    }
}

/// Analytics events held in a vector per process.
#[derive(Default)]
pub struct MemoryAnalyticsStore {
    events: RwLock<Vec<AnalyticsEvent>>,
}

impl MemoryAnalyticsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored events for a kind.
    pub fn len(&self, kind: CampaignKind) -> usize {
        self.events
            .read()
            .iter()
            .filter(|e| e.campaign_type == kind)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Snapshot of all stored events.
    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.events.read().clone()
    }

    fn campaign_events(&self, kind: CampaignKind, campaign_id: u64) -> Vec<AnalyticsEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.campaign_type == kind && e.campaign_id == campaign_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AnalyticsStore for MemoryAnalyticsStore {
    async fn event_exists(
        &self,
        kind: CampaignKind,
        campaign_id: u64,
        session_id: &str,
        event_type: EventType,
    ) -> Result<bool> {
        Ok(self.events.read().iter().any(|e| {
            e.campaign_type == kind
                && e.campaign_id == campaign_id
                && e.session_id == session_id
                && e.event_type == event_type
        }))
    }

    async fn insert_event(&self, event: AnalyticsEvent) -> Result<()> {
        self.events.write().push(event);
        Ok(())
    }

    async fn variant_counts(&self, kind: CampaignKind, campaign_id: u64) -> Result<Vec<VariantCounts>> {
        // Group in first-seen order, then stable sort by impressions
        let mut order: Vec<String> = Vec::new();
        let mut tallies: HashMap<String, (Tally, HashSet<String>)> = HashMap::new();

        for event in self.campaign_events(kind, campaign_id) {
            let variant = event.reported_variant().to_string();
            let entry = tallies.entry(variant.clone()).or_insert_with(|| {
                order.push(variant);
                Default::default()
            });
            entry.0.add(event.event_type);
            entry.1.insert(event.session_id);
        }

        let mut counts: Vec<VariantCounts> = order
            .into_iter()
            .filter_map(|variant| {
                tallies.remove(&variant).map(|(tally, sessions)| VariantCounts {
                    variant_id: variant,
                    impressions: tally.impressions,
                    clicks: tally.clicks,
                    conversions: tally.conversions,
                    visitors: sessions.len() as u64,
                })
            })
            .collect();
        counts.sort_by(|a, b| b.impressions.cmp(&a.impressions));
        Ok(counts)
    }

    async fn unique_visitors(&self, kind: CampaignKind, campaign_id: u64) -> Result<u64> {
        let sessions: HashSet<String> = self
            .campaign_events(kind, campaign_id)
            .into_iter()
            .map(|e| e.session_id)
            .collect();
        Ok(sessions.len() as u64)
    }

    async fn daily_counts(
        &self,
        kind: CampaignKind,
        campaign_id: u64,
        days: u32,
    ) -> Result<Vec<DailyCounts>> {
        let since = Utc::now() - Duration::days(days as i64);
        let mut by_day: BTreeMap<String, Tally> = BTreeMap::new();

        for event in self.campaign_events(kind, campaign_id) {
            if event.event_timestamp < since {
                continue;
            }
            let day = event.event_timestamp.date_naive().to_string();
            by_day.entry(day).or_default().add(event.event_type);
        }

        Ok(by_day
            .into_iter()
            .map(|(day, t)| DailyCounts {
                day,
                impressions: t.impressions,
                clicks: t.clicks,
                conversions: t.conversions,
            })
            .collect())
    }

    async fn device_counts(&self, kind: CampaignKind, campaign_id: u64) -> Result<Vec<DeviceCounts>> {
        let mut by_device: BTreeMap<String, Tally> = BTreeMap::new();
        for event in self.campaign_events(kind, campaign_id) {
            by_device
                .entry(event.device_type)
                .or_default()
                .add(event.event_type);
        }

        let mut devices: Vec<DeviceCounts> = by_device
            .into_iter()
            .map(|(device_type, t)| DeviceCounts {
                device_type,
                impressions: t.impressions,
                clicks: t.clicks,
                conversions: t.conversions,
            })
            .collect();
        devices.sort_by(|a, b| b.impressions.cmp(&a.impressions));
        Ok(devices)
    }
}

/// Campaigns held in a map per process.
pub struct MemoryCampaignStore {
    campaigns: RwLock<HashMap<u64, Campaign>>,
    next_id: AtomicU64,
}

impl MemoryCampaignStore {
    pub fn new() -> Self {
        info!("Campaign store initialized (in-memory, development mode)");
        Self {
            campaigns: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl Default for MemoryCampaignStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CampaignStore for MemoryCampaignStore {
    async fn list(&self, kind: CampaignKind, status: Option<CampaignStatus>) -> Result<Vec<Campaign>> {
        let mut campaigns: Vec<Campaign> = self
            .campaigns
            .read()
            .values()
            .filter(|c| c.kind == kind && status.map_or(true, |s| c.status == s))
            .cloned()
            .collect();
        campaigns.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(campaigns)
    }

    async fn get(&self, kind: CampaignKind, id: u64) -> Result<Option<Campaign>> {
        Ok(self
            .campaigns
            .read()
            .get(&id)
            .filter(|c| c.kind == kind)
            .cloned())
    }

    async fn create(&self, kind: CampaignKind, campaign: NewCampaign) -> Result<Campaign> {
        let now = Utc::now();
        let created = Campaign {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            kind,
            title: campaign.title,
            status: campaign.status,
            config: campaign.config,
            created_at: now,
            updated_at: now,
        };
        self.campaigns.write().insert(created.id, created.clone());
        Ok(created)
    }

    async fn save(&self, campaign: &Campaign) -> Result<()> {
        self.campaigns.write().insert(campaign.id, campaign.clone());
        Ok(())
    }

    async fn delete(&self, kind: CampaignKind, id: u64) -> Result<bool> {
        let mut campaigns = self.campaigns.write();
        match campaigns.get(&id) {
            Some(c) if c.kind == kind => {
                campaigns.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
