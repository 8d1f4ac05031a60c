//! ClickHouse-backed campaign storage.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use clickhouse::Row;
use hashbar_core::{
    Campaign, CampaignConfig, CampaignKind, CampaignStatus, Error, NewCampaign, Result,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::info;

use crate::client::{map_error, ClickHouseClient};
use crate::store::CampaignStore;

const TABLE: &str = "campaigns";

/// Campaign row; every write is a new version of the row.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct CampaignRow {
    pub campaign_id: u64,
    pub campaign_type: String,
    pub title: String,
    pub status: String,
    pub config: String,
    pub deleted: u8,
    pub created_at: i64,
    pub updated_at: i64,
    pub version: u64,
}

impl CampaignRow {
    fn from_campaign(campaign: &Campaign, version: u64, deleted: bool) -> Result<Self> {
        Ok(Self {
            campaign_id: campaign.id,
            campaign_type: campaign.kind.as_str().to_string(),
            title: campaign.title.clone(),
            status: campaign.status.as_str().to_string(),
            config: campaign.config.encode()?,
            deleted: deleted as u8,
            created_at: campaign.created_at.timestamp_millis(),
            updated_at: campaign.updated_at.timestamp_millis(),
            version,
        })
    }

    fn into_campaign(self) -> Result<Campaign> {
        let kind = CampaignKind::parse(&self.campaign_type).ok_or_else(|| {
            Error::internal(format!("unknown campaign_type {}", self.campaign_type))
        })?;
        let status = CampaignStatus::parse(&self.status)
            .ok_or_else(|| Error::internal(format!("unknown status {}", self.status)))?;

        Ok(Campaign {
            id: self.campaign_id,
            kind,
            title: self.title,
            status,
            config: CampaignConfig::decode(&self.config)?,
            created_at: from_millis(self.created_at),
            updated_at: from_millis(self.updated_at),
        })
    }
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}

/// Campaign storage in a ReplacingMergeTree table.
pub struct ClickHouseCampaignStore {
    client: ClickHouseClient,
    /// Serializes id allocation within this process
    create_lock: Mutex<()>,
    last_version: AtomicU64,
}

impl ClickHouseCampaignStore {
    pub fn new(client: ClickHouseClient) -> Self {
        Self {
            client,
            create_lock: Mutex::new(()),
            last_version: AtomicU64::new(0),
        }
    }

    /// Monotonic row version, based on the wall clock.
    fn next_version(&self) -> u64 {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        let mut last = self.last_version.load(Ordering::Relaxed);
        loop {
            let next = now.max(last + 1);
            match self.last_version.compare_exchange_weak(
                last,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(actual) => last = actual,
            }
        }
    }

    async fn write_row(&self, row: CampaignRow) -> Result<()> {
        let mut insert = self
            .client
            .inner()
            .insert(TABLE)
            .map_err(|e| map_error(TABLE, e))?;
        insert.write(&row).await.map_err(|e| map_error(TABLE, e))?;
        insert.end().await.map_err(|e| map_error(TABLE, e))
    }
}

#[async_trait]
impl CampaignStore for ClickHouseCampaignStore {
    async fn list(&self, kind: CampaignKind, status: Option<CampaignStatus>) -> Result<Vec<Campaign>> {
        let mut sql = String::from(
            "SELECT ?fields FROM campaigns FINAL WHERE campaign_type = ? AND deleted = 0",
        );
        if status.is_some() {
            sql.push_str(" AND status = ?");
        }
        sql.push_str(" ORDER BY campaign_id DESC");

        let mut query = self.client.inner().query(&sql).bind(kind.as_str());
        if let Some(status) = status {
            query = query.bind(status.as_str());
        }

        let rows: Vec<CampaignRow> = query.fetch_all().await.map_err(|e| map_error(TABLE, e))?;
        rows.into_iter().map(CampaignRow::into_campaign).collect()
    }

    async fn get(&self, kind: CampaignKind, id: u64) -> Result<Option<Campaign>> {
        let row: Option<CampaignRow> = self
            .client
            .inner()
            .query(
                "SELECT ?fields FROM campaigns FINAL \
                 WHERE campaign_type = ? AND campaign_id = ? AND deleted = 0",
            )
            .bind(kind.as_str())
            .bind(id)
            .fetch_optional()
            .await
            .map_err(|e| map_error(TABLE, e))?;

        row.map(CampaignRow::into_campaign).transpose()
    }

    async fn create(&self, kind: CampaignKind, campaign: NewCampaign) -> Result<Campaign> {
        let _guard = self.create_lock.lock().await;

        // Ids are unique across kinds
        let max_id: u64 = self
            .client
            .inner()
            .query("SELECT max(campaign_id) FROM campaigns")
            .fetch_one()
            .await
            .map_err(|e| map_error(TABLE, e))?;

        let now = Utc::now();
        let created = Campaign {
            id: max_id + 1,
            kind,
            title: campaign.title,
            status: campaign.status,
            config: campaign.config,
            created_at: now,
            updated_at: now,
        };

        self.write_row(CampaignRow::from_campaign(&created, self.next_version(), false)?)
            .await?;

        info!(campaign_id = created.id, kind = kind.as_str(), "Created campaign");
        Ok(created)
    }

    async fn save(&self, campaign: &Campaign) -> Result<()> {
        self.write_row(CampaignRow::from_campaign(campaign, self.next_version(), false)?)
            .await
    }

    async fn delete(&self, kind: CampaignKind, id: u64) -> Result<bool> {
        let Some(campaign) = self.get(kind, id).await? else {
            return Ok(false);
        };

        self.write_row(CampaignRow::from_campaign(&campaign, self.next_version(), true)?)
            .await?;

        info!(campaign_id = id, kind = kind.as_str(), "Deleted campaign");
        Ok(true)
    }
}
