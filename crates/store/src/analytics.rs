//! ClickHouse-backed analytics event storage.

use async_trait::async_trait;
use clickhouse::Row;
use hashbar_core::{
    click_types, conversion_types, impression_types, AnalyticsEvent, CampaignKind, EventType,
    Result, VariantCounts,
};
use serde::{Deserialize, Serialize};
use telemetry::metrics;
use tracing::debug;

use crate::client::{map_error, ClickHouseClient};
use crate::store::{AnalyticsStore, DailyCounts, DeviceCounts};

/// Flattened event row for ClickHouse insertion.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct AnalyticsRow {
    pub id: String,
    pub campaign_id: u64,
    pub campaign_type: String,
    pub variant_id: Option<String>,
    pub event_type: String,
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
    /// Milliseconds since epoch (DateTime64(3))
    pub event_timestamp: i64,
}

impl From<AnalyticsEvent> for AnalyticsRow {
    fn from(event: AnalyticsEvent) -> Self {
        Self {
            id: event.id.to_string(),
            campaign_id: event.campaign_id,
            campaign_type: event.campaign_type.as_str().to_string(),
            variant_id: event.variant_id,
            event_type: event.event_type.as_str().to_string(),
            event_value: event.event_value,
            session_id: event.session_id,
            device_type: event.device_type,
            browser: event.browser,
            os: event.os,
            country: event.country,
            country_code: event.country_code,
            page_url: event.page_url,
            page_type: event.page_type,
            ip: event.ip,
            event_timestamp: event.event_timestamp.timestamp_millis(),
        }
    }
}

#[derive(Debug, Row, Deserialize)]
struct VariantCountsRow {
    variant_id: String,
    impressions: u64,
    clicks: u64,
    conversions: u64,
    visitors: u64,
}

#[derive(Debug, Row, Deserialize)]
struct DailyCountsRow {
    day: String,
    impressions: u64,
    clicks: u64,
    conversions: u64,
}

#[derive(Debug, Row, Deserialize)]
struct DeviceCountsRow {
    device_type: String,
    impressions: u64,
    clicks: u64,
    conversions: u64,
}

/// Renders an event-type list as a SQL tuple body.
fn sql_list(types: &[&str]) -> String {
    types
        .iter()
        .map(|t| format!("'{}'", t))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `countIf` projections for impressions, clicks and conversions.
fn category_counts() -> String {
    format!(
        "countIf(event_type IN ({})) AS impressions, \
         countIf(event_type IN ({})) AS clicks, \
         countIf(event_type IN ({})) AS conversions",
        sql_list(&impression_types()),
        sql_list(&click_types()),
        sql_list(&conversion_types()),
    )
}

/// Analytics storage in the per-kind ClickHouse tables.
#[derive(Clone)]
pub struct ClickHouseAnalyticsStore {
    client: ClickHouseClient,
}

impl ClickHouseAnalyticsStore {
    pub fn new(client: ClickHouseClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AnalyticsStore for ClickHouseAnalyticsStore {
    async fn event_exists(
        &self,
        kind: CampaignKind,
        campaign_id: u64,
        session_id: &str,
        event_type: EventType,
    ) -> Result<bool> {
        let table = kind.analytics_table();
        let sql = format!(
            "SELECT count() FROM {} WHERE campaign_id = ? AND session_id = ? AND event_type = ?",
            table
        );

        let count: u64 = self
            .client
            .inner()
            .query(&sql)
            .bind(campaign_id)
            .bind(session_id)
            .bind(event_type.as_str())
            .fetch_one()
            .await
            .map_err(|e| map_error(table, e))?;

        Ok(count > 0)
    }

    async fn insert_event(&self, event: AnalyticsEvent) -> Result<()> {
        let table = event.campaign_type.analytics_table();
        let row = AnalyticsRow::from(event);

        let mut insert = self.client.inner().insert(table).map_err(|e| {
            metrics().store_errors.inc();
            map_error(table, e)
        })?;

        insert.write(&row).await.map_err(|e| {
            metrics().store_errors.inc();
            map_error(table, e)
        })?;

        insert.end().await.map_err(|e| {
            metrics().store_errors.inc();
            map_error(table, e)
        })?;

        debug!(
            table = table,
            campaign_id = row.campaign_id,
            event_type = %row.event_type,
            "Inserted analytics event"
        );
        Ok(())
    }

    async fn variant_counts(&self, kind: CampaignKind, campaign_id: u64) -> Result<Vec<VariantCounts>> {
        let table = kind.analytics_table();
        let sql = format!(
            "SELECT ifNull(variant_id, 'control') AS variant, {}, uniqExact(session_id) AS visitors \
             FROM {} WHERE campaign_id = ? \
             GROUP BY variant \
             ORDER BY impressions DESC",
            category_counts(),
            table
        );

        let rows: Vec<VariantCountsRow> = self
            .client
            .inner()
            .query(&sql)
            .bind(campaign_id)
            .fetch_all()
            .await
            .map_err(|e| map_error(table, e))?;

        Ok(rows
            .into_iter()
            .map(|r| VariantCounts {
                variant_id: r.variant_id,
                impressions: r.impressions,
                clicks: r.clicks,
                conversions: r.conversions,
                visitors: r.visitors,
            })
            .collect())
    }

    async fn unique_visitors(&self, kind: CampaignKind, campaign_id: u64) -> Result<u64> {
        let table = kind.analytics_table();
        let sql = format!(
            "SELECT uniqExact(session_id) FROM {} WHERE campaign_id = ?",
            table
        );

        self.client
            .inner()
            .query(&sql)
            .bind(campaign_id)
            .fetch_one()
            .await
            .map_err(|e| map_error(table, e))
    }

    async fn daily_counts(
        &self,
        kind: CampaignKind,
        campaign_id: u64,
        days: u32,
    ) -> Result<Vec<DailyCounts>> {
        let table = kind.analytics_table();
        let sql = daily_counts_sql(table);

        let rows: Vec<DailyCountsRow> = self
            .client
            .inner()
            .query(&sql)
            .bind(campaign_id)
            .bind(days)
            .fetch_all()
            .await
            .map_err(|e| map_error(table, e))?;

        Ok(rows
            .into_iter()
            .map(|r| DailyCounts {
                day: r.day,
                impressions: r.impressions,
                clicks: r.clicks,
                conversions: r.conversions,
            })
            .collect())
    }

    async fn device_counts(&self, kind: CampaignKind, campaign_id: u64) -> Result<Vec<DeviceCounts>> {
        let table = kind.analytics_table();
        let sql = format!(
            "SELECT device_type, {} \
             FROM {} WHERE campaign_id = ? \
             GROUP BY device_type \
             ORDER BY impressions DESC",
            category_counts(),
            table
        );

        let rows: Vec<DeviceCountsRow> = self
            .client
            .inner()
            .query(&sql)
            .bind(campaign_id)
            .fetch_all()
            .await
            .map_err(|e| map_error(table, e))?;

        Ok(rows
            .into_iter()
            .map(|r| DeviceCounts {
                device_type: r.device_type,
                impressions: r.impressions,
                clicks: r.clicks,
                conversions: r.conversions,
            })
            .collect())
    }
}

/// Daily series query. Days are UTC dates regardless of server timezone.
fn daily_counts_sql(table: &str) -> String {
    format!(
        "SELECT toString(toDate(event_timestamp, 'UTC')) AS day, {} \
         FROM {} WHERE campaign_id = ? AND event_timestamp >= now() - toIntervalDay(?) \
         GROUP BY day \
         ORDER BY day",
        category_counts(),
        table
    )
}
