//! ClickHouse table schemas.
//!
//! - One append-only analytics table per campaign kind
//! - LowCardinality for enum-like fields
//! - DateTime64(3) for millisecond precision
//! - Campaigns in a ReplacingMergeTree keyed by version; deletes are tombstones

use crate::client::{map_error, ClickHouseClient};
use hashbar_core::Result;
use tracing::info;

/// Column layout shared by both analytics tables.
const ANALYTICS_COLUMNS: &str = r#"
    id String,
    campaign_id UInt64,
    campaign_type LowCardinality(String),
    variant_id Nullable(String),
    event_type LowCardinality(String),
    event_value Nullable(String),
    session_id String,

    -- Client information
    device_type LowCardinality(String),
    browser LowCardinality(String),
    os LowCardinality(String),

    -- Location
    country LowCardinality(String),
    country_code LowCardinality(String),

    -- Page information
    page_url String,
    page_type LowCardinality(String),

    ip String,
    event_timestamp DateTime64(3)
"#;

/// SQL for an analytics table.
pub fn create_analytics_table(table: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {table} ({ANALYTICS_COLUMNS})
ENGINE = MergeTree()
PARTITION BY toYYYYMM(event_timestamp)
ORDER BY (campaign_id, session_id, event_type, event_timestamp)
SETTINGS index_granularity = 8192
"#
    )
}

/// SQL for the popup analytics table.
pub fn create_popup_analytics_table() -> String {
    create_analytics_table("popup_analytics")
}

/// SQL for the announcement bar analytics table.
pub fn create_announcement_analytics_table() -> String {
    create_analytics_table("announcement_analytics")
}

/// SQL for the campaigns table.
///
/// Every write inserts a full row with a higher version; reads use FINAL.
pub const CREATE_CAMPAIGNS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS campaigns (
    campaign_id UInt64,
    campaign_type LowCardinality(String),
    title String,
    status LowCardinality(String),

    -- Versioned JSON document (ab_test + settings)
    config String,

    deleted UInt8,
    created_at DateTime64(3),
    updated_at DateTime64(3),
    version UInt64
)
ENGINE = ReplacingMergeTree(version)
ORDER BY (campaign_type, campaign_id)
SETTINGS index_granularity = 8192
"#;

/// All DDL statements in creation order.
pub fn all_tables() -> Vec<String> {
    vec![
        CREATE_CAMPAIGNS_TABLE.to_string(),
        create_popup_analytics_table(),
        create_announcement_analytics_table(),
    ]
}

/// Creates the database and all tables if they do not exist.
pub async fn init_schema(client: &ClickHouseClient) -> Result<()> {
    let database = &client.config().database;
    client
        .inner()
        .clone()
        .with_database("default")
        .query(&format!("CREATE DATABASE IF NOT EXISTS {}", database))
        .execute()
        .await
        .map_err(|e| map_error("schema", e))?;

    for ddl in all_tables() {
        client
            .inner()
            .query(&ddl)
            .execute()
            .await
            .map_err(|e| map_error("schema", e))?;
    }

    info!(database = %client.config().database, "ClickHouse schema initialized");
    Ok(())
}
