//! Campaign and analytics storage for the hashbar engine.

pub mod analytics;
pub mod campaigns;
pub mod client;
pub mod config;
pub mod health;
pub mod memory;
pub mod schema;
pub mod store;
pub mod tracker;

pub use analytics::ClickHouseAnalyticsStore;
pub use campaigns::ClickHouseCampaignStore;
pub use client::ClickHouseClient;
pub use config::*;
pub use memory::{MemoryAnalyticsStore, MemoryCampaignStore};
pub use schema::init_schema;
pub use store::*;
pub use tracker::*;
