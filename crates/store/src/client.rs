//! ClickHouse client wrapper.

use crate::config::ClickHouseConfig;
use clickhouse::Client;
use hashbar_core::{Error, Result};
use tracing::info;

/// ClickHouse client bound to the configured database.
#[derive(Clone)]
pub struct ClickHouseClient {
    inner: Client,
    config: ClickHouseConfig,
}

impl ClickHouseClient {
    /// Creates a new ClickHouse client.
    pub fn new(config: ClickHouseConfig) -> Result<Self> {
        if config.url.is_empty() {
            return Err(Error::internal("ClickHouse URL is empty"));
        }

        let mut client = Client::default()
            .with_url(&config.url)
            .with_database(&config.database);

        if let Some(ref user) = config.username {
            client = client.with_user(user);
        }

        if let Some(ref pass) = config.password {
            client = client.with_password(pass);
        }

        info!(
            url = %config.url,
            database = %config.database,
            "Created ClickHouse client"
        );

        Ok(Self {
            inner: client,
            config,
        })
    }

    /// Returns the inner clickhouse client.
    pub fn inner(&self) -> &Client {
        &self.inner
    }

    pub fn config(&self) -> &ClickHouseConfig {
        &self.config
    }
}

/// Maps a ClickHouse error, recognising missing tables.
pub(crate) fn map_error(table: &str, err: clickhouse::error::Error) -> Error {
    let msg = err.to_string();
    if msg.contains("UNKNOWN_TABLE") || msg.contains("Code: 60.") {
        Error::table_missing(table)
    } else {
        Error::database(format!("{}: {}", table, msg))
    }
}
