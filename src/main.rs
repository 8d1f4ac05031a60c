//! Hashbar Engine
//!
//! A/B testing and analytics backend for announcement bars and popups:
//! - Sticky weighted variant assignment
//! - Deduplicated event tracking into ClickHouse
//! - Per-variant statistics and winner selection
//! - Campaign configuration management

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};

use api::{router, AppState, AssignmentConfig, RateLimitConfig};
use hashbar_store::{
    init_schema, AnalyticsStore, CampaignStore, ClickHouseAnalyticsStore,
    ClickHouseCampaignStore, ClickHouseClient, ClickHouseConfig, MemoryAnalyticsStore,
    MemoryCampaignStore, StorageBackend,
};
use telemetry::{health, init_tracing_from_env};

/// Interval between storage health probes.
const HEALTH_PROBE_INTERVAL: Duration = Duration::from_secs(30);

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    /// Auth service URL for admin API key validation ("mock" in development)
    #[serde(default = "default_auth_url")]
    auth_url: String,

    #[serde(default)]
    storage: StorageBackend,

    #[serde(default)]
    clickhouse: ClickHouseConfig,

    #[serde(default)]
    assignment: AssignmentConfig,

    #[serde(default)]
    rate_limit: RateLimitConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_auth_url() -> String {
    "http://auth-service:8080".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            auth_url: default_auth_url(),
            storage: StorageBackend::default(),
            clickhouse: ClickHouseConfig::default(),
            assignment: AssignmentConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Storage handles for the selected backend.
struct Stores {
    campaigns: Arc<dyn CampaignStore>,
    analytics: Arc<dyn AnalyticsStore>,
    clickhouse: Option<ClickHouseClient>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting Hashbar Engine v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    info!(
        storage = ?config.storage,
        clickhouse_url = %config.clickhouse.url,
        database = %config.clickhouse.database,
        "Loaded configuration"
    );

    let stores = open_stores(&config).await?;

    if let Some(client) = stores.clickhouse.clone() {
        check_storage(&client).await;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(HEALTH_PROBE_INTERVAL);
            loop {
                interval.tick().await;
                check_storage(&client).await;
            }
        });
    }

    let state = AppState::new(stores.campaigns, stores.analytics, &config.auth_url)
        .with_rate_limit(config.rate_limit.clone())
        .with_assignment(config.assignment.clone());

    let _rate_limiter_cleanup = state.start_rate_limiter_cleanup();
    info!("Started rate limiter cleanup task (every 5 minutes)");

    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    // Connect info feeds the client IP fallback
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}

/// Opens the configured storage backend.
async fn open_stores(config: &Config) -> Result<Stores> {
    match config.storage {
        StorageBackend::Memory => {
            warn!("Using in-memory storage; data is lost on restart");
            health().storage.set_healthy();
            Ok(Stores {
                campaigns: Arc::new(MemoryCampaignStore::new()),
                analytics: Arc::new(MemoryAnalyticsStore::new()),
                clickhouse: None,
            })
        }
        StorageBackend::ClickHouse => {
            let client = ClickHouseClient::new(config.clickhouse.clone())
                .context("Failed to create ClickHouse client")?;

            if let Err(e) = init_schema(&client).await {
                error!("Failed to initialize ClickHouse schema: {}", e);
                // Continue anyway - schema might already exist
            }

            Ok(Stores {
                campaigns: Arc::new(ClickHouseCampaignStore::new(client.clone())),
                analytics: Arc::new(ClickHouseAnalyticsStore::new(client.clone())),
                clickhouse: Some(client),
            })
        }
    }
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("HASHBAR")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // The config crate's nested parsing doesn't work reliably with underscored field names
    if let Ok(url) = std::env::var("HASHBAR_CLICKHOUSE_URL") {
        config.clickhouse.url = url;
    }
    if let Ok(database) = std::env::var("HASHBAR_CLICKHOUSE_DATABASE") {
        config.clickhouse.database = database;
    }
    if let Ok(username) = std::env::var("HASHBAR_CLICKHOUSE_USERNAME") {
        config.clickhouse.username = Some(username);
    }
    if let Ok(password) = std::env::var("HASHBAR_CLICKHOUSE_PASSWORD") {
        config.clickhouse.password = Some(password);
    }
    if let Ok(auth_url) = std::env::var("HASHBAR_AUTH_URL") {
        config.auth_url = auth_url;
    }
    if let Ok(ttl) = std::env::var("HASHBAR_ASSIGNMENT_TTL_DAYS") {
        config.assignment.ttl_days = ttl
            .parse()
            .context("HASHBAR_ASSIGNMENT_TTL_DAYS must be a number")?;
    }

    Ok(config)
}

/// Probe ClickHouse and update the storage health component.
async fn check_storage(client: &ClickHouseClient) {
    let healthy = hashbar_store::health::check_connection(client).await;
    let was_healthy = health().storage.is_healthy();

    if healthy {
        health().storage.set_healthy();
        if !was_healthy {
            info!("ClickHouse connection: healthy");
        }
    } else {
        health().storage.set_unhealthy("Connection failed");
        error!("ClickHouse connection: unhealthy");
    }
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
