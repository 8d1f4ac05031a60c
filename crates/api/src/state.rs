//! Application state shared across handlers.

use crate::assignment::{AssignmentConfig, VariantAssigner};
use crate::middleware::rate_limit::{RateLimitConfig, RateLimiter, SharedRateLimiter};
use hashbar_core::{
    limits::MANAGE_OPTIONS, AuthRequest, AuthResponse, DeviceDetector, Error, ParsedApiKey,
};
use hashbar_store::{AnalyticsStore, CampaignStore};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use telemetry::health;
use tracing::{debug, warn};

/// Cache TTL for auth responses (30 seconds).
const AUTH_CACHE_TTL: Duration = Duration::from_secs(30);

/// Maximum cache entries.
const AUTH_CACHE_MAX_CAPACITY: u64 = 10_000;

/// Rate limiter buckets idle longer than this are dropped.
const RATE_LIMIT_BUCKET_MAX_AGE: Duration = Duration::from_secs(600);

/// Admin auth service client.
///
/// Calls the auth service's `/internal/auth/validate` endpoint and caches
/// responses for 30 seconds.
#[derive(Clone)]
pub struct AuthClient {
    /// Auth service URL (e.g., "http://auth-service:8080")
    base_url: String,
    http_client: reqwest::Client,
    /// API key -> AuthResponse
    cache: Cache<String, AuthResponse>,
    /// Grants every well-formed key `manage_options` (development only)
    mock_mode: bool,
}

impl AuthClient {
    /// Creates a new auth client. An empty URL or "mock" enables mock mode.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let mock_mode = base_url.is_empty() || base_url == "mock";

        if mock_mode {
            warn!("Auth client in mock mode: all well-formed API keys are admins");
            health().auth.set_healthy();
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build auth HTTP client, using defaults");
                reqwest::Client::new()
            });

        Self {
            base_url,
            http_client,
            cache: Cache::builder()
                .max_capacity(AUTH_CACHE_MAX_CAPACITY)
                .time_to_live(AUTH_CACHE_TTL)
                .build(),
            mock_mode,
        }
    }

    pub fn is_mock(&self) -> bool {
        self.mock_mode
    }

    /// Validate an API key with the auth service.
    ///
    /// Returns cached response if available, otherwise calls the auth service.
    pub async fn validate(&self, api_key: &ParsedApiKey) -> Result<AuthResponse, Error> {
        let cache_key = api_key.as_str().to_string();

        if let Some(cached) = self.cache.get(&cache_key).await {
            debug!("Auth cache hit");
            return Ok(cached);
        }

        let response = if self.mock_mode {
            mock_validate()
        } else {
            self.remote_validate(api_key).await?
        };

        self.cache.insert(cache_key, response.clone()).await;

        Ok(response)
    }

    /// Call the remote auth service.
    async fn remote_validate(&self, api_key: &ParsedApiKey) -> Result<AuthResponse, Error> {
        let url = format!("{}/internal/auth/validate", self.base_url);
        let request = AuthRequest::manage_options(api_key.as_str());

        debug!(url = %url, "Calling auth service");

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Auth service request failed");
                health().auth.set_unhealthy(e.to_string());
                Error::internal(format!("Auth service unavailable: {}", e))
            })?;

        health().auth.set_healthy();

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Auth service returned error");
            return Err(Error::internal(format!(
                "Auth service returned {}: {}",
                status, body
            )));
        }

        let auth_response: AuthResponse = response.json().await.map_err(|e| {
            warn!(error = %e, "Failed to parse auth response");
            Error::internal(format!("Invalid auth response: {}", e))
        })?;

        Ok(auth_response)
    }
}

fn mock_validate() -> AuthResponse {
    debug!("Using mock auth validation");
    AuthResponse {
        valid: true,
        user: Some("mock-admin".to_string()),
        capabilities: vec![MANAGE_OPTIONS.to_string()],
        error: None,
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Campaign configuration (ClickHouse in production, memory in dev/tests)
    pub campaigns: Arc<dyn CampaignStore>,
    /// Analytics event storage
    pub analytics: Arc<dyn AnalyticsStore>,
    pub assigner: Arc<VariantAssigner>,
    pub auth_client: AuthClient,
    pub rate_limiter: SharedRateLimiter,
    pub device_detector: Arc<DeviceDetector>,
}

impl AppState {
    pub fn new(
        campaigns: Arc<dyn CampaignStore>,
        analytics: Arc<dyn AnalyticsStore>,
        auth_url: impl Into<String>,
    ) -> Self {
        Self {
            campaigns,
            analytics,
            assigner: Arc::new(VariantAssigner::new(AssignmentConfig::default())),
            auth_client: AuthClient::new(auth_url),
            rate_limiter: Arc::new(RateLimiter::new(RateLimitConfig::default())),
            device_detector: Arc::new(DeviceDetector::new()),
        }
    }

    /// Replace the rate limit config.
    pub fn with_rate_limit(mut self, rate_config: RateLimitConfig) -> Self {
        self.rate_limiter = Arc::new(RateLimiter::new(rate_config));
        self
    }

    /// Replace the assignment cache config.
    pub fn with_assignment(mut self, config: AssignmentConfig) -> Self {
        self.assigner = Arc::new(VariantAssigner::new(config));
        self
    }

    /// Start the rate limiter cleanup background task.
    /// Returns a handle that can be used to cancel the task.
    pub fn start_rate_limiter_cleanup(&self) -> tokio::task::JoinHandle<()> {
        let rate_limiter = self.rate_limiter.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(300)); // 5 minutes
            loop {
                interval.tick().await;
                rate_limiter.cleanup(RATE_LIMIT_BUCKET_MAX_AGE);
            }
        })
    }
}
