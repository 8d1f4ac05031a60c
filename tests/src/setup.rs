//! Common test setup functions.

use api::{router, AppState, RateLimitConfig};
use axum::http::{HeaderName, HeaderValue};
use axum_test::{TestRequest, TestResponse, TestServer};
use hashbar_core::AnalyticsEvent;
use hashbar_store::{
    AnalyticsStore, CampaignStore, MemoryAnalyticsStore, MemoryCampaignStore,
};
use serde_json::Value;
use std::sync::Arc;
use telemetry::health;

use crate::fixtures::ADMIN_KEY;
use crate::mocks::MockAuthService;

/// API namespace prefix.
pub const PREFIX: &str = "/hashbar/v1";

/// Test context running the real router against in-memory stores.
///
/// Uses the same handlers, extractors and middleware as production;
/// only the storage backend and (optionally) the auth service differ.
pub struct TestContext {
    pub server: TestServer,
    pub campaigns: Arc<dyn CampaignStore>,
    pub analytics: Arc<dyn AnalyticsStore>,
    _auth: Option<MockAuthService>,
}

impl TestContext {
    /// Memory stores with the auth client in mock mode.
    pub async fn new() -> Self {
        Self::build(Arc::new(MemoryAnalyticsStore::new()), "mock", None)
    }

    /// Memory stores behind a local mock auth service.
    pub async fn with_auth_service() -> Self {
        let auth = MockAuthService::start().await;
        let url = auth.url.clone();
        Self::build(Arc::new(MemoryAnalyticsStore::new()), &url, Some(auth))
    }

    /// Custom analytics store with the auth client in mock mode.
    pub async fn with_analytics(analytics: Arc<dyn AnalyticsStore>) -> Self {
        Self::build(analytics, "mock", None)
    }

    /// Router over the given stores.
    pub fn with_stores(
        campaigns: Arc<dyn CampaignStore>,
        analytics: Arc<dyn AnalyticsStore>,
    ) -> Self {
        Self::build_with(campaigns, analytics, "mock", None)
    }

    fn build(analytics: Arc<dyn AnalyticsStore>, auth_url: &str, auth: Option<MockAuthService>) -> Self {
        Self::build_with(Arc::new(MemoryCampaignStore::new()), analytics, auth_url, auth)
    }

    fn build_with(
        campaigns: Arc<dyn CampaignStore>,
        analytics: Arc<dyn AnalyticsStore>,
        auth_url: &str,
        auth: Option<MockAuthService>,
    ) -> Self {
        health().storage.set_healthy();

        // Loose limits; rate limiting has its own tests
        let state = AppState::new(campaigns.clone(), analytics.clone(), auth_url).with_rate_limit(
            RateLimitConfig {
                rate: 100_000,
                burst: 100_000,
                ..Default::default()
            },
        );
        let server = TestServer::new(router(state)).expect("Failed to create test server");

        Self {
            server,
            campaigns,
            analytics,
            _auth: auth,
        }
    }

    /// Request with the admin key attached.
    pub fn admin(&self, request: TestRequest) -> TestRequest {
        with_key(request, ADMIN_KEY)
    }

    pub async fn admin_get(&self, path: &str) -> TestResponse {
        self.admin(self.server.get(&format!("{}{}", PREFIX, path))).await
    }

    pub async fn admin_post(&self, path: &str, body: &Value) -> TestResponse {
        self.admin(self.server.post(&format!("{}{}", PREFIX, path)))
            .json(body)
            .await
    }

    pub async fn admin_put(&self, path: &str, body: &Value) -> TestResponse {
        self.admin(self.server.put(&format!("{}{}", PREFIX, path)))
            .json(body)
            .await
    }

    pub async fn admin_delete(&self, path: &str) -> TestResponse {
        self.admin(self.server.delete(&format!("{}{}", PREFIX, path))).await
    }

    /// Unauthenticated POST, as sent from a visitor's browser.
    pub async fn public_post(&self, path: &str, body: &Value) -> TestResponse {
        self.server
            .post(&format!("{}{}", PREFIX, path))
            .json(body)
            .await
    }

    /// Creates a campaign through the API and returns its id.
    pub async fn create_campaign(&self, collection: &str, body: &Value) -> u64 {
        let response = self.admin_post(collection, body).await;
        response.assert_status_ok();
        let body: Value = response.json();
        body["data"]["id"].as_u64().expect("created campaign has an id")
    }

    /// Inserts events directly into the analytics store.
    pub async fn seed(&self, events: Vec<AnalyticsEvent>) {
        for event in events {
            self.analytics
                .insert_event(event)
                .await
                .expect("Failed to seed event");
        }
    }
}

/// Attaches an API key header.
pub fn with_key(request: TestRequest, key: &str) -> TestRequest {
    request.add_header(
        HeaderName::from_static("x-api-key"),
        HeaderValue::from_str(key).expect("API key is a valid header value"),
    )
}
