//! Mock implementations for testing.

use async_trait::async_trait;
use axum::{routing::post, Json, Router};
use hashbar_core::{
    AnalyticsEvent, AuthRequest, CampaignKind, Error, EventType, Result, VariantCounts,
};
use hashbar_store::{AnalyticsStore, DailyCounts, DeviceCounts, MemoryAnalyticsStore};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::fixtures::{ADMIN_KEY, EDITOR_KEY, REVOKED_KEY};

/// How the failing store misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Delegate to the in-memory store
    None,
    /// Every call reports the analytics table as absent
    TableMissing,
    /// Inserts fail with a database error; reads succeed
    InsertFails,
}

/// Analytics store that wraps the in-memory store and injects failures.
///
/// Implements the same `AnalyticsStore` trait as the ClickHouse store,
/// so the handlers run unchanged against it.
#[derive(Clone)]
pub struct FailingAnalyticsStore {
    inner: Arc<MemoryAnalyticsStore>,
    mode: Arc<Mutex<FailureMode>>,
}

impl FailingAnalyticsStore {
    pub fn new(mode: FailureMode) -> Self {
        Self {
            inner: Arc::new(MemoryAnalyticsStore::new()),
            mode: Arc::new(Mutex::new(mode)),
        }
    }

    pub fn set_mode(&self, mode: FailureMode) {
        *self.mode.lock() = mode;
    }

    pub fn stored_events(&self) -> Vec<AnalyticsEvent> {
        self.inner.events()
    }

    fn check_table(&self, kind: CampaignKind) -> Result<()> {
        match *self.mode.lock() {
            FailureMode::TableMissing => Err(Error::table_missing(kind.analytics_table())),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl AnalyticsStore for FailingAnalyticsStore {
    async fn event_exists(
        &self,
        kind: CampaignKind,
        campaign_id: u64,
        session_id: &str,
        event_type: EventType,
    ) -> Result<bool> {
        self.check_table(kind)?;
        self.inner
            .event_exists(kind, campaign_id, session_id, event_type)
            .await
    }

    async fn insert_event(&self, event: AnalyticsEvent) -> Result<()> {
        self.check_table(event.campaign_type)?;
        if *self.mode.lock() == FailureMode::InsertFails {
            return Err(Error::database("insert rejected: too many parts"));
        }
        self.inner.insert_event(event).await
    }

    async fn variant_counts(&self, kind: CampaignKind, campaign_id: u64) -> Result<Vec<VariantCounts>> {
        self.check_table(kind)?;
        self.inner.variant_counts(kind, campaign_id).await
    }

    async fn unique_visitors(&self, kind: CampaignKind, campaign_id: u64) -> Result<u64> {
        self.check_table(kind)?;
        self.inner.unique_visitors(kind, campaign_id).await
    }

    async fn daily_counts(
        &self,
        kind: CampaignKind,
        campaign_id: u64,
        days: u32,
    ) -> Result<Vec<DailyCounts>> {
        self.check_table(kind)?;
        self.inner.daily_counts(kind, campaign_id, days).await
    }

    async fn device_counts(&self, kind: CampaignKind, campaign_id: u64) -> Result<Vec<DeviceCounts>> {
        self.check_table(kind)?;
        self.inner.device_counts(kind, campaign_id).await
    }
}

/// Auth service answering `/internal/auth/validate` for the fixture keys.
pub struct MockAuthService {
    pub url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl MockAuthService {
    /// Binds to an ephemeral local port and starts serving.
    pub async fn start() -> Self {
        let app = Router::new().route("/internal/auth/validate", post(validate));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock auth service");
        let addr: SocketAddr = listener.local_addr().expect("No local address");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            url: format!("http://{}", addr),
            handle,
        }
    }
}

impl Drop for MockAuthService {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn validate(Json(request): Json<AuthRequest>) -> Json<Value> {
    let response = match request.api_key.as_str() {
        ADMIN_KEY => json!({
            "valid": true,
            "user": "admin@shop.example.com",
            "capabilities": ["manage_options", "edit_posts"],
        }),
        EDITOR_KEY => json!({
            "valid": true,
            "user": "editor@shop.example.com",
            "capabilities": ["edit_posts"],
        }),
        REVOKED_KEY => json!({
            "valid": false,
            "error": { "code": "AUTH_004", "message": "API key has been revoked" },
        }),
        _ => json!({
            "valid": false,
            "error": { "code": "AUTH_003", "message": "API key not found" },
        }),
    };
    Json(response)
}
