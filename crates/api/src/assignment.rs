//! Sticky variant assignment.

use hashbar_core::{
    assignment::assign_random, limits::ASSIGNMENT_TTL_DAYS, Campaign, CampaignKind,
    CONTROL_VARIANT,
};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use telemetry::metrics;
use tracing::debug;

/// Assignment cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentConfig {
    /// Days an assignment stays fixed
    pub ttl_days: u64,
    /// Maximum cached assignments
    pub capacity: u64,
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        Self {
            ttl_days: ASSIGNMENT_TTL_DAYS,
            capacity: 1_000_000,
        }
    }
}

type AssignmentKey = (CampaignKind, u64, String);

/// Assigns visitors to variants and remembers the choice until expiry.
pub struct VariantAssigner {
    cache: Cache<AssignmentKey, String>,
}

impl VariantAssigner {
    pub fn new(config: AssignmentConfig) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(config.capacity)
                .time_to_live(Duration::from_secs(config.ttl_days * 24 * 60 * 60))
                .build(),
        }
    }

    /// Returns the visitor's variant for a campaign.
    ///
    /// Campaigns without an active A/B test always yield control and
    /// leave no assignment behind.
    pub async fn assign(&self, campaign: &Campaign, visitor_id: &str) -> String {
        let ab_test = &campaign.config.ab_test;
        if !ab_test.is_active() {
            return CONTROL_VARIANT.to_string();
        }

        let key = (campaign.kind, campaign.id, visitor_id.to_string());
        let entry = self
            .cache
            .entry(key)
            .or_insert_with(async { assign_random(ab_test, &mut rand::thread_rng()) })
            .await;

        if entry.is_fresh() {
            metrics().assignments_made.inc();
            debug!(
                campaign_id = campaign.id,
                variant_id = %entry.value(),
                "Assigned visitor to variant"
            );
        } else {
            metrics().assignment_cache_hits.inc();
        }

        entry.into_value()
    }

    /// Number of live assignments.
    pub async fn len(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}
