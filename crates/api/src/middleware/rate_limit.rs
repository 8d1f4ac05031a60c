//! Per-client rate limiting for the public endpoints.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use telemetry::metrics;
use tracing::warn;

use crate::extractors::{client_ip_from_parts, peer_ip_from_parts};
use crate::response::ApiError;
use crate::state::AppState;

/// Token bucket rate limiter.
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, TokenBucket>>,
    config: RateLimitConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests per second per client IP
    pub rate: u32,
    /// Burst size
    pub burst: u32,
    /// Key buckets on `Client-IP`/`X-Forwarded-For` instead of the socket
    /// peer. Only safe behind a proxy that overwrites those headers.
    #[serde(default)]
    pub trust_forwarded: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            rate: 20,
            burst: 100,
            trust_forwarded: false,
        }
    }
}

struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(burst: u32) -> Self {
        Self {
            tokens: burst as f64,
            last_update: Instant::now(),
        }
    }

    fn try_acquire(&mut self, rate: u32, burst: u32) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        self.last_update = now;

        // Replenish tokens
        self.tokens = (self.tokens + elapsed * rate as f64).min(burst as f64);

        // Try to consume a token
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Seconds a rejected client should wait for one token.
    pub fn retry_after_secs(&self) -> u64 {
        if self.config.rate == 0 {
            return 60;
        }
        (1.0 / self.config.rate as f64).ceil().max(1.0) as u64
    }

    pub fn trusts_forwarded(&self) -> bool {
        self.config.trust_forwarded
    }

    /// Number of tracked clients.
    pub fn tracked_clients(&self) -> usize {
        self.buckets.lock().len()
    }

    /// Check if request is allowed for the given key.
    pub fn check(&self, key: &str) -> bool {
        let mut buckets = self.buckets.lock();

        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(self.config.burst));

        bucket.try_acquire(self.config.rate, self.config.burst)
    }

    /// Clean up stale buckets.
    pub fn cleanup(&self, max_age: Duration) {
        let mut buckets = self.buckets.lock();
        let now = Instant::now();

        buckets.retain(|_, bucket| now.duration_since(bucket.last_update) < max_age);
    }
}

/// Shared rate limiter state.
pub type SharedRateLimiter = Arc<RateLimiter>;

/// Rejects requests from clients that exhausted their bucket.
///
/// Buckets are keyed on the socket peer address unless forwarded headers
/// are trusted.
pub async fn rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (parts, body) = request.into_parts();
    let ip = if state.rate_limiter.trusts_forwarded() {
        client_ip_from_parts(&parts)
    } else {
        peer_ip_from_parts(&parts)
    };
    let request = Request::from_parts(parts, body);

    if !state.rate_limiter.check(&ip) {
        metrics().rate_limited_requests.inc();
        warn!(client_ip = %ip, path = %request.uri().path(), "Rate limit exceeded");
        return Err(ApiError::rate_limited(
            "Too many requests",
            Some(state.rate_limiter.retry_after_secs()),
        ));
    }

    Ok(next.run(request).await)
}
