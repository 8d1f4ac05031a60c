//! Admin authentication types and API key validation.
//!
//! Admin endpoints require a key that carries the `manage_options`
//! capability. Capabilities come from the auth service response and are
//! passed to handlers explicitly.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::error::{AuthErrorCode, Error, Result};
use crate::limits::{API_KEY_PATTERN, MANAGE_OPTIONS};

/// Compiled API key regex (lazy initialization).
static API_KEY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(API_KEY_PATTERN).expect("invalid API key pattern"));

/// API key environment: live or test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyEnv {
    Live,
    Test,
}

/// Parsed and validated admin API key.
#[derive(Debug, Clone)]
pub struct ParsedApiKey {
    raw: String,
    env: ApiKeyEnv,
}

impl ParsedApiKey {
    /// Parse and validate an API key.
    ///
    /// Format: `hbk_(live|test)_[a-zA-Z0-9]{32}`
    pub fn parse(key: &str) -> Result<Self> {
        if key.is_empty() {
            return Err(Error::auth(AuthErrorCode::MissingKey, "API key is required"));
        }

        if !API_KEY_REGEX.is_match(key) {
            return Err(Error::auth(
                AuthErrorCode::InvalidFormat,
                "Invalid API key format",
            ));
        }

        let env = if key.starts_with("hbk_live_") {
            ApiKeyEnv::Live
        } else {
            ApiKeyEnv::Test
        };

        Ok(Self {
            raw: key.to_string(),
            env,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn env(&self) -> ApiKeyEnv {
        self.env
    }
}

/// Request to the auth service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequest {
    pub api_key: String,
    pub required_capability: String,
}

impl AuthRequest {
    /// Request validation for admin access.
    pub fn manage_options(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            required_capability: MANAGE_OPTIONS.to_string(),
        }
    }
}

/// Auth error in response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponseError {
    pub code: String,
    pub message: String,
}

/// Response from the auth service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub valid: bool,
    /// Identity of the key owner, for audit logging
    pub user: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    pub error: Option<AuthResponseError>,
}

impl AuthResponse {
    /// Checks validity and the `manage_options` capability.
    pub fn require_manage_options(&self) -> Result<&str> {
        if !self.valid {
            let err = self.error.as_ref();
            let code = err.map(|e| e.code.as_str()).unwrap_or("AUTH_003");
            let msg = err
                .map(|e| e.message.as_str())
                .unwrap_or("Invalid API key");

            return Err(match code {
                "AUTH_001" => Error::auth(AuthErrorCode::MissingKey, msg),
                "AUTH_002" => Error::auth(AuthErrorCode::InvalidFormat, msg),
                "AUTH_004" => Error::auth(AuthErrorCode::Revoked, msg),
                "AUTH_005" => Error::auth(AuthErrorCode::InsufficientPermissions, msg),
                _ => Error::auth(AuthErrorCode::InvalidKey, msg),
            });
        }

        if !self.capabilities.iter().any(|c| c == MANAGE_OPTIONS) {
            return Err(Error::auth(
                AuthErrorCode::InsufficientPermissions,
                "The manage_options capability is required",
            ));
        }

        Ok(self.user.as_deref().unwrap_or("unknown"))
    }
}

/// Extract API key from request headers.
///
/// Checks in order:
/// 1. `Authorization: Bearer <key>`
/// 2. `X-API-Key: <key>`
pub fn extract_api_key(auth_header: Option<&str>, api_key_header: Option<&str>) -> Result<ParsedApiKey> {
    if let Some(key) = auth_header.and_then(|a| a.strip_prefix("Bearer ")) {
        return ParsedApiKey::parse(key.trim());
    }

    if let Some(key) = api_key_header {
        return ParsedApiKey::parse(key.trim());
    }

    Err(Error::auth(AuthErrorCode::MissingKey, "API key is required"))
}
