//! Request extractors.

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts, Path},
    http::{header, request::Parts},
};
use hashbar_core::{extract_api_key, resolve_client_ip, ParsedApiKey};
use std::net::SocketAddr;
use tracing::debug;

use crate::response::ApiError;
use crate::state::AppState;

/// Authenticated admin context.
///
/// Holds a key the auth service confirmed has `manage_options`.
#[derive(Debug, Clone)]
pub struct AdminContext {
    pub api_key: ParsedApiKey,
    /// Key owner reported by the auth service
    pub user: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AdminContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let api_key_header = parts.headers.get("X-API-Key").and_then(|h| h.to_str().ok());

        let api_key = extract_api_key(auth_header, api_key_header)?;

        let auth_response = state.auth_client.validate(&api_key).await?;
        let user = auth_response.require_manage_options()?.to_string();

        debug!(user = %user, path = %parts.uri.path(), "Admin request authorized");

        Ok(AdminContext { api_key, user })
    }
}

/// Resolved client IP address, `0.0.0.0` when nothing usable was sent.
#[derive(Debug, Clone)]
pub struct ClientIp(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientIp(client_ip_from_parts(parts)))
    }
}

pub(crate) fn client_ip_from_parts(parts: &Parts) -> String {
    let header_str = |name: &str| parts.headers.get(name).and_then(|h| h.to_str().ok());
    let remote = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    resolve_client_ip(header_str("Client-IP"), header_str("X-Forwarded-For"), remote)
}

/// Socket peer address, `0.0.0.0` when the server runs without connect info.
pub(crate) fn peer_ip_from_parts(parts: &Parts) -> String {
    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "0.0.0.0".to_string())
}

/// Campaign id from the last path segment.
///
/// Rejects non-numeric ids with the failure envelope.
#[derive(Debug, Clone, Copy)]
pub struct CampaignId(pub u64);

#[async_trait]
impl<S> FromRequestParts<S> for CampaignId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<u64>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid campaign id: {}", e)))?;
        Ok(CampaignId(id))
    }
}

/// Request `User-Agent`, empty when absent.
#[derive(Debug, Clone, Default)]
pub struct UserAgent(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for UserAgent
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ua = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default();
        Ok(UserAgent(ua.to_string()))
    }
}
