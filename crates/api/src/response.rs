//! Standardized API responses.
//!
//! Every response is an envelope: `{success: true, data}` on success,
//! `{success: false, message, code}` on failure.

use axum::{
    body::Bytes,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hashbar_core::{limits::MAX_BODY_SIZE_BYTES, Error, ValidationErrorCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

/// Success envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

/// Handler result type.
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Failure envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            code: code.into(),
        }
    }
}

/// API error carrying the HTTP status and failure envelope.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ErrorResponse,
    pub retry_after: Option<u64>,
}

impl ApiError {
    pub fn with_code(status: StatusCode, code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            status,
            response: ErrorResponse::new(msg, code),
            retry_after: None,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::with_code(
            StatusCode::BAD_REQUEST,
            ValidationErrorCode::InvalidFormat.code(),
            msg,
        )
    }

    pub fn rate_limited(msg: impl Into<String>, retry_after: Option<u64>) -> Self {
        Self {
            status: StatusCode::TOO_MANY_REQUESTS,
            response: ErrorResponse::new(msg, "RATE_001"),
            retry_after,
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", msg)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.response)).into_response();

        // Add Retry-After header for rate limit responses
        if let Some(retry_after) = self.retry_after {
            if let Ok(value) = retry_after.to_string().parse() {
                response.headers_mut().insert("Retry-After", value);
            }
        }

        response
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let message = match &err {
            Error::Auth { message, .. } => message.clone(),
            Error::NotFound(msg) => msg.clone(),
            _ => err.to_string(),
        };

        let mut api_error = ApiError::with_code(status, err.error_code(), message);
        if let Error::RateLimit { retry_after, .. } = err {
            api_error.retry_after = retry_after;
        }
        api_error
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let detail = errs
                    .first()
                    .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| "is invalid".to_string());
                format!("{} {}", field, detail)
            })
            .collect();
        fields.sort();

        if fields.is_empty() {
            ApiError::bad_request("Validation failed")
        } else {
            ApiError::bad_request(fields.join("; "))
        }
    }
}

/// Parses and validates a JSON request body.
///
/// Bodies are taken as raw bytes so that malformed JSON still produces
/// the failure envelope.
pub fn parse_body<T>(body: &Bytes) -> Result<T, ApiError>
where
    T: DeserializeOwned + Validate,
{
    if body.len() > MAX_BODY_SIZE_BYTES {
        return Err(ApiError::with_code(
            StatusCode::BAD_REQUEST,
            ValidationErrorCode::PayloadTooLarge.code(),
            format!(
                "Payload size {}KB exceeds {}KB limit",
                body.len() / 1024,
                MAX_BODY_SIZE_BYTES / 1024
            ),
        ));
    }

    let value: T = serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {}", e)))?;
    value.validate()?;
    Ok(value)
}
