//! Unified error types for the hashbar engine.
//!
//! Error codes:
//! - AUTH_001-005: Admin authentication errors
//! - VALID_001-003: Validation errors
//! - NOT_FOUND: Campaign lookup errors
//! - DB_001-002: Storage errors
//! - RATE_001: Rate limit errors

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Authentication error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorCode {
    /// AUTH_001: API key is required
    MissingKey,
    /// AUTH_002: Invalid API key format
    InvalidFormat,
    /// AUTH_003: Invalid API key (not found)
    InvalidKey,
    /// AUTH_004: API key has been revoked
    Revoked,
    /// AUTH_005: Missing the required capability
    InsufficientPermissions,
}

impl AuthErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingKey => "AUTH_001",
            Self::InvalidFormat => "AUTH_002",
            Self::InvalidKey => "AUTH_003",
            Self::Revoked => "AUTH_004",
            Self::InsufficientPermissions => "AUTH_005",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InsufficientPermissions => 403,
            _ => 401,
        }
    }
}

/// Validation error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorCode {
    /// VALID_001: Invalid or missing parameter
    InvalidFormat,
    /// VALID_002: Event type not in the allow-list
    UnknownEventType,
    /// VALID_003: Request body exceeds the size limit
    PayloadTooLarge,
}

impl ValidationErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidFormat => "VALID_001",
            Self::UnknownEventType => "VALID_002",
            Self::PayloadTooLarge => "VALID_003",
        }
    }
}

/// Storage error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorCode {
    /// DB_001: Query or insert failed
    QueryFailed,
    /// DB_002: Analytics table does not exist
    TableMissing,
}

impl DbErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::QueryFailed => "DB_001",
            Self::TableMissing => "DB_002",
        }
    }
}

/// Unified error type for the hashbar engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Authentication error with code.
    #[error("[{code}] {message}")]
    Auth {
        code: &'static str,
        message: String,
        http_status: u16,
    },

    /// Rate limit error.
    #[error("rate limited: {message}")]
    RateLimit {
        message: String,
        retry_after: Option<u64>,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid event type: {0}")]
    InvalidEventType(String),

    #[error("analytics table missing: {0}")]
    TableMissing(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an authentication error.
    pub fn auth(code: AuthErrorCode, msg: impl Into<String>) -> Self {
        Self::Auth {
            code: code.code(),
            message: msg.into(),
            http_status: code.http_status(),
        }
    }

    /// Create a rate limit error.
    pub fn rate_limit(msg: impl Into<String>, retry_after: Option<u64>) -> Self {
        Self::RateLimit {
            message: msg.into(),
            retry_after,
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField(field.into())
    }

    pub fn table_missing(table: impl Into<String>) -> Self {
        Self::TableMissing(table.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Auth { http_status, .. } => *http_status,
            Self::RateLimit { .. } => 429,
            Self::NotFound(_) => 404,
            Self::Validation(_) => 400,
            Self::MissingField(_) => 400,
            Self::InvalidEventType(_) => 400,
            Self::Serialization(_) => 400,
            Self::TableMissing(_) => 500,
            Self::Database(_) => 500,
            Self::Internal(_) => 500,
        }
    }

    /// Get the machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Auth { code, .. } => code,
            Self::RateLimit { .. } => "RATE_001",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) | Self::MissingField(_) | Self::Serialization(_) => {
                ValidationErrorCode::InvalidFormat.code()
            }
            Self::InvalidEventType(_) => ValidationErrorCode::UnknownEventType.code(),
            Self::TableMissing(_) => DbErrorCode::TableMissing.code(),
            Self::Database(_) => DbErrorCode::QueryFailed.code(),
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Whether this error means the analytics table is absent.
    pub fn is_table_missing(&self) -> bool {
        matches!(self, Self::TableMissing(_))
    }
}
