//! Size limits and fixed thresholds.
//!
//! The `#[validate]` derive macro requires literal values in attributes,
//! so field limits are duplicated there. Keep both in sync when modifying.

// === Request Limits ===

/// Maximum request body size in bytes (64KB).
pub const MAX_BODY_SIZE_BYTES: usize = 64 * 1024;

/// Maximum campaign settings JSON size in bytes (32KB).
pub const MAX_SETTINGS_BYTES: usize = 32 * 1024;

// === String Field Limits (chars) ===

/// Campaign title max length.
pub const MAX_TITLE_LEN: usize = 200;

/// Variant identifier max length.
pub const MAX_VARIANT_ID_LEN: usize = 64;

/// Variant display name max length.
pub const MAX_VARIANT_NAME_LEN: usize = 200;

/// Session and visitor identifier max length.
pub const MAX_SESSION_ID_LEN: usize = 128;

/// Page URL max length.
pub const MAX_PAGE_URL_LEN: usize = 2048;

/// Free-form event value max length.
pub const MAX_EVENT_VALUE_LEN: usize = 1000;

/// Maximum configured variants per campaign (control excluded).
pub const MAX_VARIANTS: usize = 10;

// === A/B Testing ===

/// Days a visitor keeps the same variant.
pub const ASSIGNMENT_TTL_DAYS: u64 = 30;

/// Minimum impressions before a variant may be declared winner.
pub const MIN_WINNER_IMPRESSIONS: u64 = 100;

/// Total impressions for "high" confidence.
pub const HIGH_CONFIDENCE_IMPRESSIONS: u64 = 1000;

/// Total impressions for "medium" confidence.
pub const MEDIUM_CONFIDENCE_IMPRESSIONS: u64 = 500;

// === Analytics Overview ===

/// Default overview window in days.
pub const DEFAULT_OVERVIEW_DAYS: u32 = 30;

/// Maximum overview window in days.
pub const MAX_OVERVIEW_DAYS: u32 = 365;

// === Auth ===

/// Admin API key format: `hbk_(live|test)_[a-zA-Z0-9]{32}`.
pub const API_KEY_PATTERN: &str = r"^hbk_(live|test)_[a-zA-Z0-9]{32}$";

/// Capability required for admin endpoints.
pub const MANAGE_OPTIONS: &str = "manage_options";
