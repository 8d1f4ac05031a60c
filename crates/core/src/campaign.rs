//! Campaign and variant configuration types.
//!
//! A campaign is either an announcement bar or a popup. Its configuration
//! is stored as one versioned JSON document: the A/B test block plus an
//! opaque settings map owned by the admin UI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use validator::{Validate, ValidationError};

use crate::error::{Error, Result};
use crate::limits::{MAX_SETTINGS_BYTES, MAX_VARIANTS};

/// Identifier of the synthesized control variant.
pub const CONTROL_VARIANT: &str = "control";

/// Current version of the stored configuration document.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Kind of marketing widget a campaign drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignKind {
    Popup,
    Announcement,
}

impl CampaignKind {
    /// Returns the string stored in the `campaign_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Popup => "popup",
            Self::Announcement => "announcement",
        }
    }

    /// Returns the analytics table holding this kind's events.
    pub fn analytics_table(&self) -> &'static str {
        match self {
            Self::Popup => "popup_analytics",
            Self::Announcement => "announcement_analytics",
        }
    }

    /// Human-readable label used in error messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Popup => "Popup",
            Self::Announcement => "Announcement bar",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "popup" => Some(Self::Popup),
            "announcement" => Some(Self::Announcement),
            _ => None,
        }
    }

    /// Not-found error for a campaign of this kind.
    pub fn not_found(&self, id: u64) -> Error {
        Error::not_found(format!("{} {} not found", self.label(), id))
    }
}

/// Publication status of a campaign.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    #[default]
    Draft,
    Published,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "published" => Some(Self::Published),
            _ => None,
        }
    }
}

/// One configured A/B variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Variant {
    #[validate(length(min = 1, max = 64))]
    pub id: String,
    #[validate(length(max = 200))]
    #[serde(default)]
    pub name: String,
    /// Share of traffic in percent (0-100)
    #[validate(range(max = 100))]
    pub traffic_percent: u8,
    /// Fields overriding the campaign's base settings for this variant
    #[serde(default)]
    pub overrides: Map<String, Value>,
}

/// A/B test block of the campaign configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AbTestConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Configured variants, excluding control
    #[serde(default)]
    pub variants: Vec<Variant>,
}

impl AbTestConfig {
    /// Whether visitors should be split across variants at all.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.variants.is_empty()
    }

    /// Traffic left over for the control variant.
    pub fn control_percent(&self) -> u8 {
        let configured: u32 = self.variants.iter().map(|v| v.traffic_percent as u32).sum();
        100u32.saturating_sub(configured) as u8
    }

    /// Traffic allocation in draw order, control first.
    pub fn allocations(&self) -> Vec<(&str, u8)> {
        let mut allocations = Vec::with_capacity(self.variants.len() + 1);
        allocations.push((CONTROL_VARIANT, self.control_percent()));
        allocations.extend(
            self.variants
                .iter()
                .map(|v| (v.id.as_str(), v.traffic_percent)),
        );
        allocations
    }

    /// Display name for a variant id.
    pub fn variant_name(&self, variant_id: &str) -> String {
        if variant_id == CONTROL_VARIANT {
            return "Control".to_string();
        }

        match self.variants.iter().find(|v| v.id == variant_id) {
            Some(v) if !v.name.is_empty() => v.name.clone(),
            _ => format!("Variant {}", variant_id),
        }
    }

    /// Validates variant ids and traffic percentages.
    pub fn validate_variants(&self) -> Result<()> {
        if self.variants.len() > MAX_VARIANTS {
            return Err(Error::validation(format!(
                "at most {} variants are allowed",
                MAX_VARIANTS
            )));
        }

        let mut seen = HashSet::new();
        for variant in &self.variants {
            variant
                .validate()
                .map_err(|e| Error::validation(format!("variant {}: {}", variant.id, e)))?;

            if variant.id == CONTROL_VARIANT {
                return Err(Error::validation("variant id \"control\" is reserved"));
            }
            if !seen.insert(variant.id.as_str()) {
                return Err(Error::validation(format!(
                    "duplicate variant id: {}",
                    variant.id
                )));
            }
        }

        let total: u32 = self.variants.iter().map(|v| v.traffic_percent as u32).sum();
        if total > 100 {
            return Err(Error::validation(format!(
                "variant traffic adds up to {}%, must not exceed 100%",
                total
            )));
        }

        Ok(())
    }
}

fn current_schema_version() -> u32 {
    CONFIG_SCHEMA_VERSION
}

/// Validates the settings JSON size.
fn validate_settings_size(settings: &Map<String, Value>) -> std::result::Result<(), ValidationError> {
    let size = serde_json::to_vec(settings).map(|v| v.len()).unwrap_or(0);

    if size > MAX_SETTINGS_BYTES {
        let mut err = ValidationError::new("settings_too_large");
        err.message = Some(
            format!(
                "settings {}KB exceeds {}KB limit",
                size / 1024,
                MAX_SETTINGS_BYTES / 1024
            )
            .into(),
        );
        return Err(err);
    }
    Ok(())
}

/// Versioned campaign configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CampaignConfig {
    #[serde(default = "current_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub ab_test: AbTestConfig,
    /// Colors, text, targeting rules and the rest of the admin settings
    #[serde(default)]
    #[validate(custom(function = "validate_settings_size"))]
    pub settings: Map<String, Value>,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            schema_version: CONFIG_SCHEMA_VERSION,
            ab_test: AbTestConfig::default(),
            settings: Map::new(),
        }
    }
}

impl CampaignConfig {
    /// Encodes the document for storage.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes a stored document, rejecting unknown versions.
    pub fn decode(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        if config.schema_version != CONFIG_SCHEMA_VERSION {
            return Err(Error::validation(format!(
                "unsupported config schema_version {}",
                config.schema_version
            )));
        }
        Ok(config)
    }

    /// Validates the whole document before it is written.
    pub fn check(&self) -> Result<()> {
        if self.schema_version != CONFIG_SCHEMA_VERSION {
            return Err(Error::validation(format!(
                "unsupported config schema_version {}",
                self.schema_version
            )));
        }
        self.validate()
            .map_err(|e| Error::validation(e.to_string()))?;
        self.ab_test.validate_variants()
    }
}

/// A stored campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: u64,
    pub kind: CampaignKind,
    pub title: String,
    pub status: CampaignStatus,
    pub config: CampaignConfig,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    /// Display name of a variant in this campaign.
    pub fn variant_name(&self, variant_id: &str) -> String {
        self.config.ab_test.variant_name(variant_id)
    }
}

/// Request body for creating a campaign.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewCampaign {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    pub status: CampaignStatus,
    #[serde(default)]
    pub config: CampaignConfig,
}

impl NewCampaign {
    pub fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| Error::validation(e.to_string()))?;
        self.config.check()
    }
}

/// Partial update of a campaign. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CampaignUpdate {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub status: Option<CampaignStatus>,
    pub ab_test: Option<AbTestConfig>,
    pub settings: Option<Map<String, Value>>,
}

impl CampaignUpdate {
    /// Applies the update, validating the resulting configuration.
    pub fn apply(self, campaign: &mut Campaign) -> Result<()> {
        self.validate()
            .map_err(|e| Error::validation(e.to_string()))?;

        let mut config = campaign.config.clone();
        if let Some(ab_test) = self.ab_test {
            config.ab_test = ab_test;
        }
        if let Some(settings) = self.settings {
            config.settings = settings;
        }
        config.check()?;

        if let Some(title) = self.title {
            campaign.title = title;
        }
        if let Some(status) = self.status {
            campaign.status = status;
        }
        campaign.config = config;
        campaign.updated_at = Utc::now();
        Ok(())
    }
}
