//! A/B statistics derivation and winner selection.
//!
//! The store performs the `GROUP BY variant_id` aggregation and hands back
//! raw counts; everything derived from those counts lives here.

use serde::{Deserialize, Serialize};

use crate::campaign::Campaign;
use crate::limits::{
    HIGH_CONFIDENCE_IMPRESSIONS, MEDIUM_CONFIDENCE_IMPRESSIONS, MIN_WINNER_IMPRESSIONS,
};

/// Raw per-variant counts as returned by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantCounts {
    pub variant_id: String,
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
    /// Distinct sessions that produced any event for this variant
    pub visitors: u64,
}

/// Per-variant statistics with derived rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantStats {
    pub variant_id: String,
    pub variant_name: String,
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
    pub visitors: u64,
    /// Click-through rate in percent
    pub ctr: f64,
    /// Conversion rate in percent
    pub conversion_rate: f64,
}

/// Confidence label derived from total impressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Buckets a total impression count.
    ///
    /// Fixed thresholds, not a significance test.
    pub fn from_impressions(total_impressions: u64) -> Self {
        if total_impressions >= HIGH_CONFIDENCE_IMPRESSIONS {
            Self::High
        } else if total_impressions >= MEDIUM_CONFIDENCE_IMPRESSIONS {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// How the confidence label was computed.
pub const CONFIDENCE_METHOD: &str = "impression_threshold";

/// Recommended variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Winner {
    pub variant_id: String,
    pub variant_name: String,
    pub conversion_rate: f64,
    pub impressions: u64,
    pub confidence: Confidence,
    pub confidence_method: String,
}

/// Aggregated campaign statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignStats {
    pub total_visitors: u64,
    pub total_impressions: u64,
    pub total_clicks: u64,
    pub total_conversions: u64,
    pub variants: Vec<VariantStats>,
    pub winner: Option<Winner>,
}

impl CampaignStats {
    /// Statistics for a campaign with no recorded events.
    pub fn empty() -> Self {
        Self {
            total_visitors: 0,
            total_impressions: 0,
            total_clicks: 0,
            total_conversions: 0,
            variants: Vec::new(),
            winner: None,
        }
    }
}

/// Rounds to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `part / impressions * 100`, 0 without impressions, clamped to `[0, 100]`.
pub fn rate(part: u64, impressions: u64) -> f64 {
    if impressions == 0 {
        return 0.0;
    }
    round2(part as f64 / impressions as f64 * 100.0).clamp(0.0, 100.0)
}

impl VariantStats {
    pub fn from_counts(counts: VariantCounts, variant_name: String) -> Self {
        Self {
            ctr: rate(counts.clicks, counts.impressions),
            conversion_rate: rate(counts.conversions, counts.impressions),
            variant_name,
            variant_id: counts.variant_id,
            impressions: counts.impressions,
            clicks: counts.clicks,
            conversions: counts.conversions,
            visitors: counts.visitors,
        }
    }
}

/// Builds campaign statistics from store counts.
///
/// `counts` keeps the store's order; the winner tie-break depends on it.
pub fn build_stats(campaign: &Campaign, counts: Vec<VariantCounts>, total_visitors: u64) -> CampaignStats {
    let variants: Vec<VariantStats> = counts
        .into_iter()
        .map(|c| {
            let name = campaign.variant_name(&c.variant_id);
            VariantStats::from_counts(c, name)
        })
        .collect();

    let total_impressions = variants.iter().map(|v| v.impressions).sum();
    let total_clicks = variants.iter().map(|v| v.clicks).sum();
    let total_conversions = variants.iter().map(|v| v.conversions).sum();
    let winner = select_winner(&variants, total_impressions);

    CampaignStats {
        total_visitors,
        total_impressions,
        total_clicks,
        total_conversions,
        variants,
        winner,
    }
}

/// Selects the best-converting variant.
///
/// Requires at least two variants with impressions. Candidates need
/// `MIN_WINNER_IMPRESSIONS`; the first strictly highest conversion rate
/// in iteration order wins.
pub fn select_winner(variants: &[VariantStats], total_impressions: u64) -> Option<Winner> {
    let with_data = variants.iter().filter(|v| v.impressions > 0).count();
    if with_data < 2 {
        return None;
    }

    let mut best: Option<&VariantStats> = None;
    for variant in variants
        .iter()
        .filter(|v| v.impressions >= MIN_WINNER_IMPRESSIONS)
    {
        match best {
            Some(current) if variant.conversion_rate <= current.conversion_rate => {}
            _ => best = Some(variant),
        }
    }

    best.map(|v| Winner {
        variant_id: v.variant_id.clone(),
        variant_name: v.variant_name.clone(),
        conversion_rate: v.conversion_rate,
        impressions: v.impressions,
        confidence: Confidence::from_impressions(total_impressions),
        confidence_method: CONFIDENCE_METHOD.to_string(),
    })
}
