use serde::{Deserialize, Serialize};
use std::fmt;

use super::analysis::{DataSource, RoofAreaSource};

/// Qualitative suitability tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuitabilityTier {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl fmt::Display for SuitabilityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SuitabilityTier::Excellent => "Excellent",
            SuitabilityTier::Good => "Good",
            SuitabilityTier::Fair => "Fair",
            SuitabilityTier::Poor => "Poor",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suitability {
    /// Score in [0, 100]
    pub score: u8,
    pub tier: SuitabilityTier,
}

/// Where the modeled capacity came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacitySource {
    /// Taken from the upstream analysis
    Reported,
    /// Usable roof area divided by the area needed per kWp
    DerivedFromArea(RoofAreaSource),
    /// No capacity could be determined
    Unknown,
}

/// Contribution of a single grant band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrantBandContribution {
    pub from_kwp: f64,
    pub to_kwp: f64,
    pub rate_per_kwp: f64,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub gross_cost: f64,
    /// Label of the pricing tier the capacity fell into
    pub pricing_tier: String,
    pub rate_per_kwp: f64,
    pub grant: f64,
    pub grant_bands: Vec<GrantBandContribution>,
    /// True when the band total exceeded the cap
    pub grant_capped: bool,
    pub net_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualSavings {
    pub self_consumed_kwh: f64,
    pub exported_kwh: f64,
    pub self_consumption_savings: f64,
    pub export_income: f64,
    pub total: f64,
}

/// Whether the payback figure is meaningful
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaybackStatus {
    Computed,
    /// Annual savings were zero; `years` is reported as 0
    NoSavings,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Payback {
    /// Years, rounded to one decimal
    pub years: f64,
    pub status: PaybackStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmissionsReduction {
    pub annual_kg: f64,
    pub lifetime_kg: f64,
    pub equivalent_trees: u32,
}

/// Financial projection derived from a raw analysis
///
/// Values are produced by [`crate::finance::derive_financials`] and never
/// modified afterwards; a changed analysis yields a new summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub suitability: Suitability,
    pub mean_flux: f64,
    pub capacity_kwp: f64,
    pub capacity_source: CapacitySource,
    pub roof_area_sq_meters: f64,
    pub annual_energy_kwh: f64,
    pub cost: CostBreakdown,
    pub savings: AnnualSavings,
    pub payback: Payback,
    pub emissions: EmissionsReduction,
    pub data_source: DataSource,
    pub has_imagery: bool,
    pub note: Option<String>,
    pub recommendations: Vec<String>,
}
