//! Unit and pricing tables
//!
//! All jurisdiction- and year-specific constants live in [`PricingConfig`],
//! which is passed explicitly to the financial engine. The defaults describe
//! the Irish residential market in 2025.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Result, SolarError};
use crate::models::{GrantBandContribution, SuitabilityTier};

/// Installation cost tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostTier {
    pub label: String,

    /// Exclusive upper bound in kWp; `None` marks the open-ended last tier
    pub below_kwp: Option<f64>,

    /// Installed cost per kWp
    pub cost_per_kwp: f64,
}

/// One band of the capacity-tiered grant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrantBand {
    /// Upper capacity bound of this band in kWp
    pub up_to_kwp: f64,
    pub rate_per_kwp: f64,
}

/// Piecewise-linear grant with a hard cap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrantSchedule {
    /// Bands in ascending order of `up_to_kwp`
    pub bands: Vec<GrantBand>,
    pub cap: f64,
}

/// Grant computed for a given capacity
#[derive(Debug, Clone, PartialEq)]
pub struct GrantCalculation {
    pub bands: Vec<GrantBandContribution>,
    pub uncapped: f64,
    pub total: f64,
}

impl GrantCalculation {
    pub fn is_capped(&self) -> bool {
        self.uncapped > self.total
    }
}

impl GrantSchedule {
    /// Sum the contribution of every band up to `capacity_kwp`, then cap
    pub fn grant_for(&self, capacity_kwp: f64) -> GrantCalculation {
        let mut bands = Vec::new();
        let mut uncapped = 0.0;

        if capacity_kwp.is_finite() && capacity_kwp > 0.0 {
            let mut lower = 0.0;
            for band in &self.bands {
                if capacity_kwp <= lower {
                    break;
                }
                let covered = capacity_kwp.min(band.up_to_kwp) - lower;
                if covered > 0.0 {
                    let amount = covered * band.rate_per_kwp;
                    uncapped += amount;
                    bands.push(GrantBandContribution {
                        from_kwp: lower,
                        to_kwp: lower + covered,
                        rate_per_kwp: band.rate_per_kwp,
                        amount,
                    });
                }
                lower = band.up_to_kwp;
            }
        }

        GrantCalculation {
            bands,
            uncapped,
            total: uncapped.min(self.cap),
        }
    }

    /// Capacity at which the cap is first reached, if any band reaches it
    pub fn cap_reached_at(&self) -> Option<f64> {
        let mut lower = 0.0;
        let mut running = 0.0;
        for band in &self.bands {
            let band_total = (band.up_to_kwp - lower) * band.rate_per_kwp;
            if running + band_total >= self.cap {
                if band.rate_per_kwp <= 0.0 {
                    return Some(lower);
                }
                return Some(lower + (self.cap - running) / band.rate_per_kwp);
            }
            running += band_total;
            lower = band.up_to_kwp;
        }
        None
    }
}

/// Self-consumption split and electricity tariffs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tariffs {
    /// Fraction of generated energy used on site, in [0, 1]
    pub self_consumption_fraction: f64,

    /// Value of each self-consumed kWh (avoided import)
    pub import_per_kwh: f64,

    /// Payment for each exported kWh
    pub export_per_kwh: f64,
}

/// Ascending score thresholds for the qualitative tiers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SuitabilityThresholds {
    pub fair: u8,
    pub good: u8,
    pub excellent: u8,
}

impl SuitabilityThresholds {
    pub fn tier_for(&self, score: u8) -> SuitabilityTier {
        if score >= self.excellent {
            SuitabilityTier::Excellent
        } else if score >= self.good {
            SuitabilityTier::Good
        } else if score >= self.fair {
            SuitabilityTier::Fair
        } else {
            SuitabilityTier::Poor
        }
    }
}

/// Every constant the financial engine depends on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Currency symbol used in rendered output
    pub currency: String,

    /// Annual flux regarded as excellent (kWh/kWp/year); scores 100
    pub reference_flux: f64,

    pub suitability: SuitabilityThresholds,

    /// Roof area needed per installed kWp (m²)
    pub area_per_kwp: f64,

    /// System losses applied when annual energy has to be derived from flux
    pub performance_ratio: f64,

    pub cost_tiers: Vec<CostTier>,

    pub grant: GrantSchedule,

    pub tariffs: Tariffs,

    /// kg of CO2 per kWh of grid electricity
    pub carbon_intensity_kg_per_kwh: f64,

    pub system_lifetime_years: u32,

    /// kg of CO2 a single tree absorbs per year
    pub kg_co2_per_tree: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            currency: "€".to_string(),
            reference_flux: 1500.0,
            suitability: SuitabilityThresholds {
                fair: 40,
                good: 60,
                excellent: 80,
            },
            area_per_kwp: 5.5,
            performance_ratio: 0.82,
            cost_tiers: vec![
                CostTier {
                    label: "small".to_string(),
                    below_kwp: Some(4.0),
                    cost_per_kwp: 1500.0,
                },
                CostTier {
                    label: "medium".to_string(),
                    below_kwp: Some(8.0),
                    cost_per_kwp: 1300.0,
                },
                CostTier {
                    label: "large".to_string(),
                    below_kwp: None,
                    cost_per_kwp: 1150.0,
                },
            ],
            grant: GrantSchedule {
                bands: vec![
                    GrantBand {
                        up_to_kwp: 2.0,
                        rate_per_kwp: 700.0,
                    },
                    GrantBand {
                        up_to_kwp: 4.0,
                        rate_per_kwp: 200.0,
                    },
                ],
                cap: 1800.0,
            },
            tariffs: Tariffs {
                self_consumption_fraction: 0.35,
                import_per_kwh: 0.38,
                export_per_kwh: 0.185,
            },
            carbon_intensity_kg_per_kwh: 0.35,
            system_lifetime_years: 25,
            kg_co2_per_tree: 20.0,
        }
    }
}

impl PricingConfig {
    /// Load a pricing table from a TOML file; missing keys keep their defaults
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| SolarError::ConfigInvalid {
            key: "pricing_file".to_string(),
            reason: format!("Failed to read pricing file {}: {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a pricing table from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PricingConfig = toml::from_str(content).map_err(|e| SolarError::ConfigInvalid {
            key: "pricing_file".to_string(),
            reason: format!("Failed to parse TOML: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Pick the tier containing `capacity_kwp` (step function, no interpolation)
    pub fn cost_tier_for(&self, capacity_kwp: f64) -> Option<&CostTier> {
        self.cost_tiers
            .iter()
            .find(|tier| match tier.below_kwp {
                Some(bound) => capacity_kwp < bound,
                None => true,
            })
    }

    /// Check structural invariants of the tables
    pub fn validate(&self) -> Result<()> {
        let invalid = |table: &str, reason: String| SolarError::InvalidPricing {
            table: table.to_string(),
            reason,
        };

        if !(self.reference_flux.is_finite() && self.reference_flux > 0.0) {
            return Err(invalid("reference_flux", "must be a positive number".to_string()));
        }

        let t = &self.suitability;
        if !(t.fair <= t.good && t.good <= t.excellent && t.excellent <= 100) {
            return Err(invalid(
                "suitability",
                format!(
                    "thresholds must ascend within 0..=100 (fair {}, good {}, excellent {})",
                    t.fair, t.good, t.excellent
                ),
            ));
        }

        if !(self.area_per_kwp.is_finite() && self.area_per_kwp > 0.0) {
            return Err(invalid("area_per_kwp", "must be a positive number".to_string()));
        }

        if !(0.0..=1.0).contains(&self.performance_ratio) {
            return Err(invalid("performance_ratio", "must be within [0, 1]".to_string()));
        }

        match self.cost_tiers.last() {
            None => return Err(invalid("cost_tiers", "at least one tier is required".to_string())),
            Some(last) if last.below_kwp.is_some() => {
                return Err(invalid(
                    "cost_tiers",
                    format!("last tier '{}' must be open-ended", last.label),
                ))
            }
            Some(_) => {}
        }
        let mut previous = 0.0;
        let last_index = self.cost_tiers.len() - 1;
        for (index, tier) in self.cost_tiers.iter().enumerate() {
            if !(tier.cost_per_kwp.is_finite() && tier.cost_per_kwp >= 0.0) {
                return Err(invalid(
                    "cost_tiers",
                    format!("tier '{}' has a negative or invalid rate", tier.label),
                ));
            }
            if let Some(bound) = tier.below_kwp {
                if !(bound.is_finite() && bound > previous) {
                    return Err(invalid(
                        "cost_tiers",
                        format!("tier '{}' bound {} is not ascending", tier.label, bound),
                    ));
                }
                previous = bound;
            } else if index != last_index {
                return Err(invalid(
                    "cost_tiers",
                    format!("only the last tier may be open-ended, found '{}'", tier.label),
                ));
            }
        }

        let mut previous = 0.0;
        for band in &self.grant.bands {
            let ascending = band.up_to_kwp.is_finite() && band.up_to_kwp > previous;
            if !ascending || !non_negative(band.rate_per_kwp) {
                return Err(invalid(
                    "grant",
                    format!(
                        "band up to {} kWp must ascend and have a non-negative rate",
                        band.up_to_kwp
                    ),
                ));
            }
            previous = band.up_to_kwp;
        }
        if !(self.grant.cap.is_finite() && self.grant.cap >= 0.0) {
            return Err(invalid("grant", "cap must be a non-negative number".to_string()));
        }

        let tariffs = &self.tariffs;
        if !(0.0..=1.0).contains(&tariffs.self_consumption_fraction) {
            return Err(invalid(
                "tariffs",
                "self_consumption_fraction must be within [0, 1]".to_string(),
            ));
        }
        if !non_negative(tariffs.import_per_kwh) || !non_negative(tariffs.export_per_kwh) {
            return Err(invalid("tariffs", "tariffs must be non-negative".to_string()));
        }
        if tariffs.export_per_kwh > tariffs.import_per_kwh {
            tracing::warn!(
                "Export tariff {} exceeds import tariff {}; self-consumption is undervalued",
                tariffs.export_per_kwh,
                tariffs.import_per_kwh
            );
        }

        if !non_negative(self.carbon_intensity_kg_per_kwh)
            || !(self.kg_co2_per_tree.is_finite() && self.kg_co2_per_tree > 0.0)
        {
            return Err(invalid(
                "emissions",
                "carbon intensity must be non-negative and kg per tree positive".to_string(),
            ));
        }

        Ok(())
    }
}

fn non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tables_are_valid() {
        PricingConfig::default().validate().unwrap();
    }

    #[test]
    fn test_cost_tier_step_function() {
        let pricing = PricingConfig::default();
        assert_eq!(pricing.cost_tier_for(0.5).unwrap().label, "small");
        assert_eq!(pricing.cost_tier_for(3.99).unwrap().label, "small");
        assert_eq!(pricing.cost_tier_for(4.0).unwrap().label, "medium");
        assert_eq!(pricing.cost_tier_for(6.0).unwrap().cost_per_kwp, 1300.0);
        assert_eq!(pricing.cost_tier_for(8.0).unwrap().label, "large");
        assert_eq!(pricing.cost_tier_for(250.0).unwrap().label, "large");
    }

    #[test]
    fn test_grant_bands() {
        let grant = PricingConfig::default().grant;
        assert_eq!(grant.grant_for(0.0).total, 0.0);
        assert_eq!(grant.grant_for(1.5).total, 1050.0);
        assert_eq!(grant.grant_for(2.0).total, 1400.0);
        assert_eq!(grant.grant_for(3.0).total, 1600.0);
        assert_eq!(grant.grant_for(4.0).total, 1800.0);
        assert_eq!(grant.grant_for(5.0).total, 1800.0);

        let three = grant.grant_for(3.0);
        assert_eq!(three.bands.len(), 2);
        assert_eq!(three.bands[1].from_kwp, 2.0);
        assert_eq!(three.bands[1].amount, 200.0);
    }

    #[test]
    fn test_grant_cap_applies_to_band_total() {
        let schedule = GrantSchedule {
            bands: vec![GrantBand {
                up_to_kwp: 10.0,
                rate_per_kwp: 500.0,
            }],
            cap: 2000.0,
        };
        let calc = schedule.grant_for(6.0);
        assert_eq!(calc.uncapped, 3000.0);
        assert_eq!(calc.total, 2000.0);
        assert!(calc.is_capped());
        assert_eq!(schedule.cap_reached_at(), Some(4.0));
    }

    #[test]
    fn test_cap_reached_at_default() {
        assert_eq!(PricingConfig::default().grant.cap_reached_at(), Some(4.0));
    }

    #[test]
    fn test_suitability_thresholds() {
        let t = PricingConfig::default().suitability;
        assert_eq!(t.tier_for(100), SuitabilityTier::Excellent);
        assert_eq!(t.tier_for(80), SuitabilityTier::Excellent);
        assert_eq!(t.tier_for(79), SuitabilityTier::Good);
        assert_eq!(t.tier_for(40), SuitabilityTier::Fair);
        assert_eq!(t.tier_for(0), SuitabilityTier::Poor);
    }

    #[test]
    fn test_partial_toml_override() {
        let pricing = PricingConfig::from_toml_str(
            r#"
reference_flux = 1100.0
carbon_intensity_kg_per_kwh = 0.4

[tariffs]
self_consumption_fraction = 0.5
import_per_kwh = 0.30
export_per_kwh = 0.20
"#,
        )
        .unwrap();

        assert_eq!(pricing.reference_flux, 1100.0);
        assert_eq!(pricing.tariffs.self_consumption_fraction, 0.5);
        assert_eq!(pricing.grant.cap, 1800.0);
    }

    #[test]
    fn test_rejects_closed_last_tier() {
        let mut pricing = PricingConfig::default();
        pricing.cost_tiers.pop();
        assert!(pricing.validate().is_err());
    }

    #[test]
    fn test_rejects_descending_grant_bands() {
        let mut pricing = PricingConfig::default();
        pricing.grant.bands.reverse();
        assert!(pricing.validate().is_err());
    }

    #[test]
    fn test_rejects_nan_tariff_from_toml() {
        let result = PricingConfig::from_toml_str(
            r#"
[tariffs]
self_consumption_fraction = 0.5
import_per_kwh = nan
export_per_kwh = 0.20
"#,
        );
        assert!(matches!(result, Err(SolarError::InvalidPricing { .. })));
    }

    #[test]
    fn test_rejects_non_finite_values() {
        let cases: [fn(&mut PricingConfig); 7] = [
            |p| p.tariffs.export_per_kwh = f64::NAN,
            |p| p.tariffs.import_per_kwh = f64::INFINITY,
            |p| p.grant.bands[0].rate_per_kwp = f64::NAN,
            |p| p.grant.bands[1].up_to_kwp = f64::NAN,
            |p| p.cost_tiers[0].below_kwp = Some(f64::NAN),
            |p| p.carbon_intensity_kg_per_kwh = f64::NAN,
            |p| p.kg_co2_per_tree = f64::INFINITY,
        ];

        for (index, mutate) in cases.into_iter().enumerate() {
            let mut pricing = PricingConfig::default();
            mutate(&mut pricing);
            assert!(pricing.validate().is_err(), "case {} was accepted", index);
        }
    }
}
