//! Financial modeling engine
//!
//! Turns a [`RawAnalysis`] into an immutable [`FinancialSummary`] using the
//! tables in [`PricingConfig`]. The derivation is pure and total: any input,
//! including empty or nonsensical measurements, yields finite numbers.

use crate::models::{
    AnnualSavings, CapacitySource, CostBreakdown, DataSource, EmissionsReduction,
    FinancialSummary, Payback, PaybackStatus, RawAnalysis, Suitability,
};
use crate::pricing::PricingConfig;

/// Derive the financial summary for a raw analysis
pub fn derive_financials(raw: &RawAnalysis, pricing: &PricingConfig) -> FinancialSummary {
    let mean_flux = raw.mean_flux();
    let suitability = suitability(mean_flux, pricing);

    let roof_area = raw.roof_area();
    let (capacity_kwp, capacity_source) = match raw.reported_capacity() {
        Some(capacity) => (capacity, CapacitySource::Reported),
        None if roof_area.sq_meters > 0.0 => (
            roof_area.sq_meters / pricing.area_per_kwp,
            CapacitySource::DerivedFromArea(roof_area.source),
        ),
        None => (0.0, CapacitySource::Unknown),
    };

    let annual_energy_kwh = if capacity_kwp > 0.0 {
        raw.reported_energy()
            .unwrap_or(capacity_kwp * mean_flux * pricing.performance_ratio)
    } else {
        0.0
    };

    let cost = cost_breakdown(capacity_kwp, pricing);
    let savings = annual_savings(annual_energy_kwh, pricing);
    let payback = payback(cost.net_cost, savings.total);
    let emissions = emissions(annual_energy_kwh, pricing);

    tracing::debug!(
        score = suitability.score,
        capacity_kwp,
        gross = cost.gross_cost,
        grant = cost.grant,
        savings = savings.total,
        "Derived financial summary"
    );

    let recommendations = recommendations(raw, capacity_kwp, &cost, pricing);

    FinancialSummary {
        suitability,
        mean_flux,
        capacity_kwp,
        capacity_source,
        roof_area_sq_meters: roof_area.sq_meters,
        annual_energy_kwh,
        cost,
        savings,
        payback,
        emissions,
        data_source: raw.data_source,
        has_imagery: raw.has_imagery,
        note: raw.note.clone(),
        recommendations,
    }
}

/// Score the flux against the reference yield, clamped to [0, 100]
pub fn suitability(mean_flux: f64, pricing: &PricingConfig) -> Suitability {
    let ratio = if mean_flux.is_finite() && mean_flux > 0.0 && pricing.reference_flux > 0.0 {
        mean_flux / pricing.reference_flux
    } else {
        0.0
    };
    let score = (ratio * 100.0).round().clamp(0.0, 100.0) as u8;

    Suitability {
        score,
        tier: pricing.suitability.tier_for(score),
    }
}

fn cost_breakdown(capacity_kwp: f64, pricing: &PricingConfig) -> CostBreakdown {
    if capacity_kwp <= 0.0 {
        return CostBreakdown {
            gross_cost: 0.0,
            pricing_tier: "none".to_string(),
            rate_per_kwp: 0.0,
            grant: 0.0,
            grant_bands: Vec::new(),
            grant_capped: false,
            net_cost: 0.0,
        };
    }

    let (pricing_tier, rate_per_kwp) = match pricing.cost_tier_for(capacity_kwp) {
        Some(tier) => (tier.label.clone(), tier.cost_per_kwp),
        None => {
            tracing::warn!("No cost tier covers {:.2} kWp; pricing at zero", capacity_kwp);
            ("unpriced".to_string(), 0.0)
        }
    };
    let gross_cost = capacity_kwp * rate_per_kwp;

    let grant = pricing.grant.grant_for(capacity_kwp);
    let grant_capped = grant.is_capped();

    CostBreakdown {
        gross_cost,
        pricing_tier,
        rate_per_kwp,
        grant: grant.total,
        grant_bands: grant.bands,
        grant_capped,
        net_cost: (gross_cost - grant.total).max(0.0),
    }
}

fn annual_savings(annual_energy_kwh: f64, pricing: &PricingConfig) -> AnnualSavings {
    let tariffs = &pricing.tariffs;
    let self_consumed_kwh = annual_energy_kwh * tariffs.self_consumption_fraction;
    let exported_kwh = annual_energy_kwh - self_consumed_kwh;
    let self_consumption_savings = self_consumed_kwh * tariffs.import_per_kwh;
    let export_income = exported_kwh * tariffs.export_per_kwh;

    AnnualSavings {
        self_consumed_kwh,
        exported_kwh,
        self_consumption_savings,
        export_income,
        total: self_consumption_savings + export_income,
    }
}

/// Net cost over annual savings, one decimal; zero and flagged without savings
pub fn payback(net_cost: f64, annual_savings: f64) -> Payback {
    if !(annual_savings.is_finite() && annual_savings > 0.0) {
        return Payback {
            years: 0.0,
            status: PaybackStatus::NoSavings,
        };
    }

    let years = (net_cost.max(0.0) / annual_savings * 10.0).round() / 10.0;
    Payback {
        years,
        status: PaybackStatus::Computed,
    }
}

fn emissions(annual_energy_kwh: f64, pricing: &PricingConfig) -> EmissionsReduction {
    let annual_kg = annual_energy_kwh * pricing.carbon_intensity_kg_per_kwh;
    let equivalent_trees = if pricing.kg_co2_per_tree > 0.0 {
        (annual_kg / pricing.kg_co2_per_tree).floor() as u32
    } else {
        0
    };

    EmissionsReduction {
        annual_kg,
        lifetime_kg: annual_kg * f64::from(pricing.system_lifetime_years),
        equivalent_trees,
    }
}

fn recommendations(
    raw: &RawAnalysis,
    capacity_kwp: f64,
    cost: &CostBreakdown,
    pricing: &PricingConfig,
) -> Vec<String> {
    let currency = &pricing.currency;
    let mut out = Vec::new();

    if capacity_kwp > 0.0 {
        out.push("Apply for the solar PV grant through a registered installer".to_string());

        let first_band = pricing.grant.bands.first();
        let cap_at = pricing.grant.cap_reached_at();
        match (first_band, cap_at) {
            (Some(band), _) if capacity_kwp < band.up_to_kwp => out.push(format!(
                "Your {:.1} kWp system qualifies for {}{:.0}. Systems up to {} kWp receive {}{:.0}/kWp.",
                capacity_kwp, currency, cost.grant, band.up_to_kwp, currency, band.rate_per_kwp
            )),
            (_, Some(cap_kwp)) if capacity_kwp < cap_kwp => out.push(format!(
                "Your {:.1} kWp system qualifies for {}{:.0}. The maximum grant of {}{:.0} is reached at {} kWp.",
                capacity_kwp, currency, cost.grant, currency, pricing.grant.cap, cap_kwp
            )),
            _ => out.push(format!(
                "Your {:.1} kWp system qualifies for the maximum grant of {}{:.0}.",
                capacity_kwp, currency, cost.grant
            )),
        }

        out.push(format!(
            "Register for export payments to earn {}{:.3} per kWh exported",
            currency, pricing.tariffs.export_per_kwh
        ));
        out.push("Complete a post-works energy rating assessment before grant payment".to_string());
    } else {
        out.push(
            "No installable roof area was detected; a manual roof measurement is recommended"
                .to_string(),
        );
    }

    if raw.data_source == DataSource::Modeled {
        out.push("Local site survey recommended to confirm roof suitability".to_string());
        out.push("Check for shading from trees, buildings, or terrain".to_string());
        if let Some(panel) = raw.optimal_panel_config {
            out.push(format!("Optimal panel angle: {:.0}° (south-facing)", panel.tilt_angle));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FluxStats, RoofAreaSource, SuitabilityTier};

    fn analysis(mean_flux: f64, capacity: Option<f64>) -> RawAnalysis {
        RawAnalysis {
            flux_stats: FluxStats {
                mean: mean_flux,
                ..Default::default()
            },
            estimated_capacity_kwp: capacity,
            ..Default::default()
        }
    }

    #[test]
    fn test_reference_flux_with_six_kwp() {
        let pricing = PricingConfig::default();
        let summary = derive_financials(&analysis(1500.0, Some(6.0)), &pricing);

        assert_eq!(summary.suitability.score, 100);
        assert_eq!(summary.suitability.tier, SuitabilityTier::Excellent);
        assert_eq!(summary.cost.pricing_tier, "medium");
        assert_eq!(summary.cost.gross_cost, 6.0 * 1300.0);
        assert_eq!(summary.cost.grant, pricing.grant.cap);
        assert_eq!(summary.cost.net_cost, 6.0 * 1300.0 - 1800.0);
        assert_eq!(summary.capacity_source, CapacitySource::Reported);
    }

    #[test]
    fn test_zero_capacity_zeroes_money() {
        let pricing = PricingConfig::default();
        let summary = derive_financials(&analysis(900.0, Some(0.0)), &pricing);

        assert_eq!(summary.cost.gross_cost, 0.0);
        assert_eq!(summary.cost.grant, 0.0);
        assert_eq!(summary.cost.net_cost, 0.0);
        assert_eq!(summary.payback.years, 0.0);
        assert_eq!(summary.payback.status, PaybackStatus::NoSavings);
        assert_eq!(summary.emissions.annual_kg, 0.0);
        assert_eq!(summary.suitability.score, 60);
        assert_eq!(summary.capacity_source, CapacitySource::Reported);
    }

    #[test]
    fn test_reported_zero_capacity_ignores_roof_area() {
        let pricing = PricingConfig::default();
        let raw = RawAnalysis {
            estimated_capacity_kwp: Some(0.0),
            usable_roof_area_sq_meters: Some(0.0),
            estimated_roof_area_sq_meters: Some(80.0),
            estimated_annual_energy_kwh: Some(0.0),
            ..analysis(1100.0, None)
        };
        let summary = derive_financials(&raw, &pricing);

        assert_eq!(summary.capacity_kwp, 0.0);
        assert_eq!(summary.capacity_source, CapacitySource::Reported);
        assert_eq!(summary.roof_area_sq_meters, 80.0);
        assert_eq!(summary.annual_energy_kwh, 0.0);
        assert_eq!(summary.cost.gross_cost, 0.0);
        assert_eq!(summary.cost.grant, 0.0);
        assert_eq!(summary.cost.net_cost, 0.0);
        assert_eq!(summary.savings.total, 0.0);
    }

    #[test]
    fn test_negative_reported_capacity_is_zero() {
        let summary = derive_financials(&analysis(1100.0, Some(-3.0)), &PricingConfig::default());
        assert_eq!(summary.capacity_kwp, 0.0);
        assert_eq!(summary.cost.net_cost, 0.0);
    }

    #[test]
    fn test_missing_capacity_uses_roof_area() {
        let raw = RawAnalysis {
            estimated_roof_area_sq_meters: Some(55.0),
            ..analysis(1100.0, None)
        };
        let summary = derive_financials(&raw, &PricingConfig::default());
        assert_eq!(
            summary.capacity_source,
            CapacitySource::DerivedFromArea(RoofAreaSource::Estimated)
        );
        assert!((summary.capacity_kwp - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_capacity_derived_from_usable_area() {
        let pricing = PricingConfig::default();
        let raw = RawAnalysis {
            usable_roof_area_sq_meters: Some(22.0),
            ..analysis(1000.0, None)
        };
        let summary = derive_financials(&raw, &pricing);

        assert_eq!(summary.capacity_kwp, 4.0);
        assert_eq!(
            summary.capacity_source,
            CapacitySource::DerivedFromArea(RoofAreaSource::Usable)
        );
        // Energy derived from flux and performance ratio
        assert!((summary.annual_energy_kwh - 4.0 * 1000.0 * 0.82).abs() < 1e-9);
    }

    #[test]
    fn test_energy_split_keeps_both_components() {
        let pricing = PricingConfig::default();
        let raw = RawAnalysis {
            estimated_annual_energy_kwh: Some(1000.0),
            ..analysis(1000.0, Some(3.0))
        };
        let summary = derive_financials(&raw, &pricing);

        assert!((summary.savings.self_consumed_kwh - 350.0).abs() < 1e-9);
        assert!((summary.savings.exported_kwh - 650.0).abs() < 1e-9);
        assert!((summary.savings.self_consumption_savings - 133.0).abs() < 1e-9);
        assert!((summary.savings.export_income - 120.25).abs() < 1e-9);
        assert!((summary.savings.total - 253.25).abs() < 1e-9);
        assert!((summary.emissions.annual_kg - 350.0).abs() < 1e-9);
        assert!((summary.emissions.lifetime_kg - 8750.0).abs() < 1e-6);
        assert_eq!(summary.emissions.equivalent_trees, 17);
    }

    #[test]
    fn test_payback_rounding_and_flag() {
        assert_eq!(payback(1000.0, 300.0).years, 3.3);
        assert_eq!(payback(1000.0, 300.0).status, PaybackStatus::Computed);
        assert_eq!(payback(1000.0, 0.0).years, 0.0);
        assert_eq!(payback(1000.0, 0.0).status, PaybackStatus::NoSavings);
        assert_eq!(payback(0.0, 100.0).years, 0.0);
    }

    #[test]
    fn test_suitability_clamps() {
        let pricing = PricingConfig::default();
        assert_eq!(suitability(0.0, &pricing).score, 0);
        assert_eq!(suitability(10_000.0, &pricing).score, 100);
        assert_eq!(suitability(f64::INFINITY, &pricing).score, 0);
        assert_eq!(suitability(750.0, &pricing).score, 50);
    }

    #[test]
    fn test_recommendations_follow_grant_band() {
        let pricing = PricingConfig::default();

        let small = derive_financials(&analysis(1000.0, Some(1.5)), &pricing);
        assert!(small.recommendations[1].contains("Systems up to 2 kWp"));

        let mid = derive_financials(&analysis(1000.0, Some(3.0)), &pricing);
        assert!(mid.recommendations[1].contains("reached at 4 kWp"));

        let large = derive_financials(&analysis(1000.0, Some(6.0)), &pricing);
        assert!(large.recommendations[1].contains("maximum grant of €1800"));
    }

    #[test]
    fn test_modeled_source_adds_survey_advice() {
        let pricing = PricingConfig::default();
        let raw = RawAnalysis {
            data_source: DataSource::Modeled,
            optimal_panel_config: Some(crate::models::PanelConfig {
                tilt_angle: 37.0,
                azimuth: 0.0,
            }),
            ..analysis(950.0, Some(5.0))
        };
        let summary = derive_financials(&raw, &pricing);
        assert!(summary
            .recommendations
            .iter()
            .any(|r| r.contains("site survey")));
        assert!(summary
            .recommendations
            .iter()
            .any(|r| r.contains("Optimal panel angle: 37°")));
    }
}
