use crate::cli::FinanceArgs;
use crate::config_loader::load_pricing;
use crate::output::OutputWriter;
use anyhow::{Context, Result};
use solarmatch_core::config::LayeredConfig;
use solarmatch_core::derive_financials;
use solarmatch_core::models::{FinancialSummary, PaybackStatus, RawAnalysis};
use std::fs;
use std::path::Path;
use tabled::Tabled;

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

/// Derive the financial summary from a saved analysis record
pub fn execute(args: FinanceArgs, config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let pricing = load_pricing(config)?;
    let raw = read_analysis(&args.input)?;
    let summary = derive_financials(&raw, &pricing);

    if output.is_json() {
        output.result(&summary)?;
    } else {
        print_summary(output, &summary, &pricing.currency);
    }

    Ok(())
}

/// Read an analysis record as returned by the solar service
pub(super) fn read_analysis(path: &Path) -> Result<RawAnalysis> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read analysis file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse analysis file {}", path.display()))
}

/// Human-readable rendition of a summary
pub(super) fn print_summary(output: &OutputWriter, summary: &FinancialSummary, currency: &str) {
    let money = |amount: f64| format!("{}{:.0}", currency, amount);

    let rows = vec![
        SummaryRow {
            metric: "Suitability",
            value: format!(
                "{} ({}/100)",
                summary.suitability.tier, summary.suitability.score
            ),
        },
        SummaryRow {
            metric: "Mean solar flux",
            value: flux_label(summary.mean_flux),
        },
        SummaryRow {
            metric: "System size",
            value: format!("{:.1} kWp", summary.capacity_kwp),
        },
        SummaryRow {
            metric: "Annual generation",
            value: format!("{:.0} kWh", summary.annual_energy_kwh),
        },
        SummaryRow {
            metric: "Installation cost",
            value: money(summary.cost.gross_cost),
        },
        SummaryRow {
            metric: "Grant",
            value: money(summary.cost.grant),
        },
        SummaryRow {
            metric: "Net cost",
            value: money(summary.cost.net_cost),
        },
        SummaryRow {
            metric: "Annual savings",
            value: money(summary.savings.total),
        },
        SummaryRow {
            metric: "Payback",
            value: payback_label(summary),
        },
        SummaryRow {
            metric: "CO₂ avoided per year",
            value: format!("{:.0} kg", summary.emissions.annual_kg),
        },
        SummaryRow {
            metric: "Data source",
            value: summary.data_source.label().to_string(),
        },
    ];

    output.section("Financial Summary");
    output.table(rows);

    if !summary.recommendations.is_empty() {
        output.section("Recommendations");
        for recommendation in &summary.recommendations {
            output.info(recommendation);
        }
    }

    if let Some(note) = &summary.note {
        output.kv("Note", note);
    }
}

fn flux_label(mean_flux: f64) -> String {
    format!("{:.0} kWh/kWp/yr", mean_flux)
}

fn payback_label(summary: &FinancialSummary) -> String {
    match summary.payback.status {
        PaybackStatus::Computed => format!("{:.1} years", summary.payback.years),
        PaybackStatus::NoSavings => "0 years (no savings)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solarmatch_core::PricingConfig;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_analysis_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"flux_stats": {{"mean": 1200.0}}, "estimated_capacity_kwp": 4.5}}"#
        )
        .unwrap();

        let raw = read_analysis(file.path()).unwrap();
        assert_eq!(raw.mean_flux(), 1200.0);
        assert_eq!(raw.reported_capacity(), Some(4.5));
    }

    #[test]
    fn test_read_analysis_rejects_garbage() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = read_analysis(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_labels_use_report_units() {
        assert_eq!(flux_label(1042.4), "1042 kWh/kWp/yr");

        let pricing = PricingConfig::default();
        let no_energy = RawAnalysis {
            estimated_capacity_kwp: Some(5.0),
            estimated_annual_energy_kwh: Some(0.0),
            ..Default::default()
        };
        let summary = derive_financials(&no_energy, &pricing);
        assert_eq!(payback_label(&summary), "0 years (no savings)");
    }
}
