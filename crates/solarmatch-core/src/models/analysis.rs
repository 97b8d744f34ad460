use serde::{Deserialize, Serialize};

/// Where the upstream analysis got its numbers from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Derived from high-resolution aerial imagery of the roof
    #[serde(alias = "Google Solar API")]
    HighResolution,

    /// Estimated from satellite radiation models (no roof imagery)
    #[default]
    #[serde(alias = "PVGIS")]
    Modeled,
}

impl DataSource {
    pub fn label(&self) -> &'static str {
        match self {
            DataSource::HighResolution => "High-resolution imagery",
            DataSource::Modeled => "Modeled radiation data",
        }
    }
}

/// Annual solar flux statistics (kWh/kWp/year)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FluxStats {
    #[serde(default)]
    pub mean: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub std: Option<f64>,
}

/// Recommended panel orientation for modeled locations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PanelConfig {
    pub tilt_angle: f64,
    pub azimuth: f64,
}

/// Raw analysis record supplied by the upstream solar service
///
/// One record is produced per coordinate query and is never modified
/// afterwards. Every numeric field except the mean flux may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAnalysis {
    #[serde(default)]
    pub flux_stats: FluxStats,

    pub estimated_roof_area_sq_meters: Option<f64>,

    pub usable_roof_area_sq_meters: Option<f64>,

    pub estimated_capacity_kwp: Option<f64>,

    pub estimated_annual_energy_kwh: Option<f64>,

    #[serde(default)]
    pub data_source: DataSource,

    #[serde(default)]
    pub has_imagery: bool,

    pub note: Option<String>,

    pub optimal_panel_config: Option<PanelConfig>,
}

/// Which roof-area field an area figure was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoofAreaSource {
    Usable,
    Estimated,
    Missing,
}

/// Roof area after applying the usable -> estimated -> zero fallback
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoofArea {
    pub sq_meters: f64,
    pub source: RoofAreaSource,
}

impl RawAnalysis {
    /// Mean flux, with negative and non-finite values treated as zero
    pub fn mean_flux(&self) -> f64 {
        non_negative(Some(self.flux_stats.mean))
    }

    /// Roof area using the fixed fallback order usable -> estimated -> zero
    pub fn roof_area(&self) -> RoofArea {
        if let Some(area) = positive(self.usable_roof_area_sq_meters) {
            return RoofArea {
                sq_meters: area,
                source: RoofAreaSource::Usable,
            };
        }
        if let Some(area) = positive(self.estimated_roof_area_sq_meters) {
            return RoofArea {
                sq_meters: area,
                source: RoofAreaSource::Estimated,
            };
        }
        RoofArea {
            sq_meters: 0.0,
            source: RoofAreaSource::Missing,
        }
    }

    /// Reported capacity, with negative values clamped to zero
    ///
    /// A reported zero means the roof has no usable area; only a missing or
    /// non-finite field yields `None`.
    pub fn reported_capacity(&self) -> Option<f64> {
        self.estimated_capacity_kwp
            .filter(|v| v.is_finite())
            .map(|v| v.max(0.0))
    }

    /// Reported annual energy if it is a usable non-negative number
    pub fn reported_energy(&self) -> Option<f64> {
        self.estimated_annual_energy_kwh.filter(|e| e.is_finite() && *e >= 0.0)
    }
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

fn non_negative(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite() && *v > 0.0).unwrap_or(0.0)
}
