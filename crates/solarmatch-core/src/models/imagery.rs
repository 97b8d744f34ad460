use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SolarError;

/// Colour map used by the upstream service to render the flux heatmap
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeatmapScheme {
    #[default]
    Hot,
    Viridis,
    Plasma,
    Inferno,
}

impl HeatmapScheme {
    /// Name understood by the heatmap endpoint
    pub fn as_str(&self) -> &'static str {
        match self {
            HeatmapScheme::Hot => "hot",
            HeatmapScheme::Viridis => "viridis",
            HeatmapScheme::Plasma => "plasma",
            HeatmapScheme::Inferno => "inferno",
        }
    }
}

impl fmt::Display for HeatmapScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HeatmapScheme {
    type Err = SolarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hot" => Ok(HeatmapScheme::Hot),
            "viridis" => Ok(HeatmapScheme::Viridis),
            "plasma" => Ok(HeatmapScheme::Plasma),
            "inferno" => Ok(HeatmapScheme::Inferno),
            _ => Err(SolarError::ConfigInvalid {
                key: "heatmap_scheme".to_string(),
                reason: format!("Invalid heatmap scheme: {}. Use hot, viridis, plasma, or inferno", s),
            }),
        }
    }
}
