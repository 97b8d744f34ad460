use crate::error::{Result, SolarError};
use crate::models::HeatmapScheme;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Layered configuration for SolarMatch
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// Base URL of the upstream solar analysis service
    pub api_base_url: ConfigValue<String>,
    /// Imagery search radius around the coordinates
    pub radius_meters: ConfigValue<f64>,
    pub heatmap_scheme: ConfigValue<HeatmapScheme>,
    pub request_timeout_secs: ConfigValue<u64>,
    /// Optional TOML file overriding the default pricing tables
    pub pricing_file: ConfigValue<Option<PathBuf>>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            api_base_url: ConfigValue::new(
                "http://localhost:8000".to_string(),
                ConfigSource::Default,
            ),
            radius_meters: ConfigValue::new(50.0, ConfigSource::Default),
            heatmap_scheme: ConfigValue::new(HeatmapScheme::Hot, ConfigSource::Default),
            request_timeout_secs: ConfigValue::new(30, ConfigSource::Default),
            pricing_file: ConfigValue::new(None, ConfigSource::Default),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| SolarError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| SolarError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(url) = file_config.api_base_url {
            self.api_base_url.update(url, ConfigSource::File);
        }

        if let Some(radius) = file_config.radius_meters {
            self.radius_meters.update(validate_radius(radius)?, ConfigSource::File);
        }

        if let Some(scheme) = file_config.heatmap_scheme {
            self.heatmap_scheme.update(scheme, ConfigSource::File);
        }

        if let Some(timeout) = file_config.request_timeout_secs {
            self.request_timeout_secs.update(timeout, ConfigSource::File);
        }

        if let Some(pricing_file) = file_config.pricing_file {
            self.pricing_file.update(Some(pricing_file), ConfigSource::File);
        }

        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        // SOLARMATCH_API_URL
        if let Ok(url) = env::var("SOLARMATCH_API_URL") {
            self.api_base_url.update(url, ConfigSource::Environment);
        }

        // SOLARMATCH_RADIUS
        if let Ok(radius_str) = env::var("SOLARMATCH_RADIUS") {
            match radius_str.parse::<f64>().ok().and_then(|r| validate_radius(r).ok()) {
                Some(radius) => self.radius_meters.update(radius, ConfigSource::Environment),
                None => tracing::warn!(
                    "Invalid SOLARMATCH_RADIUS value '{}': expected a positive number of meters",
                    radius_str
                ),
            }
        }

        // SOLARMATCH_HEATMAP_SCHEME
        if let Ok(scheme_str) = env::var("SOLARMATCH_HEATMAP_SCHEME") {
            match scheme_str.parse::<HeatmapScheme>() {
                Ok(scheme) => self.heatmap_scheme.update(scheme, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid SOLARMATCH_HEATMAP_SCHEME value '{}': expected hot, viridis, plasma, or inferno",
                    scheme_str
                ),
            }
        }

        // SOLARMATCH_TIMEOUT_SECS
        if let Ok(timeout_str) = env::var("SOLARMATCH_TIMEOUT_SECS") {
            match timeout_str.parse::<u64>() {
                Ok(timeout) => self.request_timeout_secs.update(timeout, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid SOLARMATCH_TIMEOUT_SECS value '{}': expected whole seconds",
                    timeout_str
                ),
            }
        }

        // SOLARMATCH_PRICING_FILE
        if let Ok(path) = env::var("SOLARMATCH_PRICING_FILE") {
            self.pricing_file.update(Some(PathBuf::from(path)), ConfigSource::Environment);
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) -> Result<()> {
        if let Some(url) = overrides.api_base_url {
            self.api_base_url.update(url, ConfigSource::Cli);
        }

        if let Some(radius) = overrides.radius_meters {
            self.radius_meters.update(validate_radius(radius)?, ConfigSource::Cli);
        }

        if let Some(scheme) = overrides.heatmap_scheme {
            self.heatmap_scheme.update(scheme, ConfigSource::Cli);
        }

        if let Some(pricing_file) = overrides.pricing_file {
            self.pricing_file.update(Some(pricing_file), ConfigSource::Cli);
        }

        Ok(())
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert(
            "api_base_url".to_string(),
            (self.api_base_url.value.clone(), self.api_base_url.source),
        );

        map.insert(
            "radius_meters".to_string(),
            (format!("{} m", self.radius_meters.value), self.radius_meters.source),
        );

        map.insert(
            "heatmap_scheme".to_string(),
            (self.heatmap_scheme.value.to_string(), self.heatmap_scheme.source),
        );

        map.insert(
            "request_timeout_secs".to_string(),
            (format!("{}s", self.request_timeout_secs.value), self.request_timeout_secs.source),
        );

        map.insert(
            "pricing_file".to_string(),
            (
                self.pricing_file
                    .value
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "built-in".to_string()),
                self.pricing_file.source,
            ),
        );

        map
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    api_base_url: Option<String>,
    radius_meters: Option<f64>,
    heatmap_scheme: Option<HeatmapScheme>,
    request_timeout_secs: Option<u64>,
    pricing_file: Option<PathBuf>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub api_base_url: Option<String>,
    pub radius_meters: Option<f64>,
    pub heatmap_scheme: Option<HeatmapScheme>,
    pub pricing_file: Option<PathBuf>,
}

fn validate_radius(radius: f64) -> Result<f64> {
    if radius.is_finite() && radius > 0.0 {
        Ok(radius)
    } else {
        Err(SolarError::ConfigInvalid {
            key: "radius_meters".to_string(),
            reason: format!("Radius must be a positive number of meters, got {}", radius),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = LayeredConfig::with_defaults();
        assert_eq!(config.api_base_url.value, "http://localhost:8000");
        assert_eq!(config.api_base_url.source, ConfigSource::Default);
        assert_eq!(config.radius_meters.value, 50.0);
        assert_eq!(config.heatmap_scheme.value, HeatmapScheme::Hot);
        assert!(config.pricing_file.value.is_none());
    }

    #[test]
    fn test_config_precedence() {
        let mut value = ConfigValue::new(100, ConfigSource::Default);

        value.update(200, ConfigSource::File);
        assert_eq!(value.value, 200);
        assert_eq!(value.source, ConfigSource::File);

        value.update(300, ConfigSource::Environment);
        assert_eq!(value.value, 300);

        value.update(400, ConfigSource::Cli);
        assert_eq!(value.value, 400);
        assert_eq!(value.source, ConfigSource::Cli);

        // Lower precedence should not override
        value.update(500, ConfigSource::File);
        assert_eq!(value.value, 400);
        assert_eq!(value.source, ConfigSource::Cli);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
api_base_url = "https://solar.example.org"
radius_meters = 75.0
heatmap_scheme = "viridis"
pricing_file = "pricing/ie-2025.toml"
"#
        )
        .unwrap();

        let config = LayeredConfig::with_defaults().load_from_file(file.path()).unwrap();

        assert_eq!(config.api_base_url.value, "https://solar.example.org");
        assert_eq!(config.api_base_url.source, ConfigSource::File);
        assert_eq!(config.radius_meters.value, 75.0);
        assert_eq!(config.heatmap_scheme.value, HeatmapScheme::Viridis);
        assert_eq!(
            config.pricing_file.value,
            Some(PathBuf::from("pricing/ie-2025.toml"))
        );
        assert_eq!(config.request_timeout_secs.source, ConfigSource::Default);
    }

    #[test]
    fn test_file_rejects_negative_radius() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "radius_meters = -5.0").unwrap();

        assert!(LayeredConfig::with_defaults().load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_cli_rejects_invalid_radius() {
        for radius in [-5.0, 0.0, f64::NAN, f64::INFINITY] {
            let mut config = LayeredConfig::with_defaults();
            let result = config.update_from_cli(CliConfigOverrides {
                radius_meters: Some(radius),
                ..Default::default()
            });

            assert!(matches!(result, Err(SolarError::ConfigInvalid { .. })));
            assert_eq!(config.radius_meters.value, 50.0);
            assert_eq!(config.radius_meters.source, ConfigSource::Default);
        }
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = LayeredConfig::with_defaults();

        config.update_from_cli(CliConfigOverrides {
            radius_meters: Some(30.0),
            heatmap_scheme: Some(HeatmapScheme::Plasma),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(config.radius_meters.value, 30.0);
        assert_eq!(config.radius_meters.source, ConfigSource::Cli);
        assert_eq!(config.heatmap_scheme.value, HeatmapScheme::Plasma);
        assert_eq!(config.api_base_url.source, ConfigSource::Default);
    }

    #[test]
    fn test_inspection_map() {
        let config = LayeredConfig::with_defaults();
        let map = config.to_inspection_map();

        assert_eq!(map.len(), 5);
        let (pricing, source) = &map["pricing_file"];
        assert_eq!(pricing, "built-in");
        assert_eq!(*source, ConfigSource::Default);
    }
}
