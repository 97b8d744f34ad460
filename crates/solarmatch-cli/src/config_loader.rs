//! Configuration loading utilities for CLI commands

use anyhow::{Context, Result};
use solarmatch_core::config::{CliConfigOverrides, LayeredConfig};
use solarmatch_core::PricingConfig;
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "solarmatch.toml";

/// Resolve which config file to read, if any
pub fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            default.is_file().then_some(default)
        }
    }
}

/// Load layered configuration: defaults, file, environment, then CLI overrides
pub fn load_config(explicit: Option<&Path>, overrides: CliConfigOverrides) -> Result<LayeredConfig> {
    let mut config = LayeredConfig::with_defaults();

    if let Some(path) = config_path(explicit) {
        config = config
            .load_from_file(&path)
            .with_context(|| format!("Failed to load configuration file {}", path.display()))?;
    }

    let mut config = config.load_from_env();
    config
        .update_from_cli(overrides)
        .context("Invalid command-line option")?;
    Ok(config)
}

/// Pricing tables named by the configuration, or the built-in defaults
pub fn load_pricing(config: &LayeredConfig) -> Result<PricingConfig> {
    match &config.pricing_file.value {
        Some(path) => PricingConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load pricing tables from {}", path.display())),
        None => Ok(PricingConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solarmatch_core::config::ConfigSource;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_explicit_file_then_cli_override() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "radius_meters = 80.0\napi_base_url = \"http://file:9000\"").unwrap();

        let config = load_config(
            Some(file.path()),
            CliConfigOverrides {
                api_base_url: Some("http://cli:9000".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(config.api_base_url.value, "http://cli:9000");
        assert_eq!(config.api_base_url.source, ConfigSource::Cli);
        assert_eq!(config.radius_meters.value, 80.0);
        assert_eq!(config.radius_meters.source, ConfigSource::File);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = load_config(
            Some(Path::new("/definitely/not/here/solarmatch.toml")),
            CliConfigOverrides::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_negative_cli_radius_is_an_error() {
        let file = NamedTempFile::new().unwrap();
        let result = load_config(
            Some(file.path()),
            CliConfigOverrides {
                radius_meters: Some(-5.0),
                ..Default::default()
            },
        );

        let err = result.unwrap_err();
        assert!(format!("{:#}", err).contains("radius_meters"));
    }

    #[test]
    fn test_builtin_pricing_without_file() {
        let config = LayeredConfig::with_defaults();
        let pricing = load_pricing(&config).unwrap();
        assert_eq!(pricing, PricingConfig::default());
    }
}
