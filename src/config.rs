//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the vlille-config.toml file.
//! It provides a centralized way to configure the open-data endpoints, polling,
//! and marker styling overrides.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

use crate::marker::MarkerTheme;
use crate::station_config::{
    merge_colors, merge_sizes, merge_thresholds, ColorOverrides, MarkerSize, SizeOverrides,
    ThresholdOverrides,
};

pub const DEFAULT_CONFIG_PATH: &str = "vlille-config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config IO: {0}")]
    Io(#[from] io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config serialization: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Application configuration loaded from vlille-config.toml
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Open-data and geocoder endpoints
    #[serde(default)]
    pub api: ApiConfig,
    /// Marker size and styling overrides
    #[serde(default)]
    pub marker: MarkerConfig,
}

/// Endpoints and network settings
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base address of the GBFS feeds
    pub base_url: String,
    /// Base address of the Nominatim geocoder
    pub nominatim_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Delay between two station refreshes in watch mode
    pub poll_interval_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://media.ilevia.fr/opendata".to_string(),
            nominatim_url: "https://nominatim.openstreetmap.org".to_string(),
            timeout_secs: 10,
            poll_interval_secs: 60,
        }
    }
}

/// Marker styling. Override tables only list the keys they change.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MarkerConfig {
    pub size: MarkerSize,
    pub thresholds: ThresholdOverrides,
    pub colors: ColorOverrides,
    pub sizes: SizeOverrides,
}

impl Config {
    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        match Self::try_load_from_path(&path) {
            Ok(config) => {
                log::info!("loaded configuration from {}", path.as_ref().display());
                config
            }
            Err(ConfigError::Io(_)) => {
                log::info!("no config file found, using default configuration");
                Self::default()
            }
            Err(e) => {
                log::warn!("{e}; using default configuration");
                Self::default()
            }
        }
    }

    pub fn try_load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Save current configuration to the given path
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(&path, contents)?;
        log::info!("configuration saved to {}", path.as_ref().display());
        Ok(())
    }

    /// Marker theme with every override merged over the defaults.
    pub fn theme(&self) -> MarkerTheme {
        MarkerTheme {
            thresholds: merge_thresholds(&self.marker.thresholds),
            colors: merge_colors(&self.marker.colors),
            sizes: merge_sizes(&self.marker.sizes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "https://media.ilevia.fr/opendata");
        assert_eq!(config.api.poll_interval_secs, 60);
        assert_eq!(config.marker.size, MarkerSize::Medium);
        assert_eq!(config.theme(), MarkerTheme::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let toml_str = r##"
            [marker]
            size = "large"

            [marker.thresholds]
            low = 2

            [marker.colors]
            good = "#00FF00"

            [marker.sizes.small]
            diameter = 30
        "##;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api.timeout_secs, 10);
        assert_eq!(config.marker.size, MarkerSize::Large);

        let theme = config.theme();
        assert_eq!(theme.thresholds.low, 2);
        assert_eq!(theme.thresholds.medium, 3);
        assert_eq!(theme.colors.good, "#00FF00");
        assert_eq!(theme.colors.low, "#F97316");
        assert_eq!(theme.sizes.small.diameter, 30);
        assert_eq!(theme.sizes.small.font_size, 12);
        assert_eq!(theme.sizes.large.diameter, 48);
    }

    #[test]
    fn test_save_and_reload() {
        let file = NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.api.poll_interval_secs = 30;
        config.marker.thresholds.good = Some(8);
        config.save(file.path()).unwrap();

        let loaded = Config::try_load_from_path(file.path()).unwrap();
        assert_eq!(loaded.api.poll_interval_secs, 30);
        assert_eq!(loaded.marker.thresholds.good, Some(8));
    }

    #[test]
    fn test_invalid_file_is_an_error_but_load_falls_back() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "api = 12").unwrap();

        assert!(matches!(
            Config::try_load_from_path(file.path()),
            Err(ConfigError::Parse(_))
        ));
        let config = Config::load_from_path(file.path());
        assert_eq!(config.api.timeout_secs, 10);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let config = Config::load_from_path("/nonexistent/path");
        assert_eq!(config.api.nominatim_url, "https://nominatim.openstreetmap.org");
    }
}
