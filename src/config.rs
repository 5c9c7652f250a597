use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::WatchmapError;
use crate::logging::LogConfig;
use crate::models::Metric;
use crate::zones::ZoneCalculator;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Zone and marker-cadence parameters
    pub analysis: AnalysisSettings,

    /// Marker geometry for map layers
    pub encoding: EncodingSettings,

    /// Display metadata per metric
    pub metrics: MetricCatalog,

    pub logging: LogConfig,
}

/// Parameters consumed by the analytics stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Athlete age in years, drives the estimated max heart rate
    pub age: u8,

    /// Resting heart rate in bpm
    pub resting_heart_rate: u16,

    /// Seconds of elapsed time between mean heart-rate labels
    pub zone_aggregation_interval: f64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            age: 45,
            resting_heart_rate: 50,
            zone_aggregation_interval: 30.0,
        }
    }
}

/// Marker geometry settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingSettings {
    /// Radius of a marker whose normalized value is 0
    pub base_radius: f64,

    /// Extra radius at normalized value 1
    pub radius_scale: f64,

    /// Radius floor so no marker becomes invisible
    pub min_radius: f64,

    pub fill_opacity: f64,

    /// Visualization-only stand-in for a speed of exactly 0
    pub zero_speed_floor: f64,
}

impl Default for EncodingSettings {
    fn default() -> Self {
        Self {
            base_radius: 10.0,
            radius_scale: 1.5,
            min_radius: 1.0,
            fill_opacity: 0.2,
            zero_speed_floor: 0.01,
        }
    }
}

/// How a metric is presented
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricStyle {
    /// CSS color used for chart series
    pub color: String,
    pub display_name: String,
    pub unit: String,
}

impl MetricStyle {
    fn new(color: &str, display_name: &str, unit: &str) -> Self {
        Self {
            color: color.to_string(),
            display_name: display_name.to_string(),
            unit: unit.to_string(),
        }
    }

    /// Hover label, e.g. "Speed (km/h)"
    pub fn label(&self) -> String {
        format!("{} ({})", self.display_name, self.unit)
    }
}

/// Display metadata for the metrics that get layers and chart series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricCatalog {
    pub altitude: MetricStyle,
    pub heart_rate: MetricStyle,
    pub speed: MetricStyle,
}

impl Default for MetricCatalog {
    fn default() -> Self {
        Self {
            altitude: MetricStyle::new("rgb(200, 155, 155)", "Altitude", "m"),
            heart_rate: MetricStyle::new("rgb(255, 50, 50)", "Heart rate", "bpm"),
            speed: MetricStyle::new("rgb(0, 0, 109)", "Speed", "km/h"),
        }
    }
}

impl MetricCatalog {
    /// Style for a displayable metric; distance has none
    pub fn style(&self, metric: Metric) -> Option<&MetricStyle> {
        match metric {
            Metric::Altitude => Some(&self.altitude),
            Metric::HeartRate => Some(&self.heart_rate),
            Metric::Speed => Some(&self.speed),
            Metric::Distance => None,
        }
    }
}

/// Configuration management implementation
impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("watchmap")
            .join("config.toml")
    }

    /// Load from the default location, falling back to defaults when absent
    pub fn load_or_default() -> Result<Self> {
        let path = Self::default_config_path();
        if path.exists() {
            Self::load_from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Reject values the analytics and encoder cannot work with
    pub fn validate(&self) -> std::result::Result<(), WatchmapError> {
        let analysis = &self.analysis;
        ZoneCalculator::karvonen_zones(analysis.age, analysis.resting_heart_rate)
            .map_err(|e| WatchmapError::Configuration(e.to_string()))?;

        if !(analysis.zone_aggregation_interval.is_finite() && analysis.zone_aggregation_interval > 0.0)
        {
            return Err(WatchmapError::Configuration(format!(
                "zone_aggregation_interval must be positive, got {}",
                analysis.zone_aggregation_interval
            )));
        }

        let encoding = &self.encoding;
        let positive = [
            ("base_radius", encoding.base_radius),
            ("min_radius", encoding.min_radius),
            ("zero_speed_floor", encoding.zero_speed_floor),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(WatchmapError::Configuration(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if !(encoding.radius_scale.is_finite() && encoding.radius_scale >= 0.0) {
            return Err(WatchmapError::Configuration(format!(
                "radius_scale must not be negative, got {}",
                encoding.radius_scale
            )));
        }
        if !(0.0..=1.0).contains(&encoding.fill_opacity) {
            return Err(WatchmapError::Configuration(format!(
                "fill_opacity must be within 0..=1, got {}",
                encoding.fill_opacity
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.analysis.age, 45);
        assert_eq!(config.analysis.resting_heart_rate, 50);
        assert_eq!(config.analysis.zone_aggregation_interval, 30.0);
        assert_eq!(config.encoding.zero_speed_floor, 0.01);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_metric_catalog() {
        let catalog = MetricCatalog::default();
        assert_eq!(catalog.style(Metric::Speed).unwrap().label(), "Speed (km/h)");
        assert_eq!(catalog.style(Metric::HeartRate).unwrap().color, "rgb(255, 50, 50)");
        assert!(catalog.style(Metric::Distance).is_none());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [analysis]
            age = 30

            [metrics.speed]
            color = "rgb(1, 2, 3)"
            display_name = "Pace"
            unit = "km/h"
            "#,
        )
        .unwrap();

        assert_eq!(config.analysis.age, 30);
        assert_eq!(config.analysis.resting_heart_rate, 50);
        assert_eq!(config.metrics.speed.display_name, "Pace");
        assert_eq!(config.metrics.altitude.display_name, "Altitude");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.analysis.resting_heart_rate = 200;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.analysis.zone_aggregation_interval = 0.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.encoding.fill_opacity = 1.5;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.encoding.radius_scale = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_file_io() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.analysis.age = 38;
        config.save_to_file(&path).unwrap();

        let loaded = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
