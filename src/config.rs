//! Driver configuration file
//!
//! ```toml
//! [device]
//! path = "/dev/hidraw3"
//! rows = 5
//! cols = 15
//! layers = 4
//!
//! [transport]
//! retries = 20
//! read_timeout_ms = 500
//!
//! [switch]
//! travel_options = [320, 340, 350, 380, 390]
//! ```
//!
//! Every key is optional. Travel options are hundredths of a millimetre.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;
use vial_hall_effect::{MatrixGeometry, SwitchOptions};
use vial_transport::protocol::timing;

/// Looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "he_driver.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub transport: TransportConfig,
    pub switch: SwitchConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// hidraw node of the keyboard's raw HID interface
    pub path: Option<String>,
    pub rows: u8,
    pub cols: u8,
    pub layers: u8,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            path: None,
            rows: 5,
            cols: 15,
            layers: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Attempts per exchange
    pub retries: usize,
    pub read_timeout_ms: i32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            retries: timing::QUERY_RETRIES,
            read_timeout_ms: timing::READ_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SwitchConfig {
    pub travel_options: Option<SwitchOptions>,
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("parse TOML config")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("in {}", path.display()))
    }

    /// Load `explicit`, else `he_driver.toml` if present, else defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
        if fallback.is_file() {
            debug!("Using {}", fallback.display());
            return Self::from_file(&fallback);
        }
        Ok(Self::default())
    }

    /// Apply command-line overrides
    pub fn with_device_path(mut self, path: Option<String>) -> Self {
        if path.is_some() {
            self.device.path = path;
        }
        self
    }

    pub fn geometry(&self) -> MatrixGeometry {
        MatrixGeometry::new(self.device.rows, self.device.cols, self.device.layers)
    }

    pub fn switch_options(&self) -> SwitchOptions {
        self.switch.travel_options.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vial_hall_effect::TravelDistance;

    #[test]
    fn test_empty_config_is_default() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.transport.retries, 20);
        assert_eq!(config.geometry(), MatrixGeometry::new(5, 15, 4));
        assert_eq!(config.switch_options(), SwitchOptions::default());
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_toml_str(
            r#"
            [device]
            path = "/dev/hidraw7"
            rows = 6
            cols = 17
            layers = 8

            [transport]
            retries = 5
            read_timeout_ms = 250

            [switch]
            travel_options = [350, 400]
            "#,
        )
        .unwrap();
        assert_eq!(config.device.path.as_deref(), Some("/dev/hidraw7"));
        assert_eq!(config.geometry(), MatrixGeometry::new(6, 17, 8));
        assert_eq!(config.transport.retries, 5);
        assert_eq!(config.transport.read_timeout_ms, 250);
        let options = config.switch_options();
        assert_eq!(options.len(), 2);
        assert_eq!(options.travel(1), Some(TravelDistance::from_hundredths(400)));
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let config = Config::from_toml_str("[device]\nrows = 4\n").unwrap();
        assert_eq!(config.device.rows, 4);
        assert_eq!(config.device.cols, 15);
        assert_eq!(config.device.path, None);
    }

    #[test]
    fn test_invalid_travel_options() {
        assert!(Config::from_toml_str("[switch]\ntravel_options = []\n").is_err());
        assert!(Config::from_toml_str("[device]\nrows = 300\n").is_err());
    }

    #[test]
    fn test_device_override() {
        let config = Config::from_toml_str("[device]\npath = \"/dev/hidraw1\"\n").unwrap();
        let kept = config.clone().with_device_path(None);
        assert_eq!(kept.device.path.as_deref(), Some("/dev/hidraw1"));
        let replaced = config.with_device_path(Some("/dev/hidraw2".into()));
        assert_eq!(replaced.device.path.as_deref(), Some("/dev/hidraw2"));
    }
}
