//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;

use crate::error::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub collector: CollectorConfig,

    #[serde(default)]
    pub gps: GpsConfig,

    #[serde(default)]
    pub radio: RadioConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub record: RecordConfig,
}

/// Collector endpoint configuration
#[derive(Debug, Deserialize, Clone)]
pub struct CollectorConfig {
    #[serde(default = "default_scheme")]
    pub scheme: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_path")]
    pub path: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Local GPS receiver configuration
#[derive(Debug, Deserialize, Clone)]
pub struct GpsConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_gps_device_paths")]
    pub device_paths: Vec<String>,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// LoRa radio modem configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RadioConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_radio_device_paths")]
    pub device_paths: Vec<String>,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// Pipeline timing configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
}

/// Canonical record defaults
#[derive(Debug, Deserialize, Clone)]
pub struct RecordConfig {
    #[serde(default = "default_source_id")]
    pub default_source_id: String,

    #[serde(default = "default_signal_strength")]
    pub default_signal_strength: i32,
}

// Default value functions
fn default_scheme() -> String { "http".to_string() }
fn default_host() -> String { "192.168.1.100".to_string() }
fn default_port() -> u16 { 3000 }
fn default_path() -> String { "/api/bus-location".to_string() }
fn default_timeout_secs() -> u64 { 5 }

fn default_enabled() -> bool { true }
fn default_baud_rate() -> u32 { 9600 }

fn default_gps_device_paths() -> Vec<String> {
    vec![
        "/dev/ttyAMA0".to_string(), // Pi GPIO UART, the usual GPS hat wiring
        "/dev/ttyACM0".to_string(),
        "/dev/ttyUSB0".to_string(),
    ]
}

fn default_radio_device_paths() -> Vec<String> {
    vec![
        "/dev/ttyUSB0".to_string(), // USB-to-serial LoRa modems
        "/dev/ttyUSB1".to_string(),
        "/dev/ttyUSB2".to_string(),
        "/dev/ttyACM0".to_string(),
        "/dev/ttyACM1".to_string(),
        "/dev/ttyS0".to_string(), // GPIO serial pins
    ]
}

fn default_poll_interval_ms() -> u64 { 100 }
fn default_refresh_interval_ms() -> u64 { 1000 }

fn default_source_id() -> String { "BUS001".to_string() }
fn default_signal_strength() -> i32 { -1 }

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            host: default_host(),
            port: default_port(),
            path: default_path(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for GpsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            device_paths: default_gps_device_paths(),
            baud_rate: default_baud_rate(),
        }
    }
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            device_paths: default_radio_device_paths(),
            baud_rate: default_baud_rate(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            refresh_interval_ms: default_refresh_interval_ms(),
        }
    }
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            default_source_id: default_source_id(),
            default_signal_strength: default_signal_strength(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            collector: CollectorConfig::default(),
            gps: GpsConfig::default(),
            radio: RadioConfig::default(),
            pipeline: PipelineConfig::default(),
            record: RecordConfig::default(),
        }
    }
}

impl CollectorConfig {
    /// Full endpoint URL, e.g. `http://192.168.1.100:3000/api/bus-location`
    pub fn url(&self) -> String {
        format!("{}://{}:{}{}", self.scheme, self.host, self.port, self.path)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path` if it exists, built-in defaults otherwise
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.collector.scheme != "http" && self.collector.scheme != "https" {
            return Err(crate::error::GpsBridgeError::Config(
                toml::de::Error::custom("collector scheme must be http or https")
            ));
        }

        if self.collector.host.is_empty() {
            return Err(crate::error::GpsBridgeError::Config(
                toml::de::Error::custom("collector host cannot be empty")
            ));
        }

        if self.collector.port == 0 {
            return Err(crate::error::GpsBridgeError::Config(
                toml::de::Error::custom("collector port cannot be 0")
            ));
        }

        if !self.collector.path.starts_with('/') {
            return Err(crate::error::GpsBridgeError::Config(
                toml::de::Error::custom("collector path must start with '/'")
            ));
        }

        if self.collector.timeout_secs == 0 || self.collector.timeout_secs > 60 {
            return Err(crate::error::GpsBridgeError::Config(
                toml::de::Error::custom("timeout_secs must be between 1 and 60")
            ));
        }

        if !self.gps.enabled && !self.radio.enabled {
            return Err(crate::error::GpsBridgeError::Config(
                toml::de::Error::custom("at least one source (gps or radio) must be enabled")
            ));
        }

        if self.gps.enabled && self.gps.device_paths.is_empty() {
            return Err(crate::error::GpsBridgeError::Config(
                toml::de::Error::custom("gps device_paths cannot be empty when enabled")
            ));
        }

        if self.radio.enabled && self.radio.device_paths.is_empty() {
            return Err(crate::error::GpsBridgeError::Config(
                toml::de::Error::custom("radio device_paths cannot be empty when enabled")
            ));
        }

        for (name, baud) in [("gps", self.gps.baud_rate), ("radio", self.radio.baud_rate)] {
            if ![4800, 9600, 19200, 38400, 57600, 115200].contains(&baud) {
                return Err(crate::error::GpsBridgeError::Config(
                    toml::de::Error::custom(format!(
                        "{} baud_rate must be one of: 4800, 9600, 19200, 38400, 57600, 115200",
                        name
                    ))
                ));
            }
        }

        if self.pipeline.poll_interval_ms == 0 || self.pipeline.poll_interval_ms > 60000 {
            return Err(crate::error::GpsBridgeError::Config(
                toml::de::Error::custom("poll_interval_ms must be between 1 and 60000")
            ));
        }

        if self.pipeline.refresh_interval_ms == 0 || self.pipeline.refresh_interval_ms > 600000 {
            return Err(crate::error::GpsBridgeError::Config(
                toml::de::Error::custom("refresh_interval_ms must be between 1 and 600000")
            ));
        }

        if self.record.default_source_id.is_empty() {
            return Err(crate::error::GpsBridgeError::Config(
                toml::de::Error::custom("default_source_id cannot be empty")
            ));
        }

        // 0 is a measurable signal value; the unknown sentinel must stay apart
        if self.record.default_signal_strength == 0 {
            return Err(crate::error::GpsBridgeError::Config(
                toml::de::Error::custom("default_signal_strength must not be 0")
            ));
        }

        Ok(())
    }
}
