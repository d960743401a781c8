//! Station configuration
//!
//! What the original firmware carried as compile-time constants: call
//! sign, beacon position and comment, beacon interval, forward timeout,
//! radio frequency, and (for the igate variant) the APRS-IS gateway
//! endpoint. Loadable from a JSON file, overridable field by field.

use crate::beacon::StationKind;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// APRS-IS gateway endpoint (uplink variant only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IgateConfig {
    /// APRS-IS server host
    pub host: String,
    /// APRS-IS server port
    #[serde(default = "default_igate_port")]
    pub port: u16,
    /// Login passcode for the station call sign
    pub passcode: i16,
}

fn default_igate_port() -> u16 {
    14580
}

/// Digipeater station configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigiConfig {
    /// Station call sign (with SSID), also the repeater identity
    pub callsign: String,
    /// Beacon latitude in decimal degrees
    pub latitude: f64,
    /// Beacon longitude in decimal degrees
    pub longitude: f64,
    /// Free-text beacon comment
    pub comment: String,
    /// Station kind, selects the beacon symbol
    pub kind: StationKind,
    /// Beacon interval in minutes
    pub beacon_interval_mins: u64,
    /// Duplicate-suppression window in minutes
    pub forward_timeout_mins: u64,
    /// Radio frequency in Hz (handed to the radio transport)
    pub frequency_hz: u64,
    /// APRS-IS uplink; None for radio-only stations
    pub igate: Option<IgateConfig>,
}

impl Default for DigiConfig {
    fn default() -> Self {
        Self {
            callsign: "N0CALL".to_string(),
            latitude: 0.0,
            longitude: 0.0,
            comment: "LoRa APRS Digi".to_string(),
            kind: StationKind::Relay,
            beacon_interval_mins: 15,
            forward_timeout_mins: 5,
            frequency_hz: 433_775_000,
            igate: None,
        }
    }
}

impl DigiConfig {
    /// Load from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: DigiConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration is usable on air.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.callsign.is_empty() || self.callsign == "N0CALL" {
            return Err(ConfigError::Invalid(
                "callsign must be set to your own call sign".to_string(),
            ));
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ConfigError::Invalid(format!(
                "latitude {} out of range",
                self.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ConfigError::Invalid(format!(
                "longitude {} out of range",
                self.longitude
            )));
        }
        if self.beacon_interval_mins == 0 {
            return Err(ConfigError::Invalid(
                "beacon interval must be at least one minute".to_string(),
            ));
        }
        if self.forward_timeout_mins == 0 {
            return Err(ConfigError::Invalid(
                "forward timeout must be at least one minute".to_string(),
            ));
        }
        Ok(())
    }
}
