//! Startup configuration, baked into the image from `config.toml`

use crate::error::ConfigError;
use crate::types::NetworkCredential;
use embassy_time::Duration;
use serde::Deserialize;

const EMBEDDED_CONFIG: &str = include_str!("../../config.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct Configuration {
    pub calibration_factor: i32,
    #[serde(default)]
    pub gmt_offset_seconds: i32,
    #[serde(default = "default_screen_timeout")]
    pub screen_timeout_seconds: u32,
    pub nutrition_api_key: String,
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Priority order: first visible entry wins.
    #[serde(default, rename = "network")]
    pub networks: Vec<NetworkCredential>,
}

fn default_screen_timeout() -> u32 {
    60
}

impl Configuration {
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let mut config: Configuration = toml::from_str(source)?;
        if config.calibration_factor == 0 {
            return Err(ConfigError::ZeroCalibrationFactor);
        }
        if config
            .webhook_url
            .as_deref()
            .map_or(false, |url| url.trim().is_empty())
        {
            config.webhook_url = None;
        }
        Ok(config)
    }

    /// The configuration flashed with this firmware build.
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::from_toml(EMBEDDED_CONFIG)
    }

    pub fn screen_timeout(&self) -> Duration {
        Duration::from_secs(self.screen_timeout_seconds as u64)
    }
}
