//! Application configuration file.
//!
//! JSON, every section optional. The flat keys of the older
//! `backend-config.json` layout (`Service_UUID`, `Characteristic_UUID`,
//! `BT_target_name`, `Webpage.Bind`) are still accepted.

use std::path::Path;

use anyhow::{Context, Result};
use buzzhub_core::ProtocolConfig;
use buzzhub_game::GameConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub protocol: ProtocolConfig,

    #[serde(default)]
    pub game: GameConfig,

    #[serde(default, alias = "Webpage")]
    pub webpage: WebpageConfig,

    #[serde(default)]
    pub simulator: SimulatorConfig,

    #[serde(default, rename = "Service_UUID", skip_serializing)]
    legacy_service_uuid: Option<String>,

    #[serde(default, rename = "Characteristic_UUID", skip_serializing)]
    legacy_characteristic_uuid: Option<String>,

    #[serde(default, rename = "BT_target_name", skip_serializing)]
    legacy_target_name: Option<String>,
}

/// Dashboard listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebpageConfig {
    /// `host:port` addresses to listen on
    #[serde(default = "default_bind", alias = "Bind")]
    pub bind: Vec<String>,
}

fn default_bind() -> Vec<String> {
    vec!["127.0.0.1:8080".to_string()]
}

impl Default for WebpageConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Simulated buzzer network used as the link backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    #[serde(default = "default_buzzers")]
    pub buzzers: usize,

    /// LEDs per simulated strip; the game's `led_count` when unset
    #[serde(default)]
    pub led_count: Option<usize>,

    /// Press a buzzer every N seconds while serving, round robin
    #[serde(default)]
    pub press_interval_secs: Option<u64>,
}

fn default_buzzers() -> usize { 4 }

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            buzzers: default_buzzers(),
            led_count: None,
            press_interval_secs: None,
        }
    }
}

impl AppConfig {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let mut config: Self = serde_json::from_str(text)?;
        config.apply_legacy_keys();
        Ok(config)
    }

    /// LEDs per simulated strip.
    pub fn simulated_led_count(&self) -> usize {
        self.simulator.led_count.unwrap_or(self.game.led_count)
    }

    fn apply_legacy_keys(&mut self) {
        if let Some(uuid) = self.legacy_service_uuid.take() {
            self.protocol.service_uuid = uuid;
        }
        if let Some(uuid) = self.legacy_characteristic_uuid.take() {
            self.protocol.characteristic_uuid = uuid;
        }
        if let Some(name) = self.legacy_target_name.take() {
            self.protocol.target_name = name;
        }
    }
}
