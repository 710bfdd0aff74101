//! Game configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// LED and scoring settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// LEDs on each buzzer strip
    #[serde(default = "default_led_count")]
    pub led_count: usize,

    /// Flashes shown after a verdict
    #[serde(default = "default_flash_count")]
    pub flash_count: u32,

    /// Flash on time (milliseconds)
    #[serde(default = "default_flash_on")]
    pub flash_on_ms: u64,

    /// Flash off time (milliseconds)
    #[serde(default = "default_flash_off")]
    pub flash_off_ms: u64,

    /// Point limit of the first team created
    #[serde(default = "default_point_limit")]
    pub default_point_limit: u32,
}

fn default_led_count() -> usize { 24 }
fn default_flash_count() -> u32 { 5 }
fn default_flash_on() -> u64 { 250 }
fn default_flash_off() -> u64 { 250 }
fn default_point_limit() -> u32 { 8 }

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            led_count: default_led_count(),
            flash_count: default_flash_count(),
            flash_on_ms: default_flash_on(),
            flash_off_ms: default_flash_off(),
            default_point_limit: default_point_limit(),
        }
    }
}

impl GameConfig {
    pub fn flash_on(&self) -> Duration {
        Duration::from_millis(self.flash_on_ms)
    }

    pub fn flash_off(&self) -> Duration {
        Duration::from_millis(self.flash_off_ms)
    }
}
