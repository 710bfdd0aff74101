//! Protocol engine configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Link and protocol timing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Advertised name of the gateway device to connect to
    #[serde(default = "default_target_name")]
    pub target_name: String,

    /// Service identifier handed to the link backend
    #[serde(default = "default_service_uuid")]
    pub service_uuid: String,

    /// Characteristic identifier handed to the link backend
    #[serde(default = "default_characteristic_uuid")]
    pub characteristic_uuid: String,

    /// How long discovery scans (seconds)
    #[serde(default = "default_discovery_timeout")]
    pub discovery_timeout_secs: u64,

    /// How long received packets stay queryable (seconds)
    #[serde(default = "default_correlation_horizon")]
    pub correlation_horizon_secs: u64,

    /// Reply window for request verbs (milliseconds)
    #[serde(default = "default_response_timeout")]
    pub response_timeout_ms: u64,

    /// Press burst debounce window (milliseconds)
    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,

    /// Lifetime of the connected-device cache (seconds)
    #[serde(default = "default_connected_cache")]
    pub connected_cache_secs: u64,
}

fn default_target_name() -> String {
    "BUZZERS-INSAGORA".to_string()
}
fn default_service_uuid() -> String {
    "0a46dcd2-5dcd-4177-b03d-642d8058ed6a".to_string()
}
fn default_characteristic_uuid() -> String {
    "bb651b13-47ff-4cd5-a3bc-6eb184a5a7b1".to_string()
}
fn default_discovery_timeout() -> u64 { 5 }
fn default_correlation_horizon() -> u64 { 60 }
fn default_response_timeout() -> u64 { 750 }
fn default_debounce() -> u64 { 150 }
fn default_connected_cache() -> u64 { 10 }

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            target_name: default_target_name(),
            service_uuid: default_service_uuid(),
            characteristic_uuid: default_characteristic_uuid(),
            discovery_timeout_secs: default_discovery_timeout(),
            correlation_horizon_secs: default_correlation_horizon(),
            response_timeout_ms: default_response_timeout(),
            debounce_ms: default_debounce(),
            connected_cache_secs: default_connected_cache(),
        }
    }
}

impl ProtocolConfig {
    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.discovery_timeout_secs)
    }

    pub fn correlation_horizon(&self) -> Duration {
        Duration::from_secs(self.correlation_horizon_secs)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn connected_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.connected_cache_secs)
    }
}
