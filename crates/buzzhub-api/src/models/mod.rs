//! Request and response models for the dashboard API.

use buzzhub_core::{Color, DeviceAddress};
use buzzhub_game::{GameState, Team};
use serde::{Deserialize, Serialize};

pub mod common;
pub mod error;

pub use common::{ApiResponse, ResponseMeta};
pub use error::{ApiResult, ErrorResponse};

// ============================================================================
// Status
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectedQuery {
    /// Ping the buzzers again instead of using the cached list
    #[serde(default)]
    pub no_cache: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectedResponse {
    pub connected: Vec<DeviceAddress>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateResponse {
    pub state: GameState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_under_review: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamsResponse {
    pub teams: Vec<Team>,
}

// ============================================================================
// Teams
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct MakeTeamRequest {
    pub team_name: String,
    pub primary_color: Color,
    pub secondary_color: Color,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PointLimitRequest {
    pub limit: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteTeamRequest {
    pub team_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeNameRequest {
    pub old_name: String,
    pub new_name: String,
}

/// Partial team update; absent fields are left unchanged.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTeamRequest {
    pub team_name: String,
    #[serde(default)]
    pub associated_buzzers: Option<Vec<DeviceAddress>>,
    #[serde(default)]
    pub point: Option<u32>,
    #[serde(default)]
    pub primary_color: Option<Color>,
    #[serde(default)]
    pub secondary_color: Option<Color>,
}

// ============================================================================
// Game
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WaitQuery {
    /// Hold the request until the press is resolved
    #[serde(default)]
    pub block: bool,
}
