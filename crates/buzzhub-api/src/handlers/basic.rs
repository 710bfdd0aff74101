//! Health check handlers.

use axum::{extract::State, Json};
use buzzhub_core::ConnectionStatus;
use serde::Serialize;
use serde_json::json;

use super::ServerState;

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
    pub version: &'static str,
    pub uptime: u64,
    pub link: ConnectionStatus,
}

/// Basic health check handler.
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "buzzhub",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Detailed health check with uptime and link status.
pub async fn health_status_handler(State(state): State<ServerState>) -> Json<HealthStatus> {
    let uptime = chrono::Utc::now().timestamp() - state.started_at;
    let link = state.transport().status();

    Json(HealthStatus {
        status: if link == ConnectionStatus::Connected {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        service: "buzzhub".to_string(),
        version: env!("CARGO_PKG_VERSION"),
        uptime: uptime.max(0) as u64,
        link,
    })
}
