//! Unified error handling for the API.

use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use buzzhub_core::{FormatError, LinkError};
use buzzhub_game::{GameError, RosterError};
use serde::{Deserialize, Serialize};

/// API error response with its HTTP status code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// HTTP status code.
    #[serde(skip)]
    pub status: StatusCode,
    /// Optional request ID for tracing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>, status: StatusCode) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            status,
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: String) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Bad request (400).
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message, StatusCode::BAD_REQUEST)
    }

    /// Not found (404).
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message, StatusCode::NOT_FOUND)
    }

    /// Conflict (409).
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message, StatusCode::CONFLICT)
    }

    /// Internal server error (500).
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message, StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Service unavailable (503).
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(
            "SERVICE_UNAVAILABLE",
            message,
            StatusCode::SERVICE_UNAVAILABLE,
        )
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = serde_json::json!({
            "success": false,
            "error": {
                "code": self.code,
                "message": self.message,
                "request_id": self.request_id,
            }
        });
        (status, axum::Json(body)).into_response()
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ErrorResponse {}

impl From<anyhow::Error> for ErrorResponse {
    fn from(e: anyhow::Error) -> Self {
        Self::internal(e.to_string())
    }
}

impl From<FormatError> for ErrorResponse {
    fn from(e: FormatError) -> Self {
        Self::bad_request(e.to_string())
    }
}

impl From<LinkError> for ErrorResponse {
    fn from(e: LinkError) -> Self {
        match e {
            LinkError::Format(e) => e.into(),
            LinkError::NotConnected | LinkError::Disconnected | LinkError::TargetNotFound(_) => {
                Self::service_unavailable(e.to_string())
            }
            _ => Self::internal(e.to_string()),
        }
    }
}

impl From<RosterError> for ErrorResponse {
    fn from(e: RosterError) -> Self {
        match e {
            RosterError::TeamNotFound(_) => Self::not_found(e.to_string()),
            RosterError::TeamExists(_) | RosterError::AddressTaken { .. } => {
                Self::conflict(e.to_string())
            }
            _ => Self::bad_request(e.to_string()),
        }
    }
}

impl From<GameError> for ErrorResponse {
    fn from(e: GameError) -> Self {
        match e {
            GameError::AlreadyWaiting => Self::conflict(e.to_string()),
            GameError::Roster(e) => e.into(),
            GameError::Link(e) => e.into(),
            GameError::Press(e) => Self::internal(e.to_string()),
        }
    }
}

/// Result type alias for API helpers.
pub type ApiResult<T> = Result<T, ErrorResponse>;
