//! Shared handler helpers.

use axum::response::Json;

use crate::models::{ApiResponse, ErrorResponse};

/// Result type of every handler. The success value is wrapped in
/// [`ApiResponse`].
pub type HandlerResult<T> = Result<Json<ApiResponse<T>>, ErrorResponse>;

/// Create a successful response with data.
pub fn ok<T: serde::Serialize>(data: T) -> HandlerResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

/// Create a successful response without data.
pub fn done() -> HandlerResult<()> {
    Ok(Json(ApiResponse::empty()))
}
