//! JSON error responses.

use axum::Json;
use axum::http::StatusCode;
use serde_json::{Value, json};

pub type ApiError = (StatusCode, Json<Value>);
pub type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

/// `{"error": message}` with `status`.
pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

pub(crate) fn internal(context: &str, err: impl std::fmt::Display) -> ApiError {
    api_error(StatusCode::INTERNAL_SERVER_ERROR, format!("{context}: {err}"))
}
