//! API error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Error returned by handlers, rendered as `{"error": message}`.
#[derive(Debug)]
pub enum ApiError {
    Database(fuelscan_core::Error),
    NotFound(String),
    BadRequest(String),
    Conflict(String),
}

impl From<fuelscan_core::Error> for ApiError {
    fn from(err: fuelscan_core::Error) -> Self {
        match err {
            fuelscan_core::Error::NotFound(msg) => ApiError::NotFound(msg),
            fuelscan_core::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            fuelscan_core::Error::Conflict(msg) => ApiError::Conflict(msg),
            other => ApiError::Database(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Database(err) => {
                tracing::error!(subsystem = "api", error = %err, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
