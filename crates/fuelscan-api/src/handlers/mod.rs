//! HTTP handlers.

pub mod jobs;
pub mod queue;
pub mod results;

use axum::Json;

/// Liveness check.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
