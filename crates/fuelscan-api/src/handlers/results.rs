//! Parsed result endpoints.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use fuelscan_core::{ParsedResult, ResultPatch, ReviewCheck};

use crate::csv_export::{export_file_name, rows_to_csv};
use crate::{ApiError, AppState};

async fn load(state: &AppState, id: Uuid) -> Result<ParsedResult, ApiError> {
    state
        .results
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Result {id} not found")))
}

/// List every parsed result, newest first.
pub async fn list_results(
    State(state): State<AppState>,
) -> Result<Json<Vec<ParsedResult>>, ApiError> {
    Ok(Json(state.results.list().await?))
}

pub async fn get_result(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ParsedResult>, ApiError> {
    Ok(Json(load(&state, id).await?))
}

/// Apply reviewer corrections to a result.
///
/// Only `notes`, `element_number` and `rows` are editable; other keys in
/// the body are ignored.
///
/// # Returns
/// - 200 OK with `{ "success": true }`
/// - 400 Bad Request with `No valid fields to update`
/// - 404 Not Found if the result doesn't exist
pub async fn update_result(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<ResultPatch>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.results.update_review(id, &patch).await? {
        return Err(ApiError::NotFound(format!("Result {id} not found")));
    }

    info!(
        subsystem = "api",
        op = "update_review",
        result_id = %id,
        notes = patch.notes.is_some(),
        element_number = patch.element_number.is_some(),
        rows = patch.rows.as_ref().map(Vec::len),
        "Result updated"
    );
    Ok(Json(json!({ "success": true })))
}

/// Record or withdraw a reviewer's sign-off.
///
/// # Returns
/// - 200 OK with `{ "success": true, "checked_by": [...] }`
/// - 400 Bad Request if `reviewer` is blank
/// - 404 Not Found if the result doesn't exist
pub async fn set_check(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(check): Json<ReviewCheck>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let checked_by = state
        .results
        .set_check(id, &check)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Result {id} not found")))?;

    info!(
        subsystem = "api",
        op = "set_check",
        result_id = %id,
        reviewer = %check.reviewer.trim(),
        checked = check.checked,
        "Review sign-off updated"
    );
    Ok(Json(json!({ "success": true, "checked_by": checked_by })))
}

/// Download a result's rows as CSV.
pub async fn export_csv(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let result = load(&state, id).await?;
    let body = rows_to_csv(&result.rows)?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export_file_name(&result.element_number, &result.file_name)
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}
