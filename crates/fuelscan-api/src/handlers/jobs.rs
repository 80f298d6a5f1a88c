//! Job enqueue and inspection endpoints.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use fuelscan_core::defaults::PAGE_LIMIT;
use fuelscan_core::{EnqueueRequest, Job, QueueStats};

use crate::{ApiError, AppState};

/// Request body for enqueueing an image.
///
/// Both fields are optional at the serde level so a missing field yields the
/// same 400 as a blank one.
#[derive(Debug, Deserialize)]
pub struct EnqueueBody {
    pub file_name: Option<String>,
    pub image_url: Option<String>,
}

/// Query parameters for listing jobs.
#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    pub limit: Option<i64>,
}

/// Queue an image for extraction.
///
/// # Returns
/// - 200 OK with `{ "id", "status" }`
/// - 400 Bad Request if `file_name` or `image_url` is missing
/// - 409 Conflict with `{ "error": "File already exists", "existing_job_id", "status" }`
///   when a job for the file exists
/// - 409 Conflict with `{ "reason": "ALREADY_PARSED", "parsed_file_id" }` when the
///   file already has a result
pub async fn enqueue_job(
    State(state): State<AppState>,
    Json(body): Json<EnqueueBody>,
) -> Result<Response, ApiError> {
    let request = EnqueueRequest {
        file_name: body.file_name.unwrap_or_default().trim().to_string(),
        image_url: body.image_url.unwrap_or_default().trim().to_string(),
    };
    request.validate()?;

    if let Some(existing) = state.jobs.find_by_file_name(&request.file_name).await? {
        return Ok((
            StatusCode::CONFLICT,
            Json(json!({
                "error": "File already exists",
                "existing_job_id": existing.id,
                "status": existing.status,
            })),
        )
            .into_response());
    }

    if let Some(parsed) = state.results.find_by_file_name(&request.file_name).await? {
        return Ok((
            StatusCode::CONFLICT,
            Json(json!({
                "reason": "ALREADY_PARSED",
                "parsed_file_id": parsed.id,
            })),
        )
            .into_response());
    }

    let job = state.jobs.queue(&request).await?;
    info!(
        subsystem = "api",
        op = "enqueue",
        job_id = %job.id,
        file_name = %job.file_name,
        "Job queued"
    );

    Ok(Json(json!({ "id": job.id, "status": job.status })).into_response())
}

/// List the most recent jobs, newest first.
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<Vec<Job>>, ApiError> {
    let limit = query.limit.unwrap_or(PAGE_LIMIT).clamp(1, 500);
    Ok(Json(state.jobs.list_recent(limit).await?))
}

/// Job counts per status, including jobs that ran out of attempts.
pub async fn job_stats(State(state): State<AppState>) -> Result<Json<QueueStats>, ApiError> {
    let max_attempts = state.scheduler.policy().max_attempts;
    Ok(Json(state.jobs.stats(max_attempts).await?))
}
