//! Queue trigger endpoint.

use axum::extract::State;
use axum::http::StatusCode;

use crate::AppState;

/// Run the scheduler once and report the coarse outcome as plain text.
///
/// # Returns
/// - 200 OK with `No jobs`, `Processed 1 job` or `Job failed, will retry`
/// - 500 Internal Server Error when the store fails (details are logged)
pub async fn process_queue(State(state): State<AppState>) -> (StatusCode, &'static str) {
    match state.scheduler.run_once().await {
        Ok(outcome) => (StatusCode::OK, outcome.message()),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.public_message()),
    }
}
