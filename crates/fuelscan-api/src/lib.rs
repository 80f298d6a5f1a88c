//! # fuelscan-api
//!
//! HTTP surface for the fuelscan extraction queue: the queue trigger, job
//! enqueue, result review and CSV export.

pub mod csv_export;
pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use fuelscan_core::{JobRepository, ResultRepository};
use fuelscan_jobs::Scheduler;

pub use error::ApiError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<dyn JobRepository>,
    pub results: Arc<dyn ResultRepository>,
    pub scheduler: Scheduler,
}

impl AppState {
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        results: Arc<dyn ResultRepository>,
        scheduler: Scheduler,
    ) -> Self {
        Self {
            jobs,
            results,
            scheduler,
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    use handlers::{jobs, queue, results};

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/process-queue",
            get(queue::process_queue).post(queue::process_queue),
        )
        .route("/api/jobs", get(jobs::list_jobs).post(jobs::enqueue_job))
        .route("/api/jobs/stats", get(jobs::job_stats))
        .route("/api/results", get(results::list_results))
        .route(
            "/api/results/:id",
            get(results::get_result).patch(results::update_result),
        )
        .route("/api/results/:id/csv", get(results::export_csv))
        .route("/api/results/:id/checks", post(results::set_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
