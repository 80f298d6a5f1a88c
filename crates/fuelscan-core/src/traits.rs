//! Core traits for fuelscan abstractions.
//!
//! These traits define the collaborators the queue core is written against,
//! so the PostgreSQL store, the in-memory store and the vision backend can be
//! swapped for test doubles.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{ExtractionError, Result};
use crate::models::*;

// =============================================================================
// JOB STORE
// =============================================================================

/// Repository for queued extraction jobs.
///
/// `claim_next` is the only concurrency guarantee in the system: it must
/// select and mark a job PROCESSING in one atomic operation, so concurrent
/// callers never receive the same job.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Insert a new QUEUED job with zero attempts, eligible immediately.
    async fn queue(&self, request: &EnqueueRequest) -> Result<Job>;

    /// Atomically claim the oldest job matching `criteria`, setting it to
    /// PROCESSING. Returns `None` when nothing is eligible.
    async fn claim_next(&self, criteria: &ClaimCriteria) -> Result<Option<Job>>;

    /// Mark a job as completed.
    async fn complete(&self, job_id: Uuid) -> Result<()>;

    /// Mark a job as failed. `attempts` and `next_run_at` never move backwards.
    async fn fail(&self, job_id: Uuid, failure: &JobFailure) -> Result<()>;

    /// Get job by ID.
    async fn get(&self, job_id: Uuid) -> Result<Option<Job>>;

    /// Find a job by its source file name.
    async fn find_by_file_name(&self, file_name: &str) -> Result<Option<Job>>;

    /// List jobs, newest first.
    async fn list_recent(&self, limit: i64) -> Result<Vec<Job>>;

    /// Count jobs per status.
    async fn stats(&self, max_attempts: i32) -> Result<QueueStats>;
}

// =============================================================================
// RESULT STORE
// =============================================================================

/// Repository for parsed results.
#[async_trait]
pub trait ResultRepository: Send + Sync {
    /// Insert or overwrite the result for `job_id`; latest fields win.
    async fn upsert(&self, job_id: Uuid, fields: &ResultFields) -> Result<()>;

    /// Get result by ID.
    async fn get(&self, id: Uuid) -> Result<Option<ParsedResult>>;

    /// Find a result by its source file name.
    async fn find_by_file_name(&self, file_name: &str) -> Result<Option<ParsedResult>>;

    /// List all results, newest first.
    async fn list(&self) -> Result<Vec<ParsedResult>>;

    /// Apply a reviewer correction. Returns false if the result does not exist.
    async fn update_review(&self, id: Uuid, patch: &ResultPatch) -> Result<bool>;

    /// Record or withdraw a reviewer's sign-off. Returns the updated
    /// reviewer list, or `None` if the result does not exist.
    async fn set_check(&self, id: Uuid, check: &ReviewCheck) -> Result<Option<Vec<String>>>;
}

// =============================================================================
// EXTRACTION
// =============================================================================

/// External vision-extraction service.
///
/// Implementations return the raw JSON text produced by the model; decoding,
/// emptiness checks and the timeout are applied by the caller.
#[async_trait]
pub trait ExtractionBackend: Send + Sync {
    /// Extract table data from the image at `image_url`.
    async fn extract(&self, image_url: &str) -> std::result::Result<String, ExtractionError>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}
