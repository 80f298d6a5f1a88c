//! Claim-and-dispatch scheduler.
//!
//! [`Scheduler::run_once`] claims at most one eligible job, runs extraction
//! for it and records the outcome before returning. Mutual exclusion between
//! concurrent runs (in this process or others) comes only from the store's
//! atomic claim.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use fuelscan_core::{
    ClaimCriteria, Error, ExtractionBackend, ExtractionError, Job, JobFailure, JobRepository,
    ResultFields, ResultRepository,
};

use crate::backoff::RetryPolicy;
use crate::config::SchedulerConfig;
use crate::invoker::ExtractionInvoker;

/// Result of one scheduler run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// No job was eligible.
    NoJob,
    /// A job was extracted, its result stored and the job completed.
    Processed {
        job_id: Uuid,
        element_number: String,
        row_count: usize,
    },
    /// Extraction failed; the job is FAILED with backoff applied.
    Failed {
        job_id: Uuid,
        error: ExtractionError,
        attempts: i32,
        next_run_at: DateTime<Utc>,
        /// The job has no attempts left and will not be claimed again.
        terminal: bool,
    },
}

impl RunOutcome {
    /// Coarse status line for the trigger response.
    pub fn message(&self) -> &'static str {
        match self {
            RunOutcome::NoJob => "No jobs",
            RunOutcome::Processed { .. } => "Processed 1 job",
            RunOutcome::Failed { .. } => "Job failed, will retry",
        }
    }

    pub fn job_id(&self) -> Option<Uuid> {
        match self {
            RunOutcome::NoJob => None,
            RunOutcome::Processed { job_id, .. } | RunOutcome::Failed { job_id, .. } => {
                Some(*job_id)
            }
        }
    }
}

/// Store failure that aborted a run.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The claim query failed; no job state was changed.
    #[error("failed to claim job: {0}")]
    Claim(#[source] Error),

    /// Recording the outcome failed; the job may be left PROCESSING.
    #[error("failed to record outcome of job {job_id}: {source}")]
    Write {
        job_id: Uuid,
        #[source]
        source: Error,
    },
}

impl DispatchError {
    /// Short text safe to show to trigger callers.
    pub fn public_message(&self) -> &'static str {
        match self {
            DispatchError::Claim(_) => "Failed to claim job",
            DispatchError::Write { .. } => "Failed to record job outcome",
        }
    }
}

/// Claims jobs and drives them through extraction.
#[derive(Clone)]
pub struct Scheduler {
    jobs: Arc<dyn JobRepository>,
    results: Arc<dyn ResultRepository>,
    invoker: ExtractionInvoker,
    policy: RetryPolicy,
}

impl Scheduler {
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        results: Arc<dyn ResultRepository>,
        backend: Arc<dyn ExtractionBackend>,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            jobs,
            results,
            invoker: ExtractionInvoker::from_config(backend, config),
            policy: config.retry_policy(),
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Claim and process at most one job.
    pub async fn run_once(&self) -> Result<RunOutcome, DispatchError> {
        let criteria = ClaimCriteria::eligible(self.policy.max_attempts, Utc::now());

        let claimed = self.jobs.claim_next(&criteria).await.map_err(|e| {
            error!(
                subsystem = "jobs",
                component = "scheduler",
                op = "claim",
                error = %e,
                "Failed to claim job"
            );
            DispatchError::Claim(e)
        })?;

        let Some(job) = claimed else {
            debug!(subsystem = "jobs", component = "scheduler", "No eligible jobs");
            return Ok(RunOutcome::NoJob);
        };

        let span = info_span!(
            "dispatch",
            job_id = %job.id,
            file_name = %job.file_name,
            attempts = job.attempts
        );
        self.dispatch(job).instrument(span).await
    }

    async fn dispatch(&self, job: Job) -> Result<RunOutcome, DispatchError> {
        let start = Instant::now();
        let job_id = job.id;
        info!(
            subsystem = "jobs",
            component = "scheduler",
            op = "dispatch",
            model = self.invoker.model_name(),
            "Processing job"
        );

        match self.invoker.invoke(&job.image_url).await {
            Ok(output) => {
                let element_number = output.element_number.clone();
                let row_count = output.rows.len();
                let fields = ResultFields::from_extraction(&job, output);

                // Result first: a crash before `complete` leaves the job
                // re-claimable and the rerun overwrites the same id.
                self.results
                    .upsert(job_id, &fields)
                    .await
                    .map_err(|source| write_failed(job_id, "upsert", source))?;
                self.jobs
                    .complete(job_id)
                    .await
                    .map_err(|source| write_failed(job_id, "complete", source))?;

                info!(
                    subsystem = "jobs",
                    component = "scheduler",
                    op = "complete",
                    element_number = %element_number,
                    row_count,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Job completed"
                );
                Ok(RunOutcome::Processed {
                    job_id,
                    element_number,
                    row_count,
                })
            }
            Err(failure) => {
                let attempts = job.attempts + 1;
                let next_run_at = self.policy.next_run_at(attempts, Utc::now());
                let terminal = self.policy.is_terminal(attempts);

                self.jobs
                    .fail(
                        job_id,
                        &JobFailure {
                            attempts,
                            next_run_at,
                            error: failure.to_string(),
                        },
                    )
                    .await
                    .map_err(|source| write_failed(job_id, "fail", source))?;

                if terminal {
                    error!(
                        subsystem = "jobs",
                        component = "scheduler",
                        op = "fail",
                        failure_kind = failure.kind(),
                        error = %failure,
                        attempts,
                        terminal,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Job failed with no attempts left"
                    );
                } else {
                    warn!(
                        subsystem = "jobs",
                        component = "scheduler",
                        op = "fail",
                        failure_kind = failure.kind(),
                        error = %failure,
                        attempts,
                        next_run_at = %next_run_at,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Job failed, will retry"
                    );
                }

                Ok(RunOutcome::Failed {
                    job_id,
                    error: failure,
                    attempts,
                    next_run_at,
                    terminal,
                })
            }
        }
    }
}

fn write_failed(job_id: Uuid, op: &'static str, source: Error) -> DispatchError {
    error!(
        subsystem = "jobs",
        component = "scheduler",
        op,
        error = %source,
        "Failed to record job outcome"
    );
    DispatchError::Write { job_id, source }
}
