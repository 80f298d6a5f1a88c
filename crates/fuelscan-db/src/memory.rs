//! In-memory job and result store.
//!
//! Implements the same claim semantics as the PostgreSQL repositories: the
//! select-and-mark of [`JobRepository::claim_next`] happens under a single
//! lock, so concurrent claimers never receive the same job. Used for local
//! runs without a database and as the store double in scheduler tests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use fuelscan_db::MemoryStore;
//!
//! let store = Arc::new(MemoryStore::new());
//! let job = store.insert_job(Job::queued("pin.jpg", "https://img/pin.jpg"));
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use fuelscan_core::{
    ClaimCriteria, EnqueueRequest, Error, Job, JobFailure, JobRepository, JobStatus,
    ParsedResult, QueueStats, Result, ResultFields, ResultPatch, ResultRepository, ReviewCheck,
};

/// Job and result store held in process memory.
#[derive(Default)]
pub struct MemoryStore {
    jobs: Mutex<Vec<Job>>,
    results: Mutex<HashMap<Uuid, ParsedResult>>,
    writes: AtomicUsize,
    fail_claims: AtomicBool,
    fail_writes: AtomicBool,
    fail_complete: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a job as-is, bypassing validation. Returns the stored copy.
    pub fn insert_job(&self, job: Job) -> Job {
        if let Ok(mut jobs) = self.jobs.lock() {
            jobs.push(job.clone());
        }
        job
    }

    /// Number of mutating operations that succeeded (claims, status
    /// updates, upserts, review edits). Enqueues are not counted.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make every claim fail with a store error.
    pub fn set_fail_claims(&self, fail: bool) {
        self.fail_claims.store(fail, Ordering::SeqCst);
    }

    /// Make every status update and upsert fail with a store error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make only [`JobRepository::complete`] fail, leaving upserts working.
    pub fn set_fail_complete(&self, fail: bool) {
        self.fail_complete.store(fail, Ordering::SeqCst);
    }

    fn jobs(&self) -> Result<MutexGuard<'_, Vec<Job>>> {
        self.jobs
            .lock()
            .map_err(|_| Error::Internal("job store lock poisoned".to_string()))
    }

    fn results(&self) -> Result<MutexGuard<'_, HashMap<Uuid, ParsedResult>>> {
        self.results
            .lock()
            .map_err(|_| Error::Internal("result store lock poisoned".to_string()))
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Internal("store unavailable".to_string()));
        }
        Ok(())
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl JobRepository for MemoryStore {
    async fn queue(&self, request: &EnqueueRequest) -> Result<Job> {
        request.validate()?;
        let job = Job::queued(request.file_name.trim(), request.image_url.trim());
        self.jobs()?.push(job.clone());
        Ok(job)
    }

    async fn claim_next(&self, criteria: &ClaimCriteria) -> Result<Option<Job>> {
        if self.fail_claims.load(Ordering::SeqCst) {
            return Err(Error::Internal("store unavailable".to_string()));
        }

        let mut jobs = self.jobs()?;
        let Some(job) = jobs
            .iter_mut()
            .filter(|job| job.is_claimable(criteria))
            .min_by_key(|job| (job.created_at, job.id))
        else {
            return Ok(None);
        };

        job.status = JobStatus::Processing;
        job.updated_at = Utc::now();
        let claimed = job.clone();
        drop(jobs);

        self.record_write();
        Ok(Some(claimed))
    }

    async fn complete(&self, job_id: Uuid) -> Result<()> {
        self.check_writable()?;
        if self.fail_complete.load(Ordering::SeqCst) {
            return Err(Error::Internal("store unavailable".to_string()));
        }
        let mut jobs = self.jobs()?;
        let job = jobs
            .iter_mut()
            .find(|job| job.id == job_id)
            .ok_or_else(|| Error::NotFound(format!("job {job_id}")))?;

        job.status = JobStatus::Completed;
        job.last_error = None;
        job.updated_at = Utc::now();
        drop(jobs);

        self.record_write();
        Ok(())
    }

    async fn fail(&self, job_id: Uuid, failure: &JobFailure) -> Result<()> {
        self.check_writable()?;
        let mut jobs = self.jobs()?;
        let job = jobs
            .iter_mut()
            .find(|job| job.id == job_id)
            .ok_or_else(|| Error::NotFound(format!("job {job_id}")))?;

        job.status = JobStatus::Failed;
        job.attempts = job.attempts.max(failure.attempts);
        job.next_run_at = job.next_run_at.max(failure.next_run_at);
        job.last_error = Some(failure.error.clone());
        job.updated_at = Utc::now();
        drop(jobs);

        self.record_write();
        Ok(())
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>> {
        Ok(self.jobs()?.iter().find(|job| job.id == job_id).cloned())
    }

    async fn find_by_file_name(&self, file_name: &str) -> Result<Option<Job>> {
        Ok(self
            .jobs()?
            .iter()
            .filter(|job| job.file_name == file_name)
            .min_by_key(|job| job.created_at)
            .cloned())
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Job>> {
        let mut jobs = self.jobs()?.clone();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        Ok(jobs)
    }

    async fn stats(&self, max_attempts: i32) -> Result<QueueStats> {
        let jobs = self.jobs()?;
        let mut stats = QueueStats::default();
        for job in jobs.iter() {
            match job.status {
                JobStatus::Queued => stats.queued += 1,
                JobStatus::Processing => stats.processing += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed => {
                    stats.failed += 1;
                    if job.attempts >= max_attempts {
                        stats.exhausted += 1;
                    }
                }
            }
        }
        Ok(stats)
    }
}

#[async_trait]
impl ResultRepository for MemoryStore {
    async fn upsert(&self, job_id: Uuid, fields: &ResultFields) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now();
        let mut results = self.results()?;
        let (created_at, checked_by) = match results.get(&job_id) {
            Some(existing) => (existing.created_at, existing.checked_by.clone()),
            None => (now, Vec::new()),
        };
        results.insert(
            job_id,
            ParsedResult {
                id: job_id,
                file_name: fields.file_name.clone(),
                image_url: fields.image_url.clone(),
                element_number: fields.element_number.clone(),
                rows: fields.rows.clone(),
                notes: fields.notes.clone(),
                status: JobStatus::Completed,
                checked_by,
                created_at,
                updated_at: now,
            },
        );
        drop(results);

        self.record_write();
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<ParsedResult>> {
        Ok(self.results()?.get(&id).cloned())
    }

    async fn find_by_file_name(&self, file_name: &str) -> Result<Option<ParsedResult>> {
        Ok(self
            .results()?
            .values()
            .filter(|result| result.file_name == file_name)
            .min_by_key(|result| result.created_at)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<ParsedResult>> {
        let mut results: Vec<ParsedResult> = self.results()?.values().cloned().collect();
        results.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(results)
    }

    async fn update_review(&self, id: Uuid, patch: &ResultPatch) -> Result<bool> {
        patch.validate()?;
        self.check_writable()?;
        let mut results = self.results()?;
        let Some(result) = results.get_mut(&id) else {
            return Ok(false);
        };
        patch.apply_to(result);
        result.updated_at = Utc::now();
        drop(results);

        self.record_write();
        Ok(true)
    }

    async fn set_check(&self, id: Uuid, check: &ReviewCheck) -> Result<Option<Vec<String>>> {
        check.validate()?;
        self.check_writable()?;
        let mut results = self.results()?;
        let Some(result) = results.get_mut(&id) else {
            return Ok(None);
        };
        check.apply_to(&mut result.checked_by);
        result.updated_at = Utc::now();
        let checked_by = result.checked_by.clone();
        drop(results);

        self.record_write();
        Ok(Some(checked_by))
    }
}
