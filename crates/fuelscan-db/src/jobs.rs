//! Job repository implementation.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use fuelscan_core::{
    ClaimCriteria, EnqueueRequest, Error, Job, JobFailure, JobRepository, QueueStats,
    Result,
};

const JOB_COLUMNS: &str =
    "id, file_name, image_url, status, attempts, next_run_at, last_error, created_at, updated_at";

/// PostgreSQL implementation of JobRepository.
#[derive(Clone)]
pub struct PgJobRepository {
    pool: Pool<Postgres>,
}

impl PgJobRepository {
    /// Create a new PgJobRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Parse a job row into a Job struct.
    fn parse_job_row(row: PgRow) -> Result<Job> {
        let status: String = row.try_get("status")?;
        Ok(Job {
            id: row.try_get("id")?,
            file_name: row.try_get("file_name")?,
            image_url: row.try_get("image_url")?,
            status: status.parse()?,
            attempts: row.try_get("attempts")?,
            next_run_at: row.try_get("next_run_at")?,
            last_error: row.try_get("last_error")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl JobRepository for PgJobRepository {
    async fn queue(&self, request: &EnqueueRequest) -> Result<Job> {
        request.validate()?;
        let job = Job::queued(request.file_name.trim(), request.image_url.trim());

        sqlx::query(
            "INSERT INTO fuel_jobs (id, file_name, image_url, status, attempts, next_run_at, created_at, updated_at)
             VALUES ($1, $2, $3, $4, 0, $5, $6, $6)",
        )
        .bind(job.id)
        .bind(&job.file_name)
        .bind(&job.image_url)
        .bind(job.status.as_str())
        .bind(job.next_run_at)
        .bind(job.created_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(job)
    }

    async fn claim_next(&self, criteria: &ClaimCriteria) -> Result<Option<Job>> {
        let statuses: Vec<String> = criteria
            .statuses
            .iter()
            .map(|status| status.as_str().to_string())
            .collect();

        // Select-and-mark in one statement. SKIP LOCKED makes a concurrent
        // claimer move past a row another transaction is claiming instead of
        // waiting for it and then claiming it a second time.
        let query = format!(
            "UPDATE fuel_jobs
             SET status = 'PROCESSING', updated_at = NOW()
             WHERE id = (
                 SELECT id FROM fuel_jobs
                 WHERE status = ANY($1)
                   AND attempts < $2
                   AND next_run_at <= $3
                 ORDER BY created_at ASC, id ASC
                 LIMIT 1
                 FOR UPDATE SKIP LOCKED
             )
             AND status = ANY($1)
             RETURNING {JOB_COLUMNS}"
        );

        let row = sqlx::query(&query)
            .bind(&statuses)
            .bind(criteria.max_attempts)
            .bind(criteria.now)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.map(Self::parse_job_row).transpose()
    }

    async fn complete(&self, job_id: Uuid) -> Result<()> {
        let result = sqlx::query(
            "UPDATE fuel_jobs
             SET status = 'COMPLETED', last_error = NULL, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("job {job_id}")));
        }
        Ok(())
    }

    async fn fail(&self, job_id: Uuid, failure: &JobFailure) -> Result<()> {
        // GREATEST keeps attempts and next_run_at monotonic even if a stale
        // scheduler writes after a newer one.
        let result = sqlx::query(
            "UPDATE fuel_jobs
             SET status = 'FAILED',
                 attempts = GREATEST(attempts, $2),
                 next_run_at = GREATEST(next_run_at, $3),
                 last_error = $4,
                 updated_at = NOW()
             WHERE id = $1",
        )
        .bind(job_id)
        .bind(failure.attempts)
        .bind(failure.next_run_at)
        .bind(&failure.error)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("job {job_id}")));
        }
        Ok(())
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>> {
        let query = format!("SELECT {JOB_COLUMNS} FROM fuel_jobs WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.map(Self::parse_job_row).transpose()
    }

    async fn find_by_file_name(&self, file_name: &str) -> Result<Option<Job>> {
        let query = format!(
            "SELECT {JOB_COLUMNS} FROM fuel_jobs WHERE file_name = $1 ORDER BY created_at ASC LIMIT 1"
        );
        let row = sqlx::query(&query)
            .bind(file_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.map(Self::parse_job_row).transpose()
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Job>> {
        let query = format!(
            "SELECT {JOB_COLUMNS} FROM fuel_jobs ORDER BY created_at DESC LIMIT $1"
        );
        let rows = sqlx::query(&query)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        rows.into_iter().map(Self::parse_job_row).collect()
    }

    async fn stats(&self, max_attempts: i32) -> Result<QueueStats> {
        let row = sqlx::query(
            "SELECT
                 COUNT(*) FILTER (WHERE status = 'QUEUED') AS queued,
                 COUNT(*) FILTER (WHERE status = 'PROCESSING') AS processing,
                 COUNT(*) FILTER (WHERE status = 'COMPLETED') AS completed,
                 COUNT(*) FILTER (WHERE status = 'FAILED') AS failed,
                 COUNT(*) FILTER (WHERE status = 'FAILED' AND attempts >= $1) AS exhausted
             FROM fuel_jobs",
        )
        .bind(max_attempts)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(QueueStats {
            queued: row.try_get("queued")?,
            processing: row.try_get("processing")?,
            completed: row.try_get("completed")?,
            failed: row.try_get("failed")?,
            exhausted: row.try_get("exhausted")?,
        })
    }
}
