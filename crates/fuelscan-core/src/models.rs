//! Data models for the inspection-record queue.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

// =============================================================================
// JOBS
// =============================================================================

/// Lifecycle state of a job.
///
/// `QUEUED -> PROCESSING -> COMPLETED | FAILED`. A FAILED job becomes
/// claimable again once its backoff has elapsed, until it runs out of attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Wire/database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "QUEUED",
            JobStatus::Processing => "PROCESSING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "QUEUED" => Ok(JobStatus::Queued),
            "PROCESSING" => Ok(JobStatus::Processing),
            "COMPLETED" => Ok(JobStatus::Completed),
            "FAILED" => Ok(JobStatus::Failed),
            other => Err(Error::InvalidInput(format!("unknown job status: {other}"))),
        }
    }
}

/// One unit of queued extraction work tied to one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub file_name: String,
    pub image_url: String,
    pub status: JobStatus,
    /// Failed processing attempts so far. Only ever increases.
    pub attempts: i32,
    /// Earliest time the job may be claimed. Only ever moves forward.
    pub next_run_at: DateTime<Utc>,
    /// Display text of the most recent extraction failure.
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a freshly queued job.
    pub fn queued(file_name: impl Into<String>, image_url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            file_name: file_name.into(),
            image_url: image_url.into(),
            status: JobStatus::Queued,
            attempts: 0,
            next_run_at: now,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this job satisfies the claim criteria.
    pub fn is_claimable(&self, criteria: &ClaimCriteria) -> bool {
        criteria.statuses.contains(&self.status)
            && self.attempts < criteria.max_attempts
            && self.next_run_at <= criteria.now
    }
}

/// Filter for the atomic claim.
///
/// Eligible rows are ordered by `created_at` ascending; the oldest wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimCriteria {
    /// Statuses a claimable job may be in.
    pub statuses: Vec<JobStatus>,
    /// Jobs with `attempts >= max_attempts` are never claimed.
    pub max_attempts: i32,
    /// Jobs with `next_run_at > now` are not yet eligible.
    pub now: DateTime<Utc>,
}

impl ClaimCriteria {
    /// Standard criteria: QUEUED or FAILED, attempts left, backoff elapsed.
    pub fn eligible(max_attempts: i32, now: DateTime<Utc>) -> Self {
        Self {
            statuses: vec![JobStatus::Queued, JobStatus::Failed],
            max_attempts,
            now,
        }
    }
}

/// Bookkeeping written when an attempt fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    /// Attempt count after the increment.
    pub attempts: i32,
    /// When the job becomes eligible again.
    pub next_run_at: DateTime<Utc>,
    /// Failure description for operators.
    pub error: String,
}

/// Request to enqueue a new job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueRequest {
    pub file_name: String,
    pub image_url: String,
}

impl EnqueueRequest {
    /// Reject blank file names or image URLs.
    pub fn validate(&self) -> crate::Result<()> {
        if self.file_name.trim().is_empty() || self.image_url.trim().is_empty() {
            return Err(Error::InvalidInput(
                "Missing file_name or image_url".to_string(),
            ));
        }
        Ok(())
    }
}

/// Job counts per status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub queued: i64,
    pub processing: i64,
    pub completed: i64,
    pub failed: i64,
    /// FAILED jobs that ran out of attempts and need manual inspection.
    pub exhausted: i64,
}

// =============================================================================
// EXTRACTION
// =============================================================================

/// One row of an inspection table.
///
/// Cells the model could not read come back as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectionRow {
    pub date: String,
    pub address: String,
    pub length: String,
    pub plus_r: String,
    pub minus_r: String,
    pub bow: String,
    pub delta_bow: String,
    pub delta_length: String,
    pub go_no_go: String,
    pub notes: String,
}

/// Structured output of a vision-extraction call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionOutput {
    /// Pin/element number identifying the inspected element.
    #[serde(default)]
    pub element_number: String,
    #[serde(default)]
    pub rows: Vec<InspectionRow>,
    /// Free-text summary of visual defects or unusual values.
    #[serde(default)]
    pub outliers: String,
}

impl ExtractionOutput {
    /// True when there is nothing to persist: no rows and no element number.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.element_number.trim().is_empty()
    }
}

// =============================================================================
// PARSED RESULTS
// =============================================================================

/// Persisted extraction result, keyed by the originating job id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedResult {
    pub id: Uuid,
    pub file_name: String,
    pub image_url: String,
    pub element_number: String,
    pub rows: Vec<InspectionRow>,
    pub notes: String,
    pub status: JobStatus,
    /// Reviewers who signed the result off, in sign-off order. Re-extraction
    /// does not clear it.
    #[serde(default)]
    pub checked_by: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields written by the idempotent upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultFields {
    pub file_name: String,
    pub image_url: String,
    pub element_number: String,
    pub rows: Vec<InspectionRow>,
    pub notes: String,
}

impl ResultFields {
    /// Combine a job's identity fields with its extraction output.
    pub fn from_extraction(job: &Job, output: ExtractionOutput) -> Self {
        Self {
            file_name: job.file_name.clone(),
            image_url: job.image_url.clone(),
            element_number: output.element_number,
            rows: output.rows,
            notes: output.outliers,
        }
    }
}

/// Reviewer correction of a parsed result.
///
/// Only these three fields are editable after extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultPatch {
    pub notes: Option<String>,
    pub element_number: Option<String>,
    pub rows: Option<Vec<InspectionRow>>,
}

impl ResultPatch {
    pub fn is_empty(&self) -> bool {
        self.notes.is_none() && self.element_number.is_none() && self.rows.is_none()
    }

    /// Reject patches that would change nothing.
    pub fn validate(&self) -> crate::Result<()> {
        if self.is_empty() {
            return Err(Error::InvalidInput("No valid fields to update".to_string()));
        }
        Ok(())
    }

    /// Apply the patch to a result in place.
    pub fn apply_to(&self, result: &mut ParsedResult) {
        if let Some(notes) = &self.notes {
            result.notes = notes.clone();
        }
        if let Some(element_number) = &self.element_number {
            result.element_number = element_number.clone();
        }
        if let Some(rows) = &self.rows {
            result.rows = rows.clone();
        }
    }
}

/// A reviewer's sign-off on a result, or its withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewCheck {
    pub reviewer: String,
    pub checked: bool,
}

impl ReviewCheck {
    pub fn validate(&self) -> crate::Result<()> {
        if self.reviewer.trim().is_empty() {
            return Err(Error::InvalidInput("Missing reviewer".to_string()));
        }
        Ok(())
    }

    /// Add or remove the reviewer, keeping each name at most once.
    pub fn apply_to(&self, checked_by: &mut Vec<String>) {
        let reviewer = self.reviewer.trim();
        if self.checked {
            if !checked_by.iter().any(|r| r == reviewer) {
                checked_by.push(reviewer.to_string());
            }
        } else {
            checked_by.retain(|r| r != reviewer);
        }
    }
}
