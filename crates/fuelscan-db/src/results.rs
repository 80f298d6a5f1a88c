//! Parsed result repository implementation.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use fuelscan_core::{
    Error, InspectionRow, JobStatus, ParsedResult, Result, ResultFields, ResultPatch,
    ResultRepository, ReviewCheck,
};

const RESULT_COLUMNS: &str =
    "id, file_name, image_url, element_number, rows, notes, status, checked_by, created_at, updated_at";

/// PostgreSQL implementation of ResultRepository.
#[derive(Clone)]
pub struct PgResultRepository {
    pool: Pool<Postgres>,
}

impl PgResultRepository {
    /// Create a new PgResultRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_result_row(row: PgRow) -> Result<ParsedResult> {
        let status: String = row.try_get("status")?;
        let rows: Json<Vec<InspectionRow>> = row.try_get("rows")?;
        Ok(ParsedResult {
            id: row.try_get("id")?,
            file_name: row.try_get("file_name")?,
            image_url: row.try_get("image_url")?,
            element_number: row.try_get("element_number")?,
            rows: rows.0,
            notes: row.try_get("notes")?,
            status: status.parse()?,
            checked_by: row.try_get("checked_by")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl ResultRepository for PgResultRepository {
    async fn upsert(&self, job_id: Uuid, fields: &ResultFields) -> Result<()> {
        sqlx::query(
            "INSERT INTO parsed_files (id, file_name, image_url, element_number, rows, notes, status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
             ON CONFLICT (id) DO UPDATE SET
                 file_name = EXCLUDED.file_name,
                 image_url = EXCLUDED.image_url,
                 element_number = EXCLUDED.element_number,
                 rows = EXCLUDED.rows,
                 notes = EXCLUDED.notes,
                 status = EXCLUDED.status,
                 updated_at = NOW()",
        )
        .bind(job_id)
        .bind(&fields.file_name)
        .bind(&fields.image_url)
        .bind(&fields.element_number)
        .bind(Json(&fields.rows))
        .bind(&fields.notes)
        .bind(JobStatus::Completed.as_str())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<ParsedResult>> {
        let query = format!("SELECT {RESULT_COLUMNS} FROM parsed_files WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.map(Self::parse_result_row).transpose()
    }

    async fn find_by_file_name(&self, file_name: &str) -> Result<Option<ParsedResult>> {
        let query = format!(
            "SELECT {RESULT_COLUMNS} FROM parsed_files WHERE file_name = $1 ORDER BY created_at ASC LIMIT 1"
        );
        let row = sqlx::query(&query)
            .bind(file_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.map(Self::parse_result_row).transpose()
    }

    async fn list(&self) -> Result<Vec<ParsedResult>> {
        let query = format!("SELECT {RESULT_COLUMNS} FROM parsed_files ORDER BY created_at DESC");
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        rows.into_iter().map(Self::parse_result_row).collect()
    }

    async fn update_review(&self, id: Uuid, patch: &ResultPatch) -> Result<bool> {
        patch.validate()?;

        // COALESCE leaves columns the patch does not mention untouched.
        let result = sqlx::query(
            "UPDATE parsed_files
             SET notes = COALESCE($2, notes),
                 element_number = COALESCE($3, element_number),
                 rows = COALESCE($4, rows),
                 updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(patch.notes.as_deref())
        .bind(patch.element_number.as_deref())
        .bind(patch.rows.as_ref().map(Json))
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_check(&self, id: Uuid, check: &ReviewCheck) -> Result<Option<Vec<String>>> {
        check.validate()?;

        let row = sqlx::query(
            "UPDATE parsed_files
             SET checked_by = CASE
                     WHEN NOT $3 THEN array_remove(checked_by, $2)
                     WHEN $2 = ANY(checked_by) THEN checked_by
                     ELSE array_append(checked_by, $2)
                 END,
                 updated_at = NOW()
             WHERE id = $1
             RETURNING checked_by",
        )
        .bind(id)
        .bind(check.reviewer.trim())
        .bind(check.checked)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(|row| row.try_get::<Vec<String>, _>("checked_by").map_err(Error::Database))
            .transpose()
    }
}
