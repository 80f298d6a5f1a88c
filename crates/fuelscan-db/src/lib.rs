//! # fuelscan-db
//!
//! Storage layer for the fuelscan job queue.
//!
//! Jobs are claimed with a single `UPDATE ... FOR UPDATE SKIP LOCKED`
//! statement and results are written with `ON CONFLICT (id) DO UPDATE`.
//! [`MemoryStore`] implements the same contracts without PostgreSQL.
//!
//! ## Example
//!
//! ```rust,ignore
//! use fuelscan_db::{Database, EnqueueRequest, JobRepository, PoolConfig};
//!
//! #[tokio::main]
//! async fn main() -> fuelscan_db::Result<()> {
//!     let db = Database::connect_with_config(&url, PoolConfig::from_env()).await?;
//!     db.migrate().await?;
//!
//!     let job = db.jobs.queue(&EnqueueRequest {
//!         file_name: "pin-17.jpg".to_string(),
//!         image_url: "https://img.example.com/pin-17.jpg".to_string(),
//!     }).await?;
//!
//!     println!("Queued job: {}", job.id);
//!     Ok(())
//! }
//! ```
pub mod jobs;
pub mod memory;
pub mod pool;
pub mod results;

// Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use fuelscan_core::*;

pub use jobs::PgJobRepository;
pub use memory::MemoryStore;
pub use pool::{create_pool_with_config, PoolConfig};
pub use results::PgResultRepository;

/// PostgreSQL-backed job and result stores sharing one pool.
#[derive(Clone)]
pub struct Database {
    pub pool: sqlx::Pool<sqlx::Postgres>,
    pub jobs: PgJobRepository,
    pub results: PgResultRepository,
}

impl Database {
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            jobs: PgJobRepository::new(pool.clone()),
            results: PgResultRepository::new(pool.clone()),
            pool,
        }
    }

    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        Ok(Self::new(create_pool_with_config(url, config).await?))
    }

    /// Apply the `fuel_jobs` and `parsed_files` migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }
}
