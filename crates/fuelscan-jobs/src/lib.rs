//! # fuelscan-jobs
//!
//! Extraction queue core for fuelscan.
//!
//! This crate provides:
//! - [`Scheduler::run_once`]: atomic single-job claim, extraction, and
//!   outcome bookkeeping
//! - [`RetryPolicy`]: `2^attempts` minute backoff with a terminal threshold
//! - [`ExtractionInvoker`]: throttle delay, hard timeout and response
//!   normalization around an extraction backend
//! - [`QueueTicker`]: periodic in-process trigger with broadcast events
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use fuelscan_db::{Database, PoolConfig};
//! use fuelscan_inference::GeminiBackend;
//! use fuelscan_jobs::{QueueTicker, Scheduler, SchedulerConfig, TickerConfig};
//!
//! let db = Database::connect_with_config("postgres://...", PoolConfig::from_env()).await?;
//! let scheduler = Scheduler::new(
//!     Arc::new(db.jobs.clone()),
//!     Arc::new(db.results.clone()),
//!     Arc::new(GeminiBackend::from_env()?),
//!     &SchedulerConfig::from_env(),
//! );
//!
//! // One manual run
//! println!("{}", scheduler.run_once().await?.message());
//!
//! // Or tick in the background
//! let handle = QueueTicker::new(scheduler, TickerConfig::from_env()).start();
//! handle.stop().await;
//! ```

pub mod backoff;
pub mod config;
pub mod invoker;
pub mod scheduler;
pub mod ticker;

// Re-export core types
pub use fuelscan_core::*;

pub use backoff::RetryPolicy;
pub use config::SchedulerConfig;
pub use invoker::{normalize, ExtractionInvoker};
pub use scheduler::{DispatchError, RunOutcome, Scheduler};
pub use ticker::{QueueTicker, TickerConfig, TickerEvent, TickerHandle};
