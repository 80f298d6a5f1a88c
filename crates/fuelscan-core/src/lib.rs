//! # fuelscan-core
//!
//! Core types, traits, and abstractions for the fuelscan inspection-record
//! pipeline.
//!
//! This crate provides the data model shared by every other crate (jobs,
//! parsed results, extracted rows), the error taxonomy, and the collaborator
//! traits the queue core is written against:
//!
//! - [`JobRepository`]: the job store (atomic claim, status updates)
//! - [`ResultRepository`]: idempotent storage of parsed results
//! - [`ExtractionBackend`]: the external vision-extraction call
//!
//! ## Logging
//!
//! Every crate logs through `tracing` with `subsystem` (`api`, `db`,
//! `inference`, `jobs`), `component` and `op` fields, plus `job_id`,
//! `attempts`, `duration_ms` and `error` where they apply.
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Store failure, job failed permanently |
//! | WARN  | Recoverable extraction failure, job rescheduled |
//! | INFO  | Lifecycle events, job completions |
//! | DEBUG | Empty queue, decision points, config choices |

pub mod defaults;
pub mod error;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, ExtractionError, Result};
pub use models::*;
pub use traits::*;
