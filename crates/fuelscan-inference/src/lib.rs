//! # fuelscan-inference
//!
//! Vision-extraction backends for fuelscan.
//!
//! This crate provides:
//! - [`GeminiBackend`]: downloads an image and asks a Gemini model to
//!   transcribe the inspection table into JSON
//! - [`prompt`]: the OCR instructions and the response schema sent with
//!   every request
//! - `mock::MockExtractionBackend` (feature `mock`): scripted replies for tests
//!
//! Backends return the raw JSON text the model produced. Decoding and
//! emptiness checks happen in the invocation wrapper in `fuelscan-jobs`.
//!
//! # Example
//!
//! ```rust,no_run
//! use fuelscan_inference::{ExtractionBackend, GeminiBackend};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = GeminiBackend::from_env()?;
//!     let json = backend.extract("https://img.example.com/pin-17.jpg").await?;
//!     println!("{json}");
//!     Ok(())
//! }
//! ```

pub mod gemini;
pub mod prompt;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export core types
pub use fuelscan_core::*;

pub use gemini::GeminiBackend;
