//! Centralized default constants for fuelscan.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates reference these constants instead of defining their own magic
//! numbers.

// =============================================================================
// JOB PROCESSING
// =============================================================================

/// Attempts after which a job is never claimed again.
pub const MAX_ATTEMPTS: i32 = 3;

/// Hard timeout around a single extraction call in milliseconds.
pub const OCR_TIMEOUT_MS: u64 = 60_000;

/// Pause before each extraction call in milliseconds (upstream rate limit).
pub const OCR_DELAY_MS: u64 = 1_000;

/// Base of the exponential backoff, in minutes: delay = BASE^attempts.
pub const BACKOFF_BASE_MINUTES: i64 = 2;

/// `APP_ENV` value that zeroes backoff delay for accelerated runs.
pub const DEV_ENVIRONMENT: &str = "development";

// =============================================================================
// QUEUE TICKER
// =============================================================================

/// Interval between scheduled `run_once` ticks in milliseconds.
pub const TICK_INTERVAL_MS: u64 = 60_000;

/// Concurrent `run_once` calls fired per tick.
pub const RUNS_PER_TICK: usize = 1;

/// Ticker event broadcast channel capacity.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// INFERENCE
// =============================================================================

/// Default Gemini API base URL.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default vision model.
pub const GEMINI_MODEL: &str = "gemini-2.5-flash";

/// MIME type assumed when the image bytes are not recognised.
pub const FALLBACK_IMAGE_MIME: &str = "image/jpeg";

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Default page size for job listings.
pub const PAGE_LIMIT: i64 = 50;

// =============================================================================
// ENVIRONMENT VARIABLE NAMES
// =============================================================================

pub const ENV_MAX_ATTEMPTS: &str = "MAX_ATTEMPTS";
pub const ENV_OCR_TIMEOUT_MS: &str = "OCR_TIMEOUT_MS";
pub const ENV_OCR_DELAY_MS: &str = "OCR_DELAY_MS";
pub const ENV_APP_ENV: &str = "APP_ENV";
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_GEMINI_MODEL: &str = "GEMINI_MODEL";
pub const ENV_GEMINI_BASE_URL: &str = "GEMINI_BASE_URL";
