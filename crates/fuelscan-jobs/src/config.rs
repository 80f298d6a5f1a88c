//! Scheduler configuration.

use std::time::Duration;

use fuelscan_core::defaults::{
    DEV_ENVIRONMENT, ENV_APP_ENV, ENV_MAX_ATTEMPTS, ENV_OCR_DELAY_MS, ENV_OCR_TIMEOUT_MS,
    MAX_ATTEMPTS, OCR_DELAY_MS, OCR_TIMEOUT_MS,
};

use crate::backoff::RetryPolicy;

/// Configuration for the claim-and-dispatch scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Attempts after which a job stays FAILED for good.
    pub max_attempts: i32,
    /// Hard timeout around each extraction call, in milliseconds.
    pub timeout_ms: u64,
    /// Pause before each extraction call, in milliseconds.
    pub throttle_ms: u64,
    /// Zero the retry backoff (development runs).
    pub zero_backoff: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            timeout_ms: OCR_TIMEOUT_MS,
            throttle_ms: OCR_DELAY_MS,
            zero_backoff: false,
        }
    }
}

impl SchedulerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `MAX_ATTEMPTS` | `3` | Attempts before a job is terminally failed |
    /// | `OCR_TIMEOUT_MS` | `60000` | Extraction call timeout |
    /// | `OCR_DELAY_MS` | `1000` | Throttle delay before each call |
    /// | `APP_ENV` | (unset) | `development` disables retry backoff |
    pub fn from_env() -> Self {
        let max_attempts = std::env::var(ENV_MAX_ATTEMPTS)
            .ok()
            .and_then(|v| v.parse::<i32>().ok())
            .unwrap_or(MAX_ATTEMPTS)
            .max(1);

        let timeout_ms = std::env::var(ENV_OCR_TIMEOUT_MS)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(OCR_TIMEOUT_MS);

        let throttle_ms = std::env::var(ENV_OCR_DELAY_MS)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(OCR_DELAY_MS);

        let zero_backoff = std::env::var(ENV_APP_ENV)
            .map(|v| v.eq_ignore_ascii_case(DEV_ENVIRONMENT))
            .unwrap_or(false);

        Self {
            max_attempts,
            timeout_ms,
            throttle_ms,
            zero_backoff,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: i32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }

    pub fn with_throttle_ms(mut self, ms: u64) -> Self {
        self.throttle_ms = ms;
        self
    }

    pub fn with_zero_backoff(mut self, zero_backoff: bool) -> Self {
        self.zero_backoff = zero_backoff;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.zero_backoff)
    }
}
