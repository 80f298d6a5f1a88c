//! Retry scheduling for failed extraction attempts.

use chrono::{DateTime, Duration, Utc};

use fuelscan_core::defaults::{BACKOFF_BASE_MINUTES, MAX_ATTEMPTS};

// 2^20 minutes is roughly two years; anything past that is effectively never.
const MAX_EXPONENT: u32 = 20;

/// Exponential backoff with a terminal attempt threshold.
///
/// The delay after the `n`th failure is `2^n` minutes, counted after the
/// increment: 2, 4, 8. Jobs that reach `max_attempts` are never re-claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: i32,
    /// Skip the delay entirely (accelerated development runs).
    pub zero_delay: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            zero_delay: false,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: i32, zero_delay: bool) -> Self {
        Self {
            max_attempts,
            zero_delay,
        }
    }

    /// Delay before a job with `attempts` failures becomes eligible again.
    pub fn delay(&self, attempts: i32) -> Duration {
        if self.zero_delay {
            return Duration::zero();
        }
        let exponent = u32::try_from(attempts.max(0)).unwrap_or(0).min(MAX_EXPONENT);
        Duration::minutes(BACKOFF_BASE_MINUTES.pow(exponent))
    }

    /// Earliest time a job with `attempts` failures may be claimed again.
    pub fn next_run_at(&self, attempts: i32, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.delay(attempts)
    }

    /// True once the job has used up its attempts.
    pub fn is_terminal(&self, attempts: i32) -> bool {
        attempts >= self.max_attempts
    }
}
