//! Retry hint for transient failures
//!
//! The engine owns the retry counter and the re-delivery schedule; this only
//! computes what to report back.

use std::time::Duration;

/// Retry budget assumed when the engine has not set one yet
pub const DEFAULT_RETRIES: i32 = 3;

/// Delay before the engine re-delivers a failed task
pub const RETRY_DELAY: Duration = Duration::from_millis(60_000);

/// Remaining retries and delay to report with a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    pub remaining: u32,
    pub delay_ms: u64,
}

/// Fixed-delay countdown policy (no exponential backoff)
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    default_retries: i32,
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            default_retries: DEFAULT_RETRIES,
            delay: RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(default_retries: i32, delay: Duration) -> Self {
        Self {
            default_retries,
            delay,
        }
    }

    /// Decrement the engine's retry counter by one, floored at zero
    pub fn next(&self, current_retries: Option<i32>) -> RetryState {
        let current = current_retries.unwrap_or(self.default_retries);
        let remaining = current.saturating_sub(1).max(0) as u32;

        RetryState {
            remaining,
            delay_ms: self.delay.as_millis() as u64,
        }
    }
}
