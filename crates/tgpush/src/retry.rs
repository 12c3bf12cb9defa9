//! Linear retry policy.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timeout and retry parameters for one dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Budget for each attempt in milliseconds; `0` means unbounded.
    pub timeout_ms: u64,
    /// Additional attempts after the first one.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay_ms: u64,
    /// Added to the delay for every subsequent retry.
    pub delay_increment_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_retries: 0,
            initial_delay_ms: 1000,
            delay_increment_ms: 1000,
        }
    }
}

impl RetryPolicy {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    /// Total number of attempts, the first one included.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry `retry` (1-based):
    /// `initial_delay + (retry - 1) * delay_increment`.
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        let steps = u64::from(retry.saturating_sub(1));
        let delay_ms = self
            .initial_delay_ms
            .saturating_add(steps.saturating_mul(self.delay_increment_ms));
        Duration::from_millis(delay_ms)
    }
}
