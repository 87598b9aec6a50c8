//! Bounded exponential backoff.
//!
//! Pure delay computation for remote resolution retries. Attempt `n`
//! (0-indexed) waits `base * 2^n`, capped at `cap`.

use std::time::Duration;

/// Default number of retry delays.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);
/// Default ceiling for any single delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(4000);

/// The delay after attempt `attempt`: `base * 2^attempt`, capped at `cap`.
#[must_use]
pub fn delay(attempt: u32, base: Duration, cap: Duration) -> Duration {
    let scaled = 1_u32
        .checked_shl(attempt)
        .and_then(|factor| base.checked_mul(factor))
        .unwrap_or(Duration::MAX);
    scaled.min(cap)
}

/// The delays for attempts `0..max_retries`, in order.
#[must_use]
pub fn schedule(max_retries: u32, base: Duration, cap: Duration) -> Vec<Duration> {
    (0..max_retries)
        .map(|attempt| delay(attempt, base, cap))
        .collect()
}

/// Retry timing for remote resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Number of retry delays (the loop makes `max_retries + 1` attempts).
    pub max_retries: u32,
    /// Delay after the first failed attempt.
    pub base_delay: Duration,
    /// Maximum delay between attempts.
    pub max_delay: Duration,
}

impl BackoffPolicy {
    /// Creates a new backoff policy.
    #[must_use]
    pub const fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    /// A policy that never retries.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self::new(0, Duration::ZERO, Duration::ZERO)
    }

    /// Delay after attempt `attempt`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        delay(attempt, self.base_delay, self.max_delay)
    }

    /// Every retry delay in order.
    #[must_use]
    pub fn schedule(&self) -> Vec<Duration> {
        schedule(self.max_retries, self.base_delay, self.max_delay)
    }

    /// Total attempts a resolution loop makes under this policy.
    #[must_use]
    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY)
    }
}
