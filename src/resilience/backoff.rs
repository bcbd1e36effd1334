//! Caller-side backoff after a rejected call.
//!
//! The breaker never retries on its own. Callers that get
//! [`BreakerOpen`](crate::resilience::BreakerOpen) use this to space out
//! their next attempt.

use std::time::Duration;
use rand::Rng;

/// Exponential backoff with up to 10% jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Delay before attempt number `attempt` (1-based). Zero for attempt 0.
    pub fn delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let factor = 2u32.saturating_pow(attempt - 1);
        let capped = self.base.saturating_mul(factor).min(self.max);

        let jitter_range = capped / 10;
        let jitter = if jitter_range.is_zero() {
            Duration::ZERO
        } else {
            rand::thread_rng().gen_range(Duration::ZERO..jitter_range)
        };

        capped + jitter
    }
}
