//! Reconnect backoff

use std::time::Duration;

/// Largest exponent applied to the base delay
const MAX_EXPONENT: u32 = 16;

/// Capped exponential backoff
///
/// Delays run `base, 2·base, 4·base, …` and never exceed `cap`. The supervisor
/// caps stream retries at the domain's poll interval, so a recovered gateway
/// is picked up within one poll period.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    cap: Duration,
    attempt: u32,
}

impl Backoff {
    /// Create a backoff starting at `base` and capped at `cap`
    #[must_use]
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self {
            base,
            cap,
            attempt: 0,
        }
    }

    /// Delay before the next attempt
    pub fn next_delay(&mut self) -> Duration {
        let exponent = self.attempt.min(MAX_EXPONENT);
        self.attempt = self.attempt.saturating_add(1);
        self.base
            .checked_mul(1 << exponent)
            .unwrap_or(self.cap)
            .min(self.cap)
    }

    /// Start over from `base`
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Change the upper bound
    pub fn set_cap(&mut self, cap: Duration) {
        self.cap = cap;
    }

    /// Attempts made since the last reset
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempt
    }
}
