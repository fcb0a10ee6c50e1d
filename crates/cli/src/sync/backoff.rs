// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Exponential reconnect backoff.
//!
//! Delay computation is pure; arming the timer is the connection's job.

use std::time::Duration;

/// Default delay before the first reconnect attempt.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1_000);
/// Default ceiling for reconnect delays.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(30_000);

/// Tracks reconnect attempts and yields `min(base * 2^attempt, max)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    attempt: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl ReconnectPolicy {
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        ReconnectPolicy { attempt: 0, base_delay, max_delay }
    }

    /// Number of failed attempts since the last successful handshake.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Delay for attempt `n`, saturating instead of overflowing.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis();
        let max_ms = self.max_delay.as_millis();
        let scaled = 2u128
            .checked_pow(attempt)
            .and_then(|factor| base_ms.checked_mul(factor))
            .unwrap_or(u128::MAX);
        Duration::from_millis(u64::try_from(scaled.min(max_ms)).unwrap_or(u64::MAX))
    }

    /// Returns the delay for the current attempt, then counts the attempt.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.delay_for(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    /// Called after a successful handshake.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy::new(DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY)
    }
}
