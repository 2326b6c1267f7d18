//! Reconnect delay strategies.
//!
//! The subscriber asks its policy for a delay after every failed or lost
//! connection. `attempt` counts consecutive failures starting at 1 and is
//! reset once a connection opens. Returning `None` ends the session.

use std::time::Duration;

/// Delay used by the dashboard since the first release.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(5000);

pub trait ReconnectPolicy: Send + Sync + std::fmt::Debug {
    fn next_delay(&self, attempt: u32) -> Option<Duration>;
}

/// Same delay every time, retrying forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::new(DEFAULT_RECONNECT_DELAY)
    }
}

impl ReconnectPolicy for FixedDelay {
    fn next_delay(&self, _attempt: u32) -> Option<Duration> {
        Some(self.delay)
    }
}

/// `base * 2^(attempt - 1)`, capped at `max`, retrying forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    base: Duration,
    max: Duration,
}

impl ExponentialBackoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }
}

impl ReconnectPolicy for ExponentialBackoff {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        Some(self.base.saturating_mul(factor).min(self.max))
    }
}

/// Wraps another policy and gives up after `max_attempts` consecutive failures.
#[derive(Debug, Clone)]
pub struct Limited<P> {
    inner: P,
    max_attempts: u32,
}

impl<P: ReconnectPolicy> Limited<P> {
    pub fn new(inner: P, max_attempts: u32) -> Self {
        Self {
            inner,
            max_attempts,
        }
    }
}

impl<P: ReconnectPolicy> ReconnectPolicy for Limited<P> {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt > self.max_attempts {
            return None;
        }
        self.inner.next_delay(attempt)
    }
}
