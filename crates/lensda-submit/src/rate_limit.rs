//! Global submission rate limit
//!
//! A GCRA limiter from `governor`, shared by every worker. It allows a burst
//! of `max_qps` cells and then replenishes them at `max_qps` per second, so no
//! one-second window sees more than `max_qps` fresh acquisitions beyond the
//! initial burst.
//!
//! Time is read from tokio's clock and waits go through `tokio::time::sleep`,
//! so the limiter follows a paused runtime clock in tests.

use governor::clock::Clock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::Quota;
use std::fmt;
use std::num::NonZeroU32;

/// `governor` clock reading `tokio::time::Instant`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        tokio::time::Instant::now().into_std()
    }
}

type DirectLimiter =
    governor::RateLimiter<NotKeyed, InMemoryState, TokioClock, NoOpMiddleware<std::time::Instant>>;

/// Limits submissions per second across all workers
pub struct RateLimiter {
    inner: DirectLimiter,
    max_qps: NonZeroU32,
}

impl RateLimiter {
    /// `max_qps` of zero is treated as one
    pub fn new(max_qps: u32) -> Self {
        let max_qps = NonZeroU32::new(max_qps).unwrap_or(NonZeroU32::MIN);
        Self {
            inner: DirectLimiter::direct_with_clock(Quota::per_second(max_qps), &TokioClock),
            max_qps,
        }
    }

    /// Wait until a cell is available and take it
    pub async fn acquire(&self) {
        while let Err(not_until) = self.inner.check() {
            tokio::time::sleep(not_until.wait_time_from(TokioClock.now())).await;
        }
    }

    /// Take a cell only if one is available right now
    pub fn try_acquire(&self) -> bool {
        self.inner.check().is_ok()
    }

    pub fn max_qps(&self) -> u32 {
        self.max_qps.get()
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("max_qps", &self.max_qps)
            .finish()
    }
}
