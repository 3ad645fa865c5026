//! Global request pacing
//!
//! One token-bucket limiter is shared by every job in the process so the
//! outbound request rate stays under the workspace's published budget
//! regardless of concurrency. A token is acquired immediately before each
//! send and never held across retries.

use std::num::NonZeroU32;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

/// Process-wide token bucket over the workspace request budget
pub struct RequestPacer {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl RequestPacer {
    /// Create a pacer refilling at `req_per_sec` tokens per second
    ///
    /// A zero rate is clamped to one request per second.
    #[must_use]
    pub fn new(req_per_sec: u32) -> Self {
        let rate = NonZeroU32::new(req_per_sec.max(1)).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: RateLimiter::direct(Quota::per_second(rate)),
        }
    }

    /// Wait until one request token is available
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }
}

impl std::fmt::Debug for RequestPacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPacer").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn burst_is_paced() {
        let pacer = RequestPacer::new(10);
        let start = Instant::now();
        // The bucket starts full at capacity 10; the 11th acquisition waits.
        for _ in 0..11 {
            pacer.acquire().await;
        }
        assert!(start.elapsed().as_millis() >= 90);
    }

    #[tokio::test]
    async fn zero_rate_is_clamped() {
        let pacer = RequestPacer::new(0);
        pacer.acquire().await;
    }
}
