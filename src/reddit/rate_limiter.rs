// Interval rate limiter for Reddit API calls.
//
// OAuth clients may make 100 requests per minute. Rather than track a window,
// we space requests evenly: each call waits until at least `interval` has
// passed since the previous one was let through.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

/// Reddit's documented OAuth budget.
pub const REDDIT_REQUESTS_PER_MINUTE: u32 = 100;

#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<Option<Instant>>>,
    interval: Duration,
}

impl RateLimiter {
    /// Allow at most `requests` calls per minute, evenly spaced.
    pub fn per_minute(requests: u32) -> Self {
        let interval = Duration::from_secs(60) / requests.max(1);
        Self {
            inner: Arc::new(Mutex::new(None)),
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until the next request is allowed, then claim the slot.
    pub async fn acquire(&self) {
        // Holding the lock across the sleep keeps callers in FIFO order;
        // the bot is sequential so nobody else is waiting anyway.
        let mut last = self.inner.lock().await;
        if let Some(prev) = *last {
            let ready_at = prev + self.interval;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::per_minute(REDDIT_REQUESTS_PER_MINUTE)
    }
}
