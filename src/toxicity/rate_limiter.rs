// Minimum-interval rate limiter for scorer API calls.
//
// Perspective's free tier allows about one query per second. Each caller
// reserves the next free slot under a short lock, then sleeps outside the
// lock until that slot arrives, so concurrent evaluations queue up in order
// instead of all firing at once.
//
// Callers with a deadline use `acquire_before`, which refuses to reserve a
// slot it could not reach in time. A slot is only ever handed to a caller
// that will be awake to use it.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

#[derive(Clone)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    /// Allow at most `requests_per_second` requests per second.
    pub fn new(requests_per_second: f64) -> Self {
        Self {
            interval: Duration::from_secs_f64(1.0 / requests_per_second),
            next_slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Wait until a request is allowed, then return.
    pub async fn acquire(&self) {
        let wait_until = self.reserve(None).await.unwrap_or_else(Instant::now);
        tokio::time::sleep_until(wait_until).await;
    }

    /// Wait for a slot that starts strictly before `deadline`.
    ///
    /// Fails immediately, without reserving anything, when the next free
    /// slot is at or past the deadline.
    pub async fn acquire_before(&self, deadline: Instant) -> Result<()> {
        let Some(wait_until) = self.reserve(Some(deadline)).await else {
            anyhow::bail!("rate limit: no request slot free before the deadline");
        };
        tokio::time::sleep_until(wait_until).await;
        Ok(())
    }

    /// Reserve the next slot, or return None if it isn't before `deadline`.
    async fn reserve(&self, deadline: Option<Instant>) -> Option<Instant> {
        let mut next_slot = self.next_slot.lock().await;
        let now = Instant::now();
        let slot = match *next_slot {
            Some(slot) if slot > now => slot,
            _ => now,
        };
        if deadline.is_some_and(|d| slot >= d) {
            return None;
        }
        *next_slot = Some(slot + self.interval);
        Some(slot)
    }
}
