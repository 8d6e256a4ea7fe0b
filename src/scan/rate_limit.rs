//! Outbound request pacing.
//!
//! The rate limiter is the one shared mutable resource in a scan. Each
//! `acquire` reserves the next free time slot under a fair async mutex and
//! sleeps until it arrives, so bursts beyond the configured rate queue in
//! arrival order rather than being dropped, and no waiter can be starved.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::RateLimitConfig;

#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    next_free: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let rps = config.requests_per_second.max(0.001);
        Self {
            min_interval: Duration::from_secs_f64(1.0 / rps),
            next_free: Mutex::new(None),
        }
    }

    /// Wait for the next request slot.
    pub async fn acquire(&self) {
        let slot = {
            let mut next_free = self.next_free.lock().await;
            let now = Instant::now();
            let slot = match *next_free {
                Some(at) if at > now => at,
                _ => now,
            };
            *next_free = Some(slot + self.min_interval);
            slot
        };
        // Sleep outside the lock so later arrivals can reserve their slots.
        if slot > Instant::now() {
            tokio::time::sleep_until(slot).await;
        }
    }
}
