//! Per-host rate limiting for outbound page fetches.

use dashmap::DashMap;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Spaces out requests to the same host by at least `min_delay`.
pub struct RateLimiter {
    min_delay: Duration,
    last_request: DashMap<String, Instant>,
}

impl RateLimiter {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            last_request: DashMap::new(),
        }
    }

    /// Wait until a request to `host` is allowed, then record it.
    pub async fn wait(&self, host: &str) {
        if self.min_delay.is_zero() {
            return;
        }

        // Copy the instant out so the shard lock isn't held across the sleep.
        let last = self.last_request.get(host).map(|entry| *entry);
        if let Some(last) = last {
            let elapsed = last.elapsed();
            if elapsed < self.min_delay {
                sleep(self.min_delay - elapsed).await;
            }
        }

        self.last_request.insert(host.to_string(), Instant::now());
    }

    pub fn tracked_hosts(&self) -> usize {
        self.last_request.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Duration::from_millis(200))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_zero_delay_tracks_nothing() {
        let limiter = RateLimiter::new(Duration::ZERO);
        limiter.wait("example.com").await;
        assert_eq!(limiter.tracked_hosts(), 0);
    }

    #[tokio::test]
    async fn test_second_request_to_same_host_waits() {
        let limiter = RateLimiter::new(Duration::from_millis(40));
        limiter.wait("example.com").await;
        let start = Instant::now();
        limiter.wait("example.com").await;
        assert!(start.elapsed() >= Duration::from_millis(30));

        let other = Instant::now();
        limiter.wait("other.example").await;
        assert!(other.elapsed() < Duration::from_millis(30));
        assert_eq!(limiter.tracked_hosts(), 2);
    }
}
