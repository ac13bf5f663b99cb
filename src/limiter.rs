//! Token-bucket rate limiting
//!
//! One [`RateLimiter`] bounds one dimension of outbound work. The crawl uses
//! three independent instances: page fetches, store reads and store writes.

use crate::config::BucketConfig;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::Quota;
use std::num::NonZeroU32;
use std::time::Duration;

/// A bucket of `tokens_per_interval` permits refilled over every `interval`
///
/// The bucket starts full, so up to `tokens_per_interval` acquires pass at
/// once; after that permits are released evenly across the interval.
pub struct RateLimiter {
    tokens_per_interval: u32,
    interval: Duration,
    limiter: governor::RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl RateLimiter {
    /// Creates a limiter granting `tokens_per_interval` permits per `interval_ms`
    ///
    /// Zero values are clamped to 1 so the bucket can always make progress.
    pub fn new(tokens_per_interval: u32, interval_ms: u64) -> Self {
        let burst = NonZeroU32::new(tokens_per_interval).unwrap_or(NonZeroU32::MIN);
        let interval = Duration::from_millis(interval_ms.max(1));

        // One permit is replenished every interval / tokens
        let period = (interval / burst.get()).max(Duration::from_nanos(1));
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);

        Self {
            tokens_per_interval: burst.get(),
            interval,
            limiter: governor::RateLimiter::direct(quota),
        }
    }

    /// Creates a limiter from a configured bucket
    pub fn from_config(config: &BucketConfig) -> Self {
        Self::new(config.tokens, config.interval_ms)
    }

    /// Waits until a permit is available and consumes it
    ///
    /// Suspends the calling task only; never fails.
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }

    /// Tokens per interval this bucket was configured with
    pub fn tokens_per_interval(&self) -> u32 {
        self.tokens_per_interval
    }

    /// Refill interval this bucket was configured with
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// governor keeps its own clock; allow for drift against `std::time`
    const SLACK_MS: u64 = 2;

    #[tokio::test]
    async fn test_first_acquire_is_immediate() {
        let limiter = RateLimiter::new(1, 10_000);
        let start = std::time::Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_sequential_acquires_are_spaced() {
        let limiter = RateLimiter::new(1, 150);
        let start = std::time::Instant::now();
        for _ in 0..4 {
            limiter.acquire().await;
        }
        // N acquires take at least (N - 1) intervals, less clock slack
        assert!(start.elapsed() >= Duration::from_millis(3 * 150 - SLACK_MS));
    }

    #[tokio::test]
    async fn test_burst_up_to_bucket_size() {
        let limiter = RateLimiter::new(3, 10_000);
        let start = std::time::Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_budget() {
        let limiter = Arc::new(RateLimiter::new(1, 100));
        let start = std::time::Instant::now();

        let mut handles = Vec::new();
        for _ in 0..5 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move { limiter.acquire().await }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Five tokens from a one-token bucket: four refills are needed
        assert!(start.elapsed() >= Duration::from_millis(4 * 100 - SLACK_MS));
    }

    #[tokio::test]
    async fn test_multi_token_bucket_spreads_refills() {
        // 2 permits per 200ms: after the initial burst one permit every 100ms
        let limiter = RateLimiter::new(2, 200);
        let start = std::time::Instant::now();
        for _ in 0..4 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() >= Duration::from_millis(2 * 100 - SLACK_MS));
    }

    #[test]
    fn test_from_config() {
        let limiter = RateLimiter::from_config(&BucketConfig {
            tokens: 5,
            interval_ms: 1000,
        });
        assert_eq!(limiter.tokens_per_interval(), 5);
        assert_eq!(limiter.interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_zero_values_are_clamped() {
        let limiter = RateLimiter::new(0, 0);
        assert_eq!(limiter.tokens_per_interval(), 1);
        assert_eq!(limiter.interval(), Duration::from_millis(1));
    }
}
