//! Per-host politeness delay. Each host gets its own minimum interval
//! between requests; there is no global throttle. `acquire` suspends the
//! calling task until the interval has elapsed.

use std::collections::HashMap;
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};

struct HostState {
    interval: Duration,
    last_request: Option<Instant>,
}

/// Tracks, per host, the minimum time between requests and the time of
/// the last one. A host absent from the map uses `default_interval`.
pub struct RateLimiter {
    default_interval: Duration,
    hosts: Mutex<HashMap<String, HostState>>,
}

impl RateLimiter {
    pub fn new(default_interval: Duration) -> Self {
        Self {
            default_interval,
            hosts: Mutex::new(HashMap::new()),
        }
    }

    /// Suspends until `now - last(host) >= interval(host)`, then records
    /// `now` as the new last-request time for `host`.
    pub async fn acquire(&self, host: &str) {
        loop {
            let wait = {
                let mut hosts = self.hosts.lock().await;
                let state = hosts.entry(host.to_string()).or_insert_with(|| HostState {
                    interval: self.default_interval,
                    last_request: None,
                });

                let now = Instant::now();
                match state.last_request {
                    Some(last) => {
                        let elapsed = now.duration_since(last);
                        if elapsed >= state.interval {
                            state.last_request = Some(now);
                            None
                        } else {
                            Some(state.interval - elapsed)
                        }
                    }
                    None => {
                        state.last_request = Some(now);
                        None
                    }
                }
            };

            match wait {
                Some(duration) => sleep(duration).await,
                None => return,
            }
        }
    }

    /// Raises `host`'s interval to `max(current, delay)`. Never lowers it,
    /// so a robots.txt `Crawl-delay` or an HTTP 429 response can only make
    /// a host slower, never faster than its configured default.
    pub async fn update_delay(&self, host: &str, delay: Duration) {
        let mut hosts = self.hosts.lock().await;
        let state = hosts.entry(host.to_string()).or_insert_with(|| HostState {
            interval: self.default_interval,
            last_request: None,
        });
        state.interval = state.interval.max(delay);
    }

    /// The interval currently in effect for `host`, or the default if the
    /// host has never been seen.
    pub async fn interval_for(&self, host: &str) -> Duration {
        let hosts = self.hosts.lock().await;
        hosts
            .get(host)
            .map(|s| s.interval)
            .unwrap_or(self.default_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_request_never_waits() {
        let limiter = RateLimiter::new(Duration::from_millis(200));
        let start = Instant::now();
        limiter.acquire("example.com").await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_second_request_waits_for_interval() {
        let limiter = RateLimiter::new(Duration::from_millis(100));
        limiter.acquire("example.com").await;
        let start = Instant::now();
        limiter.acquire("example.com").await;
        assert!(start.elapsed() >= Duration::from_millis(90));
    }

    #[tokio::test]
    async fn test_hosts_are_independent() {
        let limiter = RateLimiter::new(Duration::from_millis(150));
        limiter.acquire("a.test").await;
        let start = Instant::now();
        limiter.acquire("b.test").await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_update_delay_raises_interval() {
        let limiter = RateLimiter::new(Duration::from_millis(50));
        limiter.update_delay("slow.test", Duration::from_millis(500)).await;
        assert_eq!(
            limiter.interval_for("slow.test").await,
            Duration::from_millis(500)
        );
    }

    #[tokio::test]
    async fn test_update_delay_never_lowers() {
        let limiter = RateLimiter::new(Duration::from_millis(500));
        limiter.update_delay("host.test", Duration::from_millis(50)).await;
        assert_eq!(
            limiter.interval_for("host.test").await,
            Duration::from_millis(500)
        );
    }

    #[tokio::test]
    async fn test_interval_for_unknown_host_is_default() {
        let limiter = RateLimiter::new(Duration::from_millis(300));
        assert_eq!(
            limiter.interval_for("never-seen.test").await,
            Duration::from_millis(300)
        );
    }

    #[tokio::test]
    async fn test_update_delay_then_acquire_waits_new_interval() {
        let limiter = RateLimiter::new(Duration::from_millis(10));
        limiter.acquire("host.test").await;
        limiter.update_delay("host.test", Duration::from_millis(150)).await;
        let start = Instant::now();
        limiter.acquire("host.test").await;
        assert!(start.elapsed() >= Duration::from_millis(140));
    }
}
