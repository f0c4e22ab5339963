//! Per-caller sliding-window rate limiting

use crate::config::RateLimitConfig;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// Checks between sweeps that drop callers with no requests in the window
const SWEEP_INTERVAL: u64 = 1024;

/// Sliding window of request instants per caller
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    requests: HashMap<String, VecDeque<Instant>>,
    checks_since_sweep: u64,
}

impl RateLimiter {
    /// Create a limiter from the configured window and request ceiling
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            max_requests: config.max_requests,
            window: config.window(),
            requests: HashMap::new(),
            checks_since_sweep: 0,
        }
    }

    /// Record a request for `caller_id`, or refuse it if the window is full
    pub fn check(&mut self, caller_id: &str) -> bool {
        self.check_at(caller_id, Instant::now())
    }

    /// Same as [`RateLimiter::check`] with an explicit clock reading
    pub fn check_at(&mut self, caller_id: &str, now: Instant) -> bool {
        self.checks_since_sweep += 1;
        if self.checks_since_sweep >= SWEEP_INTERVAL {
            self.sweep(now);
        }

        let window = self.window;
        let history = self.requests.entry(caller_id.to_string()).or_default();
        while let Some(&oldest) = history.front() {
            if now.saturating_duration_since(oldest) >= window {
                history.pop_front();
            } else {
                break;
            }
        }

        if history.len() >= self.max_requests as usize {
            return false;
        }
        history.push_back(now);
        true
    }

    /// Requests still counted against the caller
    pub fn requests_in_window(&self, caller_id: &str) -> usize {
        self.requests.get(caller_id).map_or(0, VecDeque::len)
    }

    /// Get number of callers with state held
    pub fn tracked_callers(&self) -> usize {
        self.requests.len()
    }

    /// Requests allowed per window
    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Length of the sliding window
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Forget every caller
    pub fn reset(&mut self) {
        self.requests.clear();
        self.checks_since_sweep = 0;
    }

    fn sweep(&mut self, now: Instant) {
        let window = self.window;
        self.requests.retain(|_, history| {
            history
                .back()
                .is_some_and(|&latest| now.saturating_duration_since(latest) < window)
        });
        self.checks_since_sweep = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32, window_secs: u64) -> RateLimiter {
        RateLimiter::new(&RateLimitConfig { max_requests, window_secs })
    }

    #[test]
    fn test_blocks_after_limit() {
        let mut limiter = limiter(3, 60);
        let now = Instant::now();

        assert!(limiter.check_at("alice", now));
        assert!(limiter.check_at("alice", now));
        assert!(limiter.check_at("alice", now));
        assert!(!limiter.check_at("alice", now));

        // Other callers have their own budget
        assert!(limiter.check_at("bob", now));
    }

    #[test]
    fn test_window_slides() {
        let mut limiter = limiter(2, 60);
        let start = Instant::now();

        assert!(limiter.check_at("alice", start));
        assert!(limiter.check_at("alice", start + Duration::from_secs(30)));
        assert!(!limiter.check_at("alice", start + Duration::from_secs(59)));

        // First request has left the window, second has not
        assert!(limiter.check_at("alice", start + Duration::from_secs(60)));
        assert!(!limiter.check_at("alice", start + Duration::from_secs(61)));
        assert_eq!(limiter.requests_in_window("alice"), 2);
    }

    #[test]
    fn test_refused_requests_do_not_count() {
        let mut limiter = limiter(1, 10);
        let start = Instant::now();

        assert!(limiter.check_at("alice", start));
        for s in 1..10 {
            assert!(!limiter.check_at("alice", start + Duration::from_secs(s)));
        }
        assert!(limiter.check_at("alice", start + Duration::from_secs(10)));
    }

    #[test]
    fn test_sweep_drops_idle_callers() {
        let mut limiter = limiter(5, 1);
        let start = Instant::now();
        limiter.check_at("idle", start);

        let later = start + Duration::from_secs(5);
        for _ in 0..SWEEP_INTERVAL {
            limiter.check_at("busy", later);
        }
        assert_eq!(limiter.tracked_callers(), 1);
        assert_eq!(limiter.requests_in_window("idle"), 0);
    }
}
