//! Admission control for outbound queries.
//!
//! A sliding-window log limiter: the exact timestamps of accepted requests
//! are retained for one trailing window and pruned on every check. Burst
//! behavior is exact over the window, at the cost of O(window occupancy)
//! pruning per check; windows hold tens of entries at most.
//!
//! The check is enforced once, at the single-query executor boundary, and
//! protects the externally-billed engine from request storms caused by
//! legitimate high fan-out or client retry loops.

mod config;

pub use config::LimiterConfig;

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::warn;

/// Sliding-window log rate limiter.
///
/// All reads and writes of the timestamp log happen under one mutex. State
/// is in-process only and not persisted across restarts.
pub struct RateLimiter {
    requests: Mutex<VecDeque<Instant>>,
    config: LimiterConfig,
}

impl RateLimiter {
    pub fn new(config: LimiterConfig) -> Self {
        Self { requests: Mutex::new(VecDeque::new()), config }
    }

    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }

    /// Check whether a new query is admitted, recording it when it is.
    /// Denied attempts are not recorded.
    pub fn is_allowed(&self) -> bool {
        self.check_at(Instant::now())
    }

    /// Current occupancy of the trailing window. Records nothing.
    pub fn current_rate(&self) -> usize {
        self.rate_at(Instant::now())
    }

    fn check_at(&self, now: Instant) -> bool {
        let mut requests = self.lock();
        Self::prune(&mut requests, now, self.config.window);

        if requests.len() >= self.config.max_requests {
            warn!(
                occupancy = requests.len(),
                max = self.config.max_requests,
                "rate limit exceeded"
            );
            return false;
        }

        requests.push_back(now);
        true
    }

    fn rate_at(&self, now: Instant) -> usize {
        let mut requests = self.lock();
        Self::prune(&mut requests, now, self.config.window);
        requests.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Instant>> {
        self.requests.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // Retention is strictly `age < window`: a timestamp exactly one window
    // old no longer counts against admission.
    fn prune(requests: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while let Some(front) = requests.front() {
            if now.duration_since(*front) >= window {
                requests.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: usize, window_secs: u64) -> RateLimiter {
        RateLimiter::new(LimiterConfig {
            max_requests,
            window: Duration::from_secs(window_secs),
        })
    }

    #[test]
    fn test_allows_up_to_max() {
        let limiter = limiter(2, 60);
        let base = Instant::now();

        assert!(limiter.check_at(base));
        assert!(limiter.check_at(base + Duration::from_secs(1)));
        assert!(!limiter.check_at(base + Duration::from_secs(2)));
    }

    #[test]
    fn test_denied_attempt_not_recorded() {
        let limiter = limiter(1, 60);
        let base = Instant::now();

        assert!(limiter.check_at(base));
        assert!(!limiter.check_at(base + Duration::from_secs(1)));
        assert!(!limiter.check_at(base + Duration::from_secs(2)));
        assert_eq!(limiter.rate_at(base + Duration::from_secs(2)), 1);
    }

    #[test]
    fn test_window_rolls_over() {
        // max=2, window=60s: allow at t=0 and t=1, deny at t=2. At t=61
        // both earlier entries have aged out (61s and exactly 60s), so a
        // new check is admitted again.
        let limiter = limiter(2, 60);
        let base = Instant::now();

        assert!(limiter.check_at(base));
        assert!(limiter.check_at(base + Duration::from_secs(1)));
        assert!(!limiter.check_at(base + Duration::from_secs(2)));
        assert!(limiter.check_at(base + Duration::from_secs(61)));
        assert_eq!(limiter.rate_at(base + Duration::from_secs(61)), 1);
    }

    #[test]
    fn test_boundary_is_exclusive_at_exact_window_age() {
        let limiter = limiter(10, 60);
        let base = Instant::now();

        assert!(limiter.check_at(base));
        // one millisecond short of the window: still counted
        assert_eq!(
            limiter.rate_at(base + Duration::from_secs(60) - Duration::from_millis(1)),
            1
        );
        // exactly one window old: pruned
        assert_eq!(limiter.rate_at(base + Duration::from_secs(60)), 0);
    }

    #[test]
    fn test_current_rate_does_not_record() {
        let limiter = limiter(5, 60);
        let base = Instant::now();

        assert!(limiter.check_at(base));
        assert_eq!(limiter.rate_at(base), 1);
        assert_eq!(limiter.rate_at(base), 1);
        assert_eq!(limiter.rate_at(base), 1);
    }

    #[test]
    fn test_zero_max_denies_everything() {
        let limiter = limiter(0, 60);
        assert!(!limiter.is_allowed());
        assert_eq!(limiter.current_rate(), 0);
    }
}
