//! Sliding-window limiter.
//!
//! Exact counting for callers that can't tolerate the fixed-window burst
//! edge: each key retains its admission timestamps, so a request admitted
//! at `t` counts against every check until `t + window`.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use super::RateLimitDecision;

pub struct SlidingWindowLimiter {
    window: Duration,
    max_requests: u32,
    table: DashMap<String, Vec<Instant>>,
}

impl SlidingWindowLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self { window, max_requests, table: DashMap::new() }
    }

    /// Check and (on admission) record one request for `key`.
    pub fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> RateLimitDecision {
        let max = self.max_requests;
        let mut entry = self.table.entry(key.to_string()).or_default();

        entry.retain(|&admitted| now.saturating_duration_since(admitted) < self.window);

        let count = entry.len() as u32;
        if count < max {
            entry.push(now);
            RateLimitDecision {
                allowed: true,
                remaining: max.saturating_sub(count).saturating_sub(1),
                reset_at: now + self.window,
                limit: max,
            }
        } else {
            // window frees up when the oldest retained admission ages out
            let oldest = entry.first().copied().unwrap_or(now);
            RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_at: oldest + self.window,
                limit: max,
            }
        }
    }

    /// Drop keys with no admissions inside the window.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    fn sweep_at(&self, now: Instant) -> usize {
        let before = self.table.len();
        self.table.retain(|_, admissions| {
            admissions.retain(|&a| now.saturating_duration_since(a) < self.window);
            !admissions.is_empty()
        });
        before - self.table.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admissions_age_out_individually() {
        let limiter = SlidingWindowLimiter::new(Duration::from_secs(10), 2);
        let t0 = Instant::now();

        assert!(limiter.check_at("k", t0).allowed);
        assert!(limiter.check_at("k", t0 + Duration::from_secs(4)).allowed);
        // both admissions still inside the window
        assert!(!limiter.check_at("k", t0 + Duration::from_secs(8)).allowed);
        // t0 admission has aged out, the t0+4 one has not
        assert!(limiter.check_at("k", t0 + Duration::from_secs(11)).allowed);
        assert!(!limiter.check_at("k", t0 + Duration::from_secs(13)).allowed);
    }

    #[test]
    fn test_rejection_reports_when_window_frees() {
        let limiter = SlidingWindowLimiter::new(Duration::from_secs(10), 1);
        let t0 = Instant::now();

        assert!(limiter.check_at("k", t0).allowed);
        let rejected = limiter.check_at("k", t0 + Duration::from_secs(3));
        assert!(!rejected.allowed);
        assert_eq!(rejected.reset_at, t0 + Duration::from_secs(10));
    }

    #[test]
    fn test_sweep_drops_idle_keys() {
        let limiter = SlidingWindowLimiter::new(Duration::from_secs(10), 5);
        let t0 = Instant::now();
        limiter.check_at("idle", t0);
        limiter.check_at("busy", t0 + Duration::from_secs(9));

        assert_eq!(limiter.sweep_at(t0 + Duration::from_secs(12)), 1);
    }
}
