//! Per-key request rate limiting.
//!
//! The fixed-window limiter keeps one record per key in a process-local
//! table. A record's read-modify-write is atomic per key (dashmap entry
//! API); the post-hoc correction in [`RateLimiter::record_outcome`] is not
//! atomic against interleaved admissions for the same key and may under-
//! or over-correct under concurrent load. Known approximation.
//!
//! Multi-instance deployments would swap the table for an external
//! atomic-increment store behind the same `check` contract.

mod sliding;

pub use sliding::SlidingWindowLimiter;

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// How the limiter key is derived for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyScope {
    /// Forwarded-for header, falling back to the connection address.
    Address,
    /// Authenticated user id.
    User,
}

/// Construction parameters for a [`RateLimiter`].
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Fixed window length.
    pub window: Duration,
    /// Admissions allowed per key per window.
    pub max_requests: u32,
    /// Key derivation for the pipeline stage.
    pub scope: KeyScope,
    /// Refund admissions that ended in a success response.
    pub skip_successful: bool,
    /// Refund admissions that ended in an error response.
    pub skip_failed: bool,
    /// Human-readable limit message for 429 bodies.
    pub message: Option<String>,
}

impl RateLimiterConfig {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            scope: KeyScope::Address,
            skip_successful: false,
            skip_failed: false,
            message: None,
        }
    }
}

/// One key's counter for the current window.
#[derive(Debug, Clone, Copy)]
struct RateLimitRecord {
    count: u32,
    reset_at: Instant,
}

/// Outcome of a limiter check, carried through to response headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at: Instant,
    pub limit: u32,
}

impl RateLimitDecision {
    /// Seconds until the window resets, rounded up. Used for `Retry-After`.
    pub fn retry_after_secs(&self) -> u64 {
        let left = self.reset_at.saturating_duration_since(Instant::now());
        left.as_secs() + u64::from(left.subsec_nanos() > 0)
    }
}

/// Fixed-window limiter.
pub struct RateLimiter {
    config: RateLimiterConfig,
    table: DashMap<String, RateLimitRecord>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self { config, table: DashMap::new() }
    }

    /// General API budget: 100 requests per minute per address.
    pub fn api() -> Self {
        Self::new(RateLimiterConfig::new(Duration::from_secs(60), 100))
    }

    /// Chat endpoint budget: 60 requests per minute per address.
    pub fn chat() -> Self {
        let mut config = RateLimiterConfig::new(Duration::from_secs(60), 60);
        config.message = Some("Too many chat requests, slow down".to_string());
        Self::new(config)
    }

    /// Auth attempt budget: 10 per 15 minutes per address; successful
    /// logins are refunded so only failures burn the budget.
    pub fn auth() -> Self {
        let mut config = RateLimiterConfig::new(Duration::from_secs(15 * 60), 10);
        config.skip_successful = true;
        config.message = Some("Too many sign-in attempts, try again later".to_string());
        Self::new(config)
    }

    /// External data-tool budget: 100 per hour per user.
    pub fn tools() -> Self {
        let mut config = RateLimiterConfig::new(Duration::from_secs(3600), 100);
        config.scope = KeyScope::User;
        config.message = Some("Tool call budget exhausted for this hour".to_string());
        Self::new(config)
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Check and (on admission) count one request for `key`.
    pub fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> RateLimitDecision {
        let max = self.config.max_requests;
        let fresh = RateLimitRecord { count: 0, reset_at: now + self.config.window };

        let mut entry = self.table.entry(key.to_string()).or_insert(fresh);
        if entry.reset_at <= now {
            *entry = fresh;
        }

        if entry.count < max {
            // remaining is computed against the pre-increment count
            let remaining = max.saturating_sub(entry.count).saturating_sub(1);
            entry.count = entry.count.saturating_add(1);
            RateLimitDecision { allowed: true, remaining, reset_at: entry.reset_at, limit: max }
        } else {
            RateLimitDecision { allowed: false, remaining: 0, reset_at: entry.reset_at, limit: max }
        }
    }

    /// Refund one admission for `key` when the configured skip flag
    /// matches the response outcome.
    ///
    /// Racy against interleaved admissions for the same key: the decrement
    /// may land in a newer window than the increment it corrects. Accepted
    /// approximation, kept for parity with the check contract.
    pub fn record_outcome(&self, key: &str, success: bool) {
        let refund =
            (success && self.config.skip_successful) || (!success && self.config.skip_failed);
        if !refund {
            return;
        }
        if let Some(mut entry) = self.table.get_mut(key) {
            entry.count = entry.count.saturating_sub(1);
        }
    }

    /// Drop keys whose window has fully elapsed. Returns removed count.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    fn sweep_at(&self, now: Instant) -> usize {
        let before = self.table.len();
        self.table.retain(|_, record| record.reset_at > now);
        before - self.table.len()
    }

    #[cfg(test)]
    fn record(&self, key: &str) -> Option<(u32, Instant)> {
        self.table.get(key).map(|r| (r.count, r.reset_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(window: Duration, max: u32) -> RateLimiter {
        RateLimiter::new(RateLimiterConfig::new(window, max))
    }

    #[test]
    fn test_admits_up_to_max_then_rejects() {
        let limiter = limiter(Duration::from_secs(60), 3);
        let now = Instant::now();

        for expected_remaining in [2, 1, 0] {
            let decision = limiter.check_at("10.0.0.1", now);
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected_remaining);
            assert_eq!(decision.limit, 3);
        }

        let rejected = limiter.check_at("10.0.0.1", now);
        assert!(!rejected.allowed);
        assert_eq!(rejected.remaining, 0);

        // still rejected anywhere inside the window
        let rejected = limiter.check_at("10.0.0.1", now + Duration::from_secs(59));
        assert!(!rejected.allowed);
    }

    #[test]
    fn test_new_window_resets_count() {
        let limiter = limiter(Duration::from_secs(60), 2);
        let now = Instant::now();

        assert!(limiter.check_at("k", now).allowed);
        assert!(limiter.check_at("k", now).allowed);
        assert!(!limiter.check_at("k", now).allowed);

        // prior rejections don't carry into the fresh window
        let after = now + Duration::from_secs(61);
        let decision = limiter.check_at("k", after);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 1);
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = limiter(Duration::from_secs(60), 1);
        let now = Instant::now();

        assert!(limiter.check_at("a", now).allowed);
        assert!(!limiter.check_at("a", now).allowed);
        assert!(limiter.check_at("b", now).allowed);
    }

    #[test]
    fn test_record_outcome_refunds_only_with_flag() {
        let no_skip = limiter(Duration::from_secs(60), 2);
        let now = Instant::now();
        no_skip.check_at("k", now);
        no_skip.record_outcome("k", true);
        assert_eq!(no_skip.record("k").map(|(c, _)| c), Some(1));

        let auth = RateLimiter::auth();
        auth.check_at("k", now);
        auth.record_outcome("k", true);
        assert_eq!(auth.record("k").map(|(c, _)| c), Some(0));
        // failures still count against the auth budget
        auth.check_at("k", now);
        auth.record_outcome("k", false);
        assert_eq!(auth.record("k").map(|(c, _)| c), Some(1));
    }

    #[test]
    fn test_sweep_drops_expired_windows() {
        let limiter = limiter(Duration::from_secs(60), 5);
        let now = Instant::now();
        limiter.check_at("old", now);
        limiter.check_at("fresh", now + Duration::from_secs(30));

        assert_eq!(limiter.sweep_at(now + Duration::from_secs(61)), 1);
        assert!(limiter.record("old").is_none());
        assert!(limiter.record("fresh").is_some());
    }

    #[test]
    fn test_presets() {
        assert_eq!(RateLimiter::api().config().max_requests, 100);
        assert_eq!(RateLimiter::chat().config().max_requests, 60);
        let auth = RateLimiter::auth();
        assert_eq!(auth.config().max_requests, 10);
        assert!(auth.config().skip_successful);
        let tools = RateLimiter::tools();
        assert_eq!(tools.config().scope, KeyScope::User);
        assert_eq!(tools.config().window, Duration::from_secs(3600));
    }
}
