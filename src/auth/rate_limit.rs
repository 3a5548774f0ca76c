//! Per-client login rate limiting.
//!
//! A sliding window over unix-second timestamps read from the shared
//! [`Clock`]. Only logins that already passed signature checks are recorded.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::debug;

use super::clock::Clock;

/// Sliding-window login limiter keyed by client id.
///
/// A client may log in at most `max_logins` times in any `window`. A login
/// recorded at `t` stops counting at `t + window`.
pub struct LoginRateLimiter {
    logins: Mutex<HashMap<String, VecDeque<i64>>>,
    max_logins: usize,
    window: i64,
    clock: Arc<dyn Clock>,
}

impl LoginRateLimiter {
    pub fn new(max_logins: usize, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            logins: Mutex::new(HashMap::new()),
            max_logins,
            window: window.as_secs() as i64,
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, VecDeque<i64>>> {
        self.logins.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record a login for `client_id` if it is under its limit.
    ///
    /// Returns `false` without recording anything when the client is limited.
    pub fn check_and_record(&self, client_id: &str) -> bool {
        let now = self.clock.now();
        let mut logins = self.lock();
        let history = logins.entry(client_id.to_string()).or_default();

        // Timestamps are pushed in clock order, so stale ones sit at the front
        while history.front().is_some_and(|&t| now - t >= self.window) {
            history.pop_front();
        }

        if history.len() >= self.max_logins {
            return false;
        }
        history.push_back(now);
        true
    }

    /// Forget clients with no login left inside the window.
    pub fn cleanup(&self) -> usize {
        let now = self.clock.now();
        let mut logins = self.lock();
        let before = logins.len();
        logins.retain(|_, history| {
            history.retain(|&t| now - t < self.window);
            !history.is_empty()
        });
        before - logins.len()
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.lock().len()
    }

    /// Periodically run [`cleanup`](Self::cleanup) on a tokio task.
    pub fn start_cleanup_task(self: &Arc<Self>, interval: Duration) {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let removed = limiter.cleanup();
                if removed > 0 {
                    debug!(removed, "Dropped idle login rate limit entries");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;

    const T0: i64 = 1_700_000_000;

    fn limiter(max: usize, window_secs: u64) -> (LoginRateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(T0));
        let limiter = LoginRateLimiter::new(max, Duration::from_secs(window_secs), clock.clone());
        (limiter, clock)
    }

    #[test]
    fn test_blocks_over_limit() {
        let (limiter, _) = limiter(3, 60);

        for _ in 0..3 {
            assert!(limiter.check_and_record("desktop-main"));
        }
        assert!(!limiter.check_and_record("desktop-main"));
    }

    #[test]
    fn test_clients_limited_separately() {
        let (limiter, _) = limiter(1, 60);

        assert!(limiter.check_and_record("desktop-main"));
        assert!(!limiter.check_and_record("desktop-main"));
        assert!(limiter.check_and_record("desktop-laptop"));
    }

    #[test]
    fn test_window_boundary() {
        let (limiter, clock) = limiter(1, 60);
        assert!(limiter.check_and_record("desktop-main"));

        clock.set(T0 + 59);
        assert!(!limiter.check_and_record("desktop-main"));

        // Exactly one window later the first login no longer counts
        clock.set(T0 + 60);
        assert!(limiter.check_and_record("desktop-main"));
        assert!(!limiter.check_and_record("desktop-main"));
    }

    #[test]
    fn test_rejected_attempts_not_recorded() {
        let (limiter, clock) = limiter(2, 60);
        assert!(limiter.check_and_record("desktop-main"));
        clock.advance(30);
        assert!(limiter.check_and_record("desktop-main"));
        for _ in 0..5 {
            assert!(!limiter.check_and_record("desktop-main"));
        }

        // Only the first login has aged out
        clock.set(T0 + 60);
        assert!(limiter.check_and_record("desktop-main"));
        assert!(!limiter.check_and_record("desktop-main"));
    }

    #[test]
    fn test_cleanup_drops_idle_clients() {
        let (limiter, clock) = limiter(5, 60);
        limiter.check_and_record("desktop-main");
        clock.advance(30);
        limiter.check_and_record("desktop-laptop");
        assert_eq!(limiter.tracked_clients(), 2);

        clock.set(T0 + 60);
        assert_eq!(limiter.cleanup(), 1);
        assert_eq!(limiter.tracked_clients(), 1);
    }
}
