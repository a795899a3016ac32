// SPDX-FileCopyrightText: 2026 Recado Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed-window rate limiting keyed by client address.
//!
//! Counters live in an in-memory map; stale windows are swept periodically
//! to bound memory. A multi-instance deployment must move this state to a
//! shared atomic store for the per-window cap to hold cluster-wide.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use recado_core::RecadoError;
use tracing::debug;

struct Window {
    count: u32,
    reset_at: Instant,
}

/// Fixed-window request counter.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    windows: DashMap<String, Window>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: DashMap::new(),
        }
    }

    /// Count a request against `key`.
    ///
    /// Returns [`RecadoError::RateLimited`] with a retry-after hint once the
    /// key exceeds the per-window maximum.
    pub fn check(&self, key: &str) -> Result<(), RecadoError> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> Result<(), RecadoError> {
        let mut entry = self.windows.entry(key.to_string()).or_insert_with(|| Window {
            count: 0,
            reset_at: now + self.window,
        });

        if now >= entry.reset_at {
            entry.count = 0;
            entry.reset_at = now + self.window;
        }

        if entry.count >= self.max_requests {
            let retry_after_secs = entry
                .reset_at
                .saturating_duration_since(now)
                .as_secs()
                .max(1);
            return Err(RecadoError::RateLimited { retry_after_secs });
        }

        entry.count += 1;
        Ok(())
    }

    /// Drop windows that have fully elapsed.
    pub fn sweep(&self) {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows.retain(|_, w| w.reset_at > now);
        let dropped = before - self.windows.len();
        if dropped > 0 {
            debug!(dropped, "swept stale rate-limit windows");
        }
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_101st_request_is_rejected_with_a_retry_hint() {
        let limiter = RateLimiter::new(100, Duration::from_secs(60));
        let now = Instant::now();

        for _ in 0..100 {
            limiter.check_at("1.2.3.4", now).unwrap();
        }
        match limiter.check_at("1.2.3.4", now) {
            Err(RecadoError::RateLimited { retry_after_secs }) => {
                assert!(retry_after_secs > 0);
                assert!(retry_after_secs <= 60);
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[test]
    fn a_new_window_admits_the_key_again() {
        let limiter = RateLimiter::new(100, Duration::from_secs(60));
        let now = Instant::now();

        for _ in 0..100 {
            limiter.check_at("1.2.3.4", now).unwrap();
        }
        assert!(limiter.check_at("1.2.3.4", now).is_err());

        let later = now + Duration::from_secs(61);
        assert!(limiter.check_at("1.2.3.4", later).is_ok());
    }

    #[test]
    fn keys_are_counted_independently() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();

        limiter.check_at("1.2.3.4", now).unwrap();
        assert!(limiter.check_at("1.2.3.4", now).is_err());
        assert!(limiter.check_at("5.6.7.8", now).is_ok());
    }

    #[test]
    fn sweep_bounds_memory() {
        let limiter = RateLimiter::new(100, Duration::from_millis(0));
        let now = Instant::now();
        for i in 0..50 {
            let _ = limiter.check_at(&format!("10.0.0.{i}"), now);
        }
        assert_eq!(limiter.tracked_keys(), 50);

        // Zero-length windows are already elapsed.
        std::thread::sleep(Duration::from_millis(5));
        limiter.sweep();
        assert_eq!(limiter.tracked_keys(), 0);
    }
}
