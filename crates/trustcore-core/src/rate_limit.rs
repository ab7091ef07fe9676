// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Trustcore Project Contributors

//! Sliding-window rate limiting, keyed by an arbitrary caller-chosen string
//! (typically a session id or `(session_id, tool)` pair).
//!
//! Requires the `std` feature: the sliding window is a per-key mutex-guarded
//! deque, and `parking_lot` is not available on bare `no_std` targets.

use alloc::collections::VecDeque;
use alloc::string::String;
use std::collections::HashMap;
use std::sync::RwLock;

use parking_lot::Mutex;

use crate::types::RateLimitResult;

/// Sliding-window rate limiter. One window per key; windows are created
/// lazily on first use and never removed.
pub struct RateLimiter {
    windows: RwLock<HashMap<String, Mutex<VecDeque<u64>>>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    /// Create an empty rate limiter.
    pub fn new() -> Self {
        RateLimiter { windows: RwLock::new(HashMap::new()) }
    }

    fn evict_and_snapshot(window: &mut VecDeque<u64>, now_ms: u64, window_ms: u64) {
        let floor = now_ms.saturating_sub(window_ms);
        while matches!(window.front(), Some(oldest) if *oldest < floor) {
            window.pop_front();
        }
    }

    /// Check whether `key` has headroom for one more action within
    /// `window_ms`, without consuming it. Call [`RateLimiter::record`]
    /// separately once the action is actually admitted.
    pub fn check(&self, key: &str, max_count: u32, window_ms: u64, now_ms: u64) -> RateLimitResult {
        let windows = self.windows.read().unwrap_or_else(|poison| poison.into_inner());
        let Some(window) = windows.get(key) else {
            return RateLimitResult { allowed: max_count > 0, remaining: max_count, reset_at_ms: now_ms + window_ms };
        };
        let mut window = window.lock();
        Self::evict_and_snapshot(&mut window, now_ms, window_ms);
        let used = window.len() as u32;
        let reset_at_ms = window.front().map(|oldest| oldest + window_ms).unwrap_or(now_ms + window_ms);
        RateLimitResult { allowed: used < max_count, remaining: max_count.saturating_sub(used), reset_at_ms }
    }

    /// Record one action against `key` at `now_ms`. Idempotent evictions
    /// happen lazily on the next [`RateLimiter::check`] or `record`.
    pub fn record(&self, key: &str, now_ms: u64) {
        {
            let windows = self.windows.read().unwrap_or_else(|poison| poison.into_inner());
            if let Some(window) = windows.get(key) {
                window.lock().push_back(now_ms);
                return;
            }
        }
        let mut windows = self.windows.write().unwrap_or_else(|poison| poison.into_inner());
        windows
            .entry(key.into())
            .or_insert_with(|| Mutex::new(VecDeque::new()))
            .lock()
            .push_back(now_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_max_count_within_window() {
        let limiter = RateLimiter::new();
        for i in 0..3 {
            let result = limiter.check("session-a", 3, 1_000, i * 100);
            assert!(result.allowed);
            limiter.record("session-a", i * 100);
        }
        let result = limiter.check("session-a", 3, 1_000, 300);
        assert!(!result.allowed);
        assert_eq!(result.remaining, 0);
    }

    #[test]
    fn evicts_entries_older_than_window() {
        let limiter = RateLimiter::new();
        limiter.record("session-b", 0);
        limiter.record("session-b", 10);
        let result = limiter.check("session-b", 2, 1_000, 2_000);
        assert!(result.allowed);
        assert_eq!(result.remaining, 2);
    }

    #[test]
    fn keys_are_independent() {
        let limiter = RateLimiter::new();
        limiter.record("a", 0);
        limiter.record("a", 1);
        let a = limiter.check("a", 2, 1_000, 2);
        let b = limiter.check("b", 2, 1_000, 2);
        assert!(!a.allowed);
        assert!(b.allowed);
    }
}
