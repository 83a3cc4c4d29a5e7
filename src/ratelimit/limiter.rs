//! Core rate limiter implementation.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

use super::clock::{Clock, SystemClock};
use super::window::{ClientWindow, RateLimitDecision, RateLimitPolicy};

/// Fixed-window rate limiter keyed by client identifier.
///
/// This struct is thread-safe and can be shared across multiple tasks.
/// Every check runs its lookup, comparison and update under one lock, so
/// concurrent callers for the same client can never be over-admitted.
pub struct RateLimiter {
    /// Client windows indexed by identifier
    windows: Mutex<HashMap<String, ClientWindow>>,
    /// Time source for window arithmetic
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a new rate limiter driven by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a new rate limiter driven by the given clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Check whether `identifier` may make another request.
    ///
    /// Admitted requests are counted; denied requests are not. An entry
    /// whose window has ended is treated as absent and replaced.
    pub fn check_rate_limit(
        &self,
        identifier: &str,
        max_requests: u32,
        window: Duration,
    ) -> RateLimitDecision {
        let now = self.clock.now_millis();
        let mut windows = self.windows.lock();

        trace!(identifier = %identifier, now = now, "Checking rate limit");

        if let Some(entry) = windows
            .get_mut(identifier)
            .filter(|entry| !entry.is_expired(now))
        {
            if entry.count >= max_requests {
                debug!(
                    identifier = %identifier,
                    count = entry.count,
                    limit = max_requests,
                    window_end = entry.window_end,
                    "Rate limit exceeded"
                );
                return RateLimitDecision::denied(entry);
            }

            entry.count += 1;
            return RateLimitDecision::admitted(max_requests, entry);
        }

        let fresh = ClientWindow::open(now, window);
        debug!(
            identifier = %identifier,
            limit = max_requests,
            window_end = fresh.window_end,
            "Opening new rate limit window"
        );
        windows.insert(identifier.to_string(), fresh);
        RateLimitDecision::admitted(max_requests, &fresh)
    }

    /// Check `identifier` against a configured policy.
    pub fn check(&self, identifier: &str, policy: &RateLimitPolicy) -> RateLimitDecision {
        self.check_rate_limit(identifier, policy.max_requests, policy.window)
    }

    /// Remove every window that has ended.
    ///
    /// Returns the number of entries removed. Admission never depends on
    /// this having run.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now_millis();
        let mut windows = self.windows.lock();
        let before = windows.len();
        windows.retain(|_, window| !window.is_expired(now));
        before - windows.len()
    }

    /// Get the current window for an identifier, expired or not.
    ///
    /// Returns `None` if no entry exists for the identifier.
    pub fn window(&self, identifier: &str) -> Option<ClientWindow> {
        self.windows.lock().get(identifier).copied()
    }

    /// The clock this limiter reads.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Clear all windows.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.windows.lock().clear();
    }

    /// Get the number of tracked client windows, including expired ones
    /// not yet swept.
    pub fn window_count(&self) -> usize {
        self.windows.lock().len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("windows", &self.window_count())
            .finish()
    }
}
