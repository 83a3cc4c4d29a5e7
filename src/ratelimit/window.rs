//! Per-client fixed windows and admission decisions.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Requests admitted per window when a call site does not say otherwise.
pub const DEFAULT_MAX_REQUESTS: u32 = 3;
/// Window length when a call site does not say otherwise.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Admission policy: at most `max_requests` per `window`, per client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimitPolicy {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW)
    }
}

/// Counting state for one client identifier.
///
/// The identifier itself is the key of the owning map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientWindow {
    /// Requests counted in the current window
    pub count: u32,
    /// Epoch milliseconds at which the window ends
    pub window_end: u64,
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub(crate) fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl ClientWindow {
    /// Open a fresh window at `now` with the opening request already counted.
    pub fn open(now: u64, window: Duration) -> Self {
        Self {
            count: 1,
            window_end: now.saturating_add(saturating_millis(window)),
        }
    }

    /// A window is over once `now` reaches its end.
    pub fn is_expired(&self, now: u64) -> bool {
        self.window_end <= now
    }
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Requests still available in the current window
    pub remaining: u32,
    /// Epoch milliseconds at which the caller's window ends
    pub reset_time: u64,
}

impl RateLimitDecision {
    pub(crate) fn admitted(max_requests: u32, window: &ClientWindow) -> Self {
        Self {
            allowed: true,
            remaining: max_requests.saturating_sub(window.count),
            reset_time: window.window_end,
        }
    }

    pub(crate) fn denied(window: &ClientWindow) -> Self {
        Self {
            allowed: false,
            remaining: 0,
            reset_time: window.window_end,
        }
    }

    /// The reset time as a UTC timestamp.
    pub fn reset_at(&self) -> DateTime<Utc> {
        i64::try_from(self.reset_time)
            .ok()
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Time left until the window resets, measured from `now`.
    pub fn retry_after(&self, now: u64) -> Duration {
        Duration::from_millis(self.reset_time.saturating_sub(now))
    }
}
