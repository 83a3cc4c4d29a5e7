//! Shared handler state.

use std::sync::Arc;

use crate::config::GlyphgateConfig;
use crate::contact::{ContactSink, LogSink};
use crate::ratelimit::{RateLimitPolicy, RateLimiter};

/// State handed to every HTTP handler.
#[derive(Clone)]
pub struct AppState {
    /// The process-wide contact rate limiter
    pub limiter: Arc<RateLimiter>,
    /// Policy applied to contact submissions
    pub policy: RateLimitPolicy,
    /// Where accepted submissions go
    pub sink: Arc<dyn ContactSink>,
    /// Cap on sanitized field length
    pub max_field_len: usize,
}

impl AppState {
    pub fn new(
        limiter: Arc<RateLimiter>,
        policy: RateLimitPolicy,
        sink: Arc<dyn ContactSink>,
        max_field_len: usize,
    ) -> Self {
        Self {
            limiter,
            policy,
            sink,
            max_field_len,
        }
    }

    /// Build state from configuration, logging submissions.
    pub fn from_config(config: &GlyphgateConfig, limiter: Arc<RateLimiter>) -> Self {
        Self::new(
            limiter,
            config.rate_limiting.policy(),
            Arc::new(LogSink::new(config.contact.recipient.clone())),
            config.contact.max_field_len,
        )
    }
}
