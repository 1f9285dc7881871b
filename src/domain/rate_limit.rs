//! Fixed-window rate limiter on top of the cache's atomic increment.
//!
//! Each identity gets one counter per window, keyed by the window's index so
//! a new window starts from zero without a reset. When the cache cannot count
//! (increment reports 0) the request is allowed.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::CacheManager;

/// Outcome of one [`RateLimiter::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Requests counted in the current window, this one included
    pub count: i64,
    pub remaining: i64,
    /// Seconds until the current window ends
    pub reset_after_secs: u64,
}

#[derive(Clone)]
pub struct RateLimiter {
    cache: Arc<CacheManager>,
    scope: String,
    limit: i64,
    window_secs: u64,
}

impl RateLimiter {
    /// # Arguments
    /// * `scope` - namespace for the counters, e.g. the endpoint name
    /// * `limit` - requests allowed per window
    /// * `window_secs` - window length (values below 1 are raised to 1)
    pub fn new(cache: Arc<CacheManager>, scope: impl Into<String>, limit: i64, window_secs: u64) -> Self {
        Self {
            cache,
            scope: scope.into(),
            limit,
            window_secs: window_secs.max(1),
        }
    }

    fn key(&self, identity: &str, window: u64) -> String {
        format!("ratelimit:{}:{}:{}", self.scope, identity, window)
    }

    /// Counts one request for `identity` and decides whether it may proceed.
    pub async fn check(&self, identity: &str) -> RateLimitDecision {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        self.check_at(identity, now).await
    }

    async fn check_at(&self, identity: &str, now_secs: u64) -> RateLimitDecision {
        let window = now_secs / self.window_secs;
        let reset_after_secs = self.window_secs - now_secs % self.window_secs;

        let count = self
            .cache
            .increment(&self.key(identity, window), 1, Some(self.window_secs))
            .await;

        if count <= 0 {
            warn!(scope = %self.scope, identity = %identity, "rate limit counter unavailable, allowing request");
            return RateLimitDecision {
                allowed: true,
                count: 0,
                remaining: self.limit,
                reset_after_secs,
            };
        }

        let allowed = count <= self.limit;
        if !allowed {
            debug!(scope = %self.scope, identity = %identity, count, limit = self.limit, "rate limited");
        }
        RateLimitDecision {
            allowed,
            count,
            remaining: (self.limit - count).max(0),
            reset_after_secs,
        }
    }
}
