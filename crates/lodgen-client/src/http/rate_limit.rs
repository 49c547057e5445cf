//! Sliding-window rate limiting per endpoint
//!
//! A courtesy throttle applied before any network call, not a substitute for
//! server-side enforcement. Each endpoint key owns an ordered bucket of
//! admission timestamps within the trailing window; an admitted call records
//! its timestamp, a rejected call records nothing.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

/// Rate limiting configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum admissions per window
    pub max_requests: u32,
    /// Trailing window size
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 60,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_requests == 0 {
            return Err("max_requests cannot be zero".to_string());
        }
        if self.window.is_zero() {
            return Err("window cannot be zero".to_string());
        }
        Ok(())
    }
}

/// Per-endpoint sliding-window rate limiter
///
/// State lives for the process lifetime and resets on restart. Buckets never
/// hold timestamps older than the window after a pruning pass.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Check admission for `key`; an admitted call has its timestamp recorded
    /// as a side effect, a rejected call leaves the bucket untouched.
    pub fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().unwrap();
        let bucket = buckets.entry(key.to_string()).or_default();

        Self::prune(bucket, now, self.config.window);

        if (bucket.len() as u32) < self.config.max_requests {
            bucket.push_back(now);
            true
        } else {
            debug!(endpoint = key, "rate limit reached, rejecting request");
            false
        }
    }

    /// Backoff hint: time until the oldest admission leaves the window.
    /// Zero when the bucket is empty.
    pub fn remaining_time(&self, key: &str) -> Duration {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().unwrap();
        let Some(bucket) = buckets.get_mut(key) else {
            return Duration::ZERO;
        };

        Self::prune(bucket, now, self.config.window);

        match bucket.front() {
            Some(oldest) => self.config.window.saturating_sub(now - *oldest),
            None => Duration::ZERO,
        }
    }

    fn prune(bucket: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while let Some(front) = bucket.front() {
            if now.duration_since(*front) > window {
                bucket.pop_front();
            } else {
                break;
            }
        }
    }
}
