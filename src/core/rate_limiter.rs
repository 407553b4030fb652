//! Rate limiting for credential endpoints
//!
//! Login and password-reset requests are counted per key (normalized email)
//! in a sliding one-minute window. Keys never share a budget.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Sliding-window limiter for authentication attempts with memory protection
pub struct AttemptLimiter {
    attempt_times: RwLock<HashMap<String, Vec<Instant>>>,
    max_attempts_per_window: u32,
    window_duration: Duration,
    /// Maximum number of keys to track to prevent memory exhaustion
    max_tracked_keys: usize,
}

impl AttemptLimiter {
    pub fn new(max_attempts_per_minute: u32) -> Self {
        Self::with_window(max_attempts_per_minute, Duration::from_secs(60))
    }

    pub fn with_window(max_attempts_per_window: u32, window_duration: Duration) -> Self {
        Self {
            attempt_times: RwLock::new(HashMap::new()),
            max_attempts_per_window,
            window_duration,
            max_tracked_keys: 10000, // Limit memory usage
        }
    }

    /// Record an attempt for `key`, returning false if it is over the limit
    pub async fn allow_attempt(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut times = self.attempt_times.write().await;

        // Enforce memory limit by removing the key with the oldest last attempt
        if times.len() >= self.max_tracked_keys && !times.contains_key(key) {
            let oldest_key = times
                .iter()
                .min_by_key(|(_, key_times)| key_times.last().copied().unwrap_or(now))
                .map(|(key, _)| key.clone());

            if let Some(oldest) = oldest_key {
                times.remove(&oldest);
                log::debug!("Removed oldest key from attempt limiter to prevent memory exhaustion");
            }
        }

        let key_times = times.entry(key.to_string()).or_default();

        // Remove attempts outside the window
        key_times.retain(|&time| now.duration_since(time) < self.window_duration);

        if key_times.len() < self.max_attempts_per_window as usize {
            key_times.push(now);
            true
        } else {
            false
        }
    }

    /// Current attempt count for `key` in the window
    pub async fn attempt_count(&self, key: &str) -> usize {
        let times = self.attempt_times.read().await;
        let now = Instant::now();
        times
            .get(key)
            .map(|key_times| {
                key_times
                    .iter()
                    .filter(|&&time| now.duration_since(time) < self.window_duration)
                    .count()
            })
            .unwrap_or(0)
    }

    /// Clean up old entries to prevent memory leaks
    pub async fn cleanup_old_entries(&self) {
        let now = Instant::now();
        let mut times = self.attempt_times.write().await;
        times.retain(|_, key_times| {
            key_times.retain(|&time| now.duration_since(time) < self.window_duration);
            !key_times.is_empty()
        });
    }

    /// Number of keys currently tracked
    pub async fn tracked_keys(&self) -> usize {
        self.attempt_times.read().await.len()
    }

    /// Start cleanup task for the limiter
    pub fn start_cleanup_task(self: std::sync::Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(300)); // Cleanup every 5 minutes
            loop {
                interval.tick().await;
                self.cleanup_old_entries().await;
            }
        });
    }
}
