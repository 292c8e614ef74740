use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Sliding-window counter of password attempts per client.
#[derive(Debug, Clone)]
pub struct AttemptLimiter {
    window: Duration,
    max_attempts: u32,
    buckets: Arc<DashMap<String, Vec<Instant>>>,
}

impl AttemptLimiter {
    pub fn new(window: Duration, max_attempts: u32) -> Self {
        Self {
            window,
            max_attempts,
            buckets: Arc::new(DashMap::new()),
        }
    }

    /// Records an attempt for `key` unless the window is already full.
    pub fn allow(&self, key: &str) -> bool {
        let now = Instant::now();
        let window = self.window;
        self.prune(now);

        let mut entry = self.buckets.entry(key.to_string()).or_default();
        entry.retain(|instant| now.duration_since(*instant) < window);

        if entry.len() >= self.max_attempts as usize {
            return false;
        }

        entry.push(now);
        true
    }

    /// Forgets clients whose attempts have all left the window.
    fn prune(&self, now: Instant) {
        let window = self.window;
        self.buckets.retain(|_, attempts| {
            attempts.retain(|instant| now.duration_since(*instant) < window);
            !attempts.is_empty()
        });
    }

    pub fn retry_after_secs(&self) -> u64 {
        self.window.as_secs().max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_after_max_attempts_per_key() {
        let limiter = AttemptLimiter::new(Duration::from_secs(60), 2);
        assert!(limiter.allow("10.0.0.1"));
        assert!(limiter.allow("10.0.0.1"));
        assert!(!limiter.allow("10.0.0.1"));
        assert!(limiter.allow("10.0.0.2"));
        assert_eq!(limiter.retry_after_secs(), 60);
    }

    #[test]
    fn attempts_expire_with_the_window() {
        let limiter = AttemptLimiter::new(Duration::from_millis(20), 1);
        assert!(limiter.allow("client"));
        assert!(!limiter.allow("client"));
        std::thread::sleep(Duration::from_millis(40));
        assert!(limiter.allow("client"));
    }

    #[test]
    fn expired_clients_are_forgotten() {
        let limiter = AttemptLimiter::new(Duration::from_millis(20), 3);
        assert!(limiter.allow("10.0.0.1"));
        assert!(limiter.allow("10.0.0.2"));
        assert_eq!(limiter.buckets.len(), 2);
        std::thread::sleep(Duration::from_millis(40));
        assert!(limiter.allow("10.0.0.3"));
        assert_eq!(limiter.buckets.len(), 1);
        assert!(limiter.buckets.contains_key("10.0.0.3"));
    }
}
