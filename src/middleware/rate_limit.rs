//! Rate limiting middleware
//!
//! Sliding-window limit on messages per sender.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Simple rate limiter
pub struct RateLimiter {
    requests: HashMap<String, Vec<Instant>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            requests: HashMap::new(),
            max_requests,
            window,
        }
    }

    pub fn is_allowed(&mut self, sender: &str) -> bool {
        self.is_allowed_at(sender, Instant::now())
    }

    pub fn is_allowed_at(&mut self, sender: &str, now: Instant) -> bool {
        let window = self.window;
        let entry = self.requests.entry(sender.to_string()).or_default();

        // Remove old requests
        entry.retain(|&time| now.duration_since(time) <= window);

        // Check if under limit
        if entry.len() < self.max_requests {
            entry.push(now);
            true
        } else {
            false
        }
    }

    /// Drops senders with no request inside the window
    pub fn prune(&mut self, now: Instant) {
        let window = self.window;
        self.requests
            .retain(|_, times| times.iter().any(|&t| now.duration_since(t) <= window));
    }

    pub fn tracked_senders(&self) -> usize {
        self.requests.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_per_sender() {
        let mut limiter = RateLimiter::new(2, Duration::from_secs(60));
        let now = Instant::now();
        assert!(limiter.is_allowed_at("alice", now));
        assert!(limiter.is_allowed_at("alice", now));
        assert!(!limiter.is_allowed_at("alice", now));
        assert!(limiter.is_allowed_at("bob", now));
    }

    #[test]
    fn test_window_slides() {
        let mut limiter = RateLimiter::new(1, Duration::from_secs(10));
        let start = Instant::now();
        assert!(limiter.is_allowed_at("alice", start));
        assert!(!limiter.is_allowed_at("alice", start + Duration::from_secs(5)));
        assert!(limiter.is_allowed_at("alice", start + Duration::from_secs(11)));
    }

    #[test]
    fn test_prune_forgets_idle_senders() {
        let mut limiter = RateLimiter::new(5, Duration::from_secs(10));
        let start = Instant::now();
        limiter.is_allowed_at("alice", start);
        limiter.is_allowed_at("bob", start + Duration::from_secs(8));
        limiter.prune(start + Duration::from_secs(15));
        assert_eq!(limiter.tracked_senders(), 1);
    }
}
