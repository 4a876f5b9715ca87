use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use dashmap::DashMap;

use crate::models::Id;

/// Sliding window in-memory rate limiter (process local).
#[derive(Clone)]
pub struct InMemoryRateLimiter {
    store: Arc<DashMap<String, VecDeque<Instant>>>,
    pub enabled: bool,
}

impl InMemoryRateLimiter {
    pub fn new(enabled: bool) -> Self {
        Self { store: Arc::new(DashMap::new()), enabled }
    }

    /// Returns true if allowed, false if limited.
    pub fn check(&self, key: &str, limit: usize, window: Duration) -> bool {
        if !self.enabled { return true; }
        let now = Instant::now();
        let mut entry = self.store.entry(key.to_string()).or_default();
        while let Some(front) = entry.front() {
            if now.duration_since(*front) >= window { entry.pop_front(); } else { break; }
        }
        if entry.len() < limit {
            entry.push_back(now);
            true
        } else {
            false
        }
    }
}

/// Per-action limits for engagement writes.
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    pub follow_limit: usize,
    pub follow_window: Duration,
    pub like_limit: usize,
    pub like_window: Duration,
    pub comment_limit: usize,
    pub comment_window: Duration,
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        fn usize_env(name: &str, default: usize) -> usize { std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default) }
        fn dur_env(name: &str, default: u64) -> Duration { Duration::from_secs(std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)) }
        Self {
            follow_limit: usize_env("RL_FOLLOW_LIMIT", 30),
            follow_window: dur_env("RL_FOLLOW_WINDOW", 60),
            like_limit: usize_env("RL_LIKE_LIMIT", 60),
            like_window: dur_env("RL_LIKE_WINDOW", 60),
            comment_limit: usize_env("RL_COMMENT_LIMIT", 10),
            comment_window: dur_env("RL_COMMENT_WINDOW", 60),
        }
    }
}

/// High level guard used by handlers, keyed by acting client.
#[derive(Clone)]
pub struct RateLimiterFacade {
    pub limiter: InMemoryRateLimiter,
    pub cfg: RateLimitConfig,
}

impl RateLimiterFacade {
    pub fn new(limiter: InMemoryRateLimiter, cfg: RateLimitConfig) -> Self { Self { limiter, cfg } }
    pub fn allow_follow(&self, actor: Id) -> bool { self.limiter.check(&format!("follow:{actor}"), self.cfg.follow_limit, self.cfg.follow_window) }
    pub fn allow_like(&self, actor: Id) -> bool { self.limiter.check(&format!("like:{actor}"), self.cfg.like_limit, self.cfg.like_window) }
    pub fn allow_comment(&self, actor: Id) -> bool { self.limiter.check(&format!("comment:{actor}"), self.cfg.comment_limit, self.cfg.comment_window) }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn sliding_window_basic() {
        let rl = InMemoryRateLimiter::new(true);
        let window = Duration::from_millis(50);
        for _ in 0..3 { assert!(rl.check("k", 3, window)); }
        assert!(!rl.check("k", 3, window));
    }

    #[test]
    fn actions_are_limited_independently() {
        let cfg = RateLimitConfig {
            follow_limit: 1, follow_window: Duration::from_secs(60),
            like_limit: 1, like_window: Duration::from_secs(60),
            comment_limit: 1, comment_window: Duration::from_secs(60),
        };
        let facade = RateLimiterFacade::new(InMemoryRateLimiter::new(true), cfg);
        assert!(facade.allow_follow(1));
        assert!(!facade.allow_follow(1));
        assert!(facade.allow_follow(2));
        assert!(facade.allow_like(1));
        assert!(facade.allow_comment(1));
    }
}
