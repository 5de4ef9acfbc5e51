//! Submission rate limiting and suspicious-activity detection
//!
//! Two independent records per `purpose:identity` key:
//! - a hard attempt counter that lives for the decay window
//! - a rolling log of the last 10 accepted submission times
//!
//! Check-and-record runs under a per-key lock so two concurrent submissions
//! from the same identity cannot both slip in at the boundary.

use crate::cache::{get_json, set_json, CacheError, TtlCache};
use crate::clock::{Clock, SystemClock};
use dashmap::DashMap;
use gatekeep_common::{FailureCode, ValidationOutcome};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Timestamps kept in the rolling log
const RECENT_CAPACITY: usize = 10;
/// Rolling log horizon
const RECENT_HORIZON_SECS: i64 = 3600;
/// Burst window and the number of submissions in it that counts as a burst
const BURST_WINDOW_SECS: i64 = 300;
const BURST_THRESHOLD: usize = 3;
/// Minimum gap between two submissions
const MIN_INTERVAL_SECS: i64 = 30;

/// Rate limiter configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum accepted attempts in the window
    pub max_attempts: u32,
    /// Window length in seconds
    pub decay_seconds: u64,
}

impl RateLimitConfig {
    pub fn new(max_attempts: u32, decay_seconds: u64) -> Self {
        Self {
            max_attempts,
            decay_seconds,
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.decay_seconds)
    }

    /// Look up a named preset
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "strict" => Some(limits::strict()),
            "lenient" => Some(limits::lenient()),
            "default" => Some(limits::default()),
            "registration" => Some(limits::registration()),
            "content_posting" => Some(limits::content_posting()),
            _ => None,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        limits::default()
    }
}

/// Pre-configured limits for common submission profiles
pub mod limits {
    use super::*;

    /// 2 attempts per 2 hours
    pub fn strict() -> RateLimitConfig {
        RateLimitConfig::new(2, 120 * 60)
    }

    /// 10 attempts per 30 minutes
    pub fn lenient() -> RateLimitConfig {
        RateLimitConfig::new(10, 30 * 60)
    }

    /// 5 attempts per hour
    pub fn default() -> RateLimitConfig {
        RateLimitConfig::new(5, 3600)
    }

    /// Account sign-ups: 3 per hour
    pub fn registration() -> RateLimitConfig {
        RateLimitConfig::new(3, 3600)
    }

    /// Posts and comments: 20 per hour
    pub fn content_posting() -> RateLimitConfig {
        RateLimitConfig::new(20, 3600)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HardCounter {
    count: u32,
    window_started_at: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RecentSubmissions {
    timestamps: Vec<i64>,
}

impl RecentSubmissions {
    fn prune(&mut self, now: i64) {
        self.timestamps.retain(|ts| now - ts <= RECENT_HORIZON_SECS);
    }

    fn push(&mut self, now: i64) {
        self.timestamps.push(now);
        if self.timestamps.len() > RECENT_CAPACITY {
            let excess = self.timestamps.len() - RECENT_CAPACITY;
            self.timestamps.drain(..excess);
        }
    }

    /// Burst of submissions, or one right after another
    fn is_suspicious(&self, now: i64) -> bool {
        let in_burst = self
            .timestamps
            .iter()
            .filter(|ts| now - **ts < BURST_WINDOW_SECS)
            .count();
        if in_burst + 1 >= BURST_THRESHOLD {
            return true;
        }
        matches!(self.timestamps.last(), Some(last) if now - last < MIN_INTERVAL_SECS)
    }
}

/// Cache-backed submission limiter
#[derive(Clone)]
pub struct RateLimiter {
    cache: Arc<dyn TtlCache>,
    clock: Arc<dyn Clock>,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl RateLimiter {
    pub fn new(cache: Arc<dyn TtlCache>) -> Self {
        Self::with_clock(cache, Arc::new(SystemClock))
    }

    pub fn with_clock(cache: Arc<dyn TtlCache>, clock: Arc<dyn Clock>) -> Self {
        Self {
            cache,
            clock,
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Check both limits and record the attempt if it is admitted.
    /// Cache failures reject with `internal_error`.
    pub async fn check_and_record(
        &self,
        identity: &str,
        purpose: &str,
        config: &RateLimitConfig,
    ) -> ValidationOutcome {
        let key = format!("{}:{}", purpose, identity);
        let lock = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let outcome = {
            let _guard = lock.lock().await;
            match self.check_and_record_locked(&key, config).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!("Rate limiter cache failure for {}: {}", key, e);
                    ValidationOutcome::internal_error()
                }
            }
        };

        drop(lock);
        // Only the map holds the lock once nobody else is waiting on this key
        self.locks
            .remove_if(&key, |_, existing| Arc::strong_count(existing) == 1);

        outcome
    }

    async fn check_and_record_locked(
        &self,
        key: &str,
        config: &RateLimitConfig,
    ) -> Result<ValidationOutcome, CacheError> {
        let now = self.clock.now().timestamp();
        let decay = config.decay_seconds as i64;
        let hard_key = format!("rl:hard:{}", key);
        let recent_key = format!("rl:recent:{}", key);

        let counter = get_json::<HardCounter>(self.cache.as_ref(), &hard_key)
            .await?
            .filter(|c| now - c.window_started_at < decay);

        let current = counter.as_ref().map_or(0, |c| c.count);
        if current >= config.max_attempts {
            let elapsed = counter.as_ref().map_or(0, |c| now - c.window_started_at);
            let wait = (decay - elapsed).max(1);
            tracing::debug!("Rate limited {} for {}s", key, wait);
            return Ok(ValidationOutcome::reject(
                FailureCode::RateLimited,
                format!("Too many attempts. Try again in {}", format_wait(wait)),
            ));
        }

        let mut recent = get_json::<RecentSubmissions>(self.cache.as_ref(), &recent_key)
            .await?
            .unwrap_or_default();
        recent.prune(now);
        if recent.is_suspicious(now) {
            tracing::debug!("Suspicious submission pattern for {}", key);
            return Ok(ValidationOutcome::reject(
                FailureCode::SuspiciousSubmissionPattern,
                "You are submitting too quickly. Please wait a moment and try again",
            ));
        }

        let (updated, ttl_secs) = match counter {
            Some(c) => (
                HardCounter {
                    count: c.count + 1,
                    window_started_at: c.window_started_at,
                },
                decay - (now - c.window_started_at),
            ),
            None => (
                HardCounter {
                    count: 1,
                    window_started_at: now,
                },
                decay,
            ),
        };
        let ttl = Duration::from_secs(ttl_secs.max(1) as u64);
        set_json(self.cache.as_ref(), &hard_key, &updated, ttl).await?;

        recent.push(now);
        set_json(
            self.cache.as_ref(),
            &recent_key,
            &recent,
            Duration::from_secs(RECENT_HORIZON_SECS as u64),
        )
        .await?;

        Ok(ValidationOutcome::accept())
    }

    /// Reset both records for an identity
    pub async fn reset(&self, identity: &str, purpose: &str) -> Result<(), CacheError> {
        let key = format!("{}:{}", purpose, identity);
        self.cache.delete(&format!("rl:hard:{}", key)).await?;
        self.cache.delete(&format!("rl:recent:{}", key)).await?;
        Ok(())
    }
}

fn format_wait(secs: i64) -> String {
    let minutes = (secs + 59) / 60;
    if minutes <= 1 {
        "1 minute".to_string()
    } else {
        format!("{} minutes", minutes)
    }
}
