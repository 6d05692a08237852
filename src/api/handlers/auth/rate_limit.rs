//! Rate limiting primitives for the admin login.
//!
//! Flow Overview:
//! 1) Track attempts per client IP in a rolling window (10 per 10 minutes).
//!    `check_ip` reserves a slot; a successful login gives it back, so only
//!    failed or abandoned attempts count toward the limit.
//! 2) Count consecutive failures; 5 in a row trigger a 15-minute cooldown.
//! 3) A successful login resets the failure streak; idle entries are dropped once
//!    their attempts leave the window.
//!
//! State lives in process memory, so limits are per instance and reset on restart.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

const ATTEMPT_WINDOW: Duration = Duration::from_secs(10 * 60);
const IP_ATTEMPT_LIMIT: usize = 10;
const FAILURE_LIMIT: u32 = 5;
const COOLDOWN_DURATION: Duration = Duration::from_secs(15 * 60);

// Requests without a usable client IP share one bucket.
const UNKNOWN_IP: &str = "unknown";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
    Cooldown { remaining_seconds: u64 },
}

pub trait RateLimiter: Send + Sync {
    /// Check limits for `ip` and register the attempt when allowed.
    fn check_ip(&self, ip: Option<&str>) -> RateLimitDecision;
    fn record_failure(&self, ip: Option<&str>);
    fn record_success(&self, ip: Option<&str>);
}

#[derive(Clone, Debug)]
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn check_ip(&self, _ip: Option<&str>) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }

    fn record_failure(&self, _ip: Option<&str>) {}

    fn record_success(&self, _ip: Option<&str>) {}
}

#[derive(Debug, Default)]
struct IpEntry {
    attempts: VecDeque<Instant>,
    consecutive_failures: u32,
    cooldown_until: Option<Instant>,
}

impl IpEntry {
    fn prune(&mut self, now: Instant, window: Duration) {
        while self
            .attempts
            .front()
            .is_some_and(|attempt| now.duration_since(*attempt) >= window)
        {
            self.attempts.pop_front();
        }
        if self.cooldown_until.is_some_and(|until| until <= now) {
            self.cooldown_until = None;
        }
    }

    fn is_idle(&self) -> bool {
        self.attempts.is_empty() && self.cooldown_until.is_none()
    }
}

/// In-memory limiter keyed by client IP.
#[derive(Debug)]
pub struct LoginRateLimiter {
    window: Duration,
    attempt_limit: usize,
    failure_limit: u32,
    cooldown: Duration,
    entries: Mutex<HashMap<String, IpEntry>>,
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new(
            ATTEMPT_WINDOW,
            IP_ATTEMPT_LIMIT,
            FAILURE_LIMIT,
            COOLDOWN_DURATION,
        )
    }
}

impl LoginRateLimiter {
    #[must_use]
    pub fn new(
        window: Duration,
        attempt_limit: usize,
        failure_limit: u32,
        cooldown: Duration,
    ) -> Self {
        Self {
            window,
            attempt_limit,
            failure_limit,
            cooldown,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn check_at(&self, ip: Option<&str>, now: Instant) -> RateLimitDecision {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, entry| {
            entry.prune(now, self.window);
            !entry.is_idle()
        });

        let entry = entries.entry(bucket(ip)).or_default();
        if let Some(until) = entry.cooldown_until {
            let remaining = until.saturating_duration_since(now);
            return RateLimitDecision::Cooldown {
                remaining_seconds: remaining.as_secs().max(1),
            };
        }
        if entry.attempts.len() >= self.attempt_limit {
            return RateLimitDecision::Limited;
        }
        entry.attempts.push_back(now);
        RateLimitDecision::Allowed
    }

    fn record_failure_at(&self, ip: Option<&str>, now: Instant) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.entry(bucket(ip)).or_default();
        entry.consecutive_failures = entry.consecutive_failures.saturating_add(1);
        if entry.consecutive_failures >= self.failure_limit {
            entry.consecutive_failures = 0;
            entry.cooldown_until = Some(now + self.cooldown);
        }
    }

    fn record_success_at(&self, ip: Option<&str>) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = entries.get_mut(&bucket(ip)) {
            entry.consecutive_failures = 0;
            entry.attempts.pop_back();
        }
    }
}

impl RateLimiter for LoginRateLimiter {
    fn check_ip(&self, ip: Option<&str>) -> RateLimitDecision {
        self.check_at(ip, Instant::now())
    }

    fn record_failure(&self, ip: Option<&str>) {
        self.record_failure_at(ip, Instant::now());
    }

    fn record_success(&self, ip: Option<&str>) {
        self.record_success_at(ip);
    }
}

fn bucket(ip: Option<&str>) -> String {
    ip.map(str::trim)
        .filter(|ip| !ip.is_empty())
        .unwrap_or(UNKNOWN_IP)
        .to_string()
}
