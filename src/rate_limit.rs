//! In-memory per-IP rate limiting for note creation and reports.
//!
//! DESIGN
//! ======
//! Sliding-window counters backed by `HashMap<(RateAction, String), VecDeque<Instant>>`.
//! Each action has its own limit and window; the key is the client IP as
//! reported by the proxy headers. A rejected request is not recorded, so a
//! client that keeps retrying does not extend its own lockout.
//!
//! TRADE-OFFS
//! ==========
//! State lives in process memory: it resets on restart and is not shared
//! between replicas. A periodic sweep drops keys whose windows have emptied
//! so one-off visitors do not accumulate forever.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateAction {
    CreateNote,
    ReportNote,
}

impl fmt::Display for RateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CreateNote => "create_note",
            Self::ReportNote => "report_note",
        })
    }
}

/// At most `limit` requests per `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub limit: usize,
    pub window: Duration,
}

impl RateLimit {
    #[must_use]
    pub fn new(limit: usize, window: Duration) -> Self {
        Self { limit, window }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimits {
    pub create_note: RateLimit,
    pub report_note: RateLimit,
}

impl RateLimits {
    #[must_use]
    pub fn for_action(&self, action: RateAction) -> RateLimit {
        match action {
            RateAction::CreateNote => self.create_note,
            RateAction::ReportNote => self.report_note,
        }
    }
}

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    #[error("{action} rate limit exceeded (max {limit} requests/{window_secs}s)")]
    Exceeded { action: RateAction, limit: usize, window_secs: u64 },
}

// =============================================================================
// RATE LIMITER
// =============================================================================

#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<RateLimiterInner>>,
    limits: RateLimits,
}

struct RateLimiterInner {
    /// Request timestamps per (action, client IP).
    requests: HashMap<(RateAction, String), VecDeque<Instant>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(limits: RateLimits) -> Self {
        Self { inner: Arc::new(Mutex::new(RateLimiterInner { requests: HashMap::new() })), limits }
    }

    #[must_use]
    pub fn limits(&self) -> RateLimits {
        self.limits
    }

    /// Check the client's window for `action`, then record the request.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::Exceeded`] when the window is already full.
    pub fn check_and_record(&self, action: RateAction, ip: &str) -> Result<(), RateLimitError> {
        self.check_and_record_at(action, ip, Instant::now())
    }

    /// Internal: check + record with explicit timestamp (for testing).
    pub(crate) fn check_and_record_at(&self, action: RateAction, ip: &str, now: Instant) -> Result<(), RateLimitError> {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let cfg = self.limits.for_action(action);

        let deque = inner.requests.entry((action, ip.to_owned())).or_default();
        prune_window(deque, now, cfg.window);
        if deque.len() >= cfg.limit {
            return Err(RateLimitError::Exceeded { action, limit: cfg.limit, window_secs: cfg.window.as_secs() });
        }

        deque.push_back(now);
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn count_at(&self, action: RateAction, ip: &str, now: Instant) -> usize {
        let inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let window = self.limits.for_action(action).window;
        inner
            .requests
            .get(&(action, ip.to_owned()))
            .map_or(0, |deque| deque.iter().filter(|&&t| now.duration_since(t) <= window).count())
    }

    /// Prune every window and drop keys left empty. Returns the number of
    /// keys removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub(crate) fn sweep_at(&self, now: Instant) -> usize {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let limits = self.limits;
        let before = inner.requests.len();
        inner.requests.retain(|(action, _), deque| {
            prune_window(deque, now, limits.for_action(*action).window);
            !deque.is_empty()
        });
        before - inner.requests.len()
    }

    #[cfg(test)]
    pub(crate) fn tracked_keys(&self) -> usize {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner).requests.len()
    }
}

/// Spawn the periodic sweep. Runs until the runtime shuts down.
#[must_use]
pub fn spawn_sweep_task(limiter: RateLimiter, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let removed = limiter.sweep();
            if removed > 0 {
                tracing::debug!(removed, "rate limiter swept idle clients");
            }
        }
    })
}

// =============================================================================
// HELPERS
// =============================================================================

fn prune_window(deque: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&front) = deque.front() {
        if now.duration_since(front) > window {
            deque.pop_front();
        } else {
            break;
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "rate_limit_test.rs"]
mod tests;
