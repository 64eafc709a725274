//! Client-side posting throttle.
//!
//! DESIGN
//! ======
//! Two independent limits gate note creation:
//! - a short cooldown after every successful post (`cooldown_minutes`)
//! - a rolling one-hour counter capped at `max_posts_per_hour`; reaching the
//!   cap escalates the cooldown end to one hour out
//!
//! State lives in persistent storage (shared by every tab of the client) and
//! in an in-memory mirror for the current session. The mirror never wins over
//! storage when storage holds a later end time.
//!
//! TRADE-OFFS
//! ==========
//! This is a UX throttle, not a security boundary. Anyone can clear their own
//! storage; the server keeps its own independent per-IP limits.

#[cfg(test)]
#[path = "cooldown_test.rs"]
mod cooldown_test;

use std::rc::Rc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::clock::{Clock, ms_duration};
use crate::consts::RATE_LIMIT_WINDOW_MS;
use crate::storage::{KeyValueStore, StorageError, read_json, write_json};

/// Storage key for the cooldown end time (epoch ms).
pub const COOLDOWN_KEY: &str = "unsent_canvas_cooldown";
/// Storage key for the JSON array of recent post times (epoch ms).
pub const POST_HISTORY_KEY: &str = "unsent_canvas_post_history";

const DEFAULT_COOLDOWN_MINUTES: u32 = 2;
const DEFAULT_MAX_POSTS_PER_HOUR: usize = 30;

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CooldownConfig {
    pub cooldown_minutes: u32,
    pub max_posts_per_hour: usize,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self { cooldown_minutes: DEFAULT_COOLDOWN_MINUTES, max_posts_per_hour: DEFAULT_MAX_POSTS_PER_HOUR }
    }
}

impl CooldownConfig {
    /// Build a config, replacing zero values with the defaults.
    #[must_use]
    pub fn new(cooldown_minutes: u32, max_posts_per_hour: usize) -> Self {
        Self {
            cooldown_minutes: if cooldown_minutes < 1 { DEFAULT_COOLDOWN_MINUTES } else { cooldown_minutes },
            max_posts_per_hour: if max_posts_per_hour < 1 { DEFAULT_MAX_POSTS_PER_HOUR } else { max_posts_per_hour },
        }
    }

    #[must_use]
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(u64::from(self.cooldown_minutes) * 60)
    }

    fn cooldown_ms(&self) -> i64 {
        i64::from(self.cooldown_minutes) * 60 * 1000
    }
}

// =============================================================================
// CHECK RESULTS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownCheck {
    pub in_cooldown: bool,
    pub time_left: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitCheck {
    pub exceeded: bool,
    pub posts_in_last_hour: usize,
}

/// Whether the local user may post right now, and if not, for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostGate {
    Open,
    Cooldown { time_left: Duration },
    RateLimited { time_left: Duration },
}

impl PostGate {
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    #[must_use]
    pub fn time_left(&self) -> Duration {
        match self {
            Self::Open => Duration::ZERO,
            Self::Cooldown { time_left } | Self::RateLimited { time_left } => *time_left,
        }
    }

    /// Message shown when a click is refused.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Open => String::new(),
            Self::Cooldown { time_left } => {
                format!("Please wait {} before sending another note", format_time_left(*time_left))
            }
            Self::RateLimited { time_left } => {
                format!("Rate limit reached. You can post again in {}", format_time_left(*time_left))
            }
        }
    }
}

/// Snapshot for a once-per-second countdown display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CooldownStatus {
    pub gate: PostGate,
    pub in_cooldown: bool,
    pub time_left: Duration,
    pub time_left_formatted: String,
    pub can_post: bool,
}

/// Format a duration as `m:ss`.
#[must_use]
pub fn format_time_left(time_left: Duration) -> String {
    let secs = time_left.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

// =============================================================================
// STORE
// =============================================================================

pub struct CooldownStore {
    storage: Rc<dyn KeyValueStore>,
    clock: Rc<dyn Clock>,
    config: CooldownConfig,
    /// Session mirror of the persisted end time.
    session_end: Option<i64>,
    /// Session mirror of the persisted post history, oldest first.
    history: Vec<i64>,
}

impl CooldownStore {
    /// Open the store and reconcile the session mirror with storage.
    ///
    /// Elapsed cooldowns are removed and history entries outside the window
    /// are pruned (and the pruned list written back).
    pub fn load(storage: Rc<dyn KeyValueStore>, clock: Rc<dyn Clock>, config: CooldownConfig) -> Self {
        let mut store = Self { storage, clock, config, session_end: None, history: Vec::new() };
        let now = store.clock.now_ms();

        if let Some(end) = store.persisted_end() {
            if end > now {
                store.session_end = Some(end);
            } else {
                store.remove_key(COOLDOWN_KEY);
            }
        }

        if let Some(history) = read_json::<Vec<i64>>(store.storage.as_ref(), POST_HISTORY_KEY) {
            let recent = within_window(&history, now);
            if recent.len() != history.len() {
                if let Err(e) = write_json(store.storage.as_ref(), POST_HISTORY_KEY, &recent) {
                    warn!(error = %e, "cooldown: failed to rewrite pruned history");
                }
            }
            store.history = recent;
        }

        store
    }

    #[must_use]
    pub fn config(&self) -> CooldownConfig {
        self.config
    }

    /// Is the short (or escalated) cooldown still running?
    ///
    /// An expired end time is cleared from both storage and the mirror.
    /// Clearing is idempotent, so overlapping checks are harmless.
    pub fn check_cooldown(&mut self) -> CooldownCheck {
        let now = self.clock.now_ms();
        let end = self.current_end();

        match end {
            Some(end) if end > now => {
                self.session_end = Some(end);
                CooldownCheck { in_cooldown: true, time_left: ms_duration(end - now) }
            }
            Some(_) => {
                self.session_end = None;
                self.remove_key(COOLDOWN_KEY);
                CooldownCheck { in_cooldown: false, time_left: Duration::ZERO }
            }
            None => CooldownCheck { in_cooldown: false, time_left: Duration::ZERO },
        }
    }

    /// Count posts in the trailing hour. Reads only.
    #[must_use]
    pub fn check_rate_limit(&self) -> RateLimitCheck {
        let now = self.clock.now_ms();
        let recent = within_window(&self.known_history(), now);
        RateLimitCheck {
            exceeded: recent.len() >= self.config.max_posts_per_hour,
            posts_in_last_hour: recent.len(),
        }
    }

    /// Combine both checks into a single verdict.
    ///
    /// A running cooldown decides first: an end further out than the short
    /// cooldown can only come from escalation, so it reads as rate limited.
    /// The hourly count is consulted only once no cooldown is running.
    pub fn gate(&mut self) -> PostGate {
        let cooldown = self.check_cooldown();
        if cooldown.in_cooldown {
            if cooldown.time_left > self.config.cooldown() {
                return PostGate::RateLimited { time_left: cooldown.time_left };
            }
            return PostGate::Cooldown { time_left: cooldown.time_left };
        }

        if self.check_rate_limit().exceeded {
            let now = self.clock.now_ms();
            let recent = within_window(&self.known_history(), now);
            let window_left = recent
                .first()
                .map_or(Duration::ZERO, |oldest| ms_duration(oldest + RATE_LIMIT_WINDOW_MS - now));
            return PostGate::RateLimited { time_left: window_left };
        }
        PostGate::Open
    }

    /// Countdown snapshot for display.
    pub fn status(&mut self) -> CooldownStatus {
        let gate = self.gate();
        let time_left = gate.time_left();
        CooldownStatus {
            gate,
            in_cooldown: !gate.is_open(),
            time_left,
            time_left_formatted: format_time_left(time_left),
            can_post: gate.is_open(),
        }
    }

    /// Record a successful post: append to history and push the cooldown end
    /// forward. Call exactly once per successful creation.
    ///
    /// The session mirror is updated before persisting, so a storage failure
    /// still throttles this session.
    ///
    /// # Errors
    ///
    /// Returns an error if either record could not be persisted.
    pub fn record_post_time(&mut self) -> Result<(), StorageError> {
        let now = self.clock.now_ms();

        let mut history = within_window(&self.known_history(), now);
        history.push(now);

        let mut end = now + self.config.cooldown_ms();
        if history.len() >= self.config.max_posts_per_hour {
            end = end.max(now + RATE_LIMIT_WINDOW_MS);
        }
        if let Some(existing) = self.current_end() {
            end = end.max(existing);
        }

        self.session_end = Some(end);
        self.history.clone_from(&history);

        self.storage.set(COOLDOWN_KEY, &end.to_string())?;
        write_json(self.storage.as_ref(), POST_HISTORY_KEY, &history)
    }

    /// Drop the cooldown end time, keeping history.
    pub fn clear_cooldown(&mut self) {
        self.session_end = None;
        self.remove_key(COOLDOWN_KEY);
    }

    /// Drop every cooldown record.
    pub fn clear_all(&mut self) {
        self.session_end = None;
        self.history.clear();
        self.remove_key(COOLDOWN_KEY);
        self.remove_key(POST_HISTORY_KEY);
    }

    // --- internals ---

    fn persisted_end(&self) -> Option<i64> {
        let raw = self.storage.get(COOLDOWN_KEY)?;
        match raw.trim().parse::<i64>() {
            Ok(end) => Some(end),
            Err(e) => {
                warn!(error = %e, "cooldown: ignoring malformed end time");
                None
            }
        }
    }

    /// Later of the session mirror and the persisted end time.
    fn current_end(&self) -> Option<i64> {
        match (self.session_end, self.persisted_end()) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }

    /// Persisted history when present, else the session mirror.
    fn known_history(&self) -> Vec<i64> {
        read_json::<Vec<i64>>(self.storage.as_ref(), POST_HISTORY_KEY).unwrap_or_else(|| self.history.clone())
    }

    fn remove_key(&self, key: &str) {
        if let Err(e) = self.storage.remove(key) {
            warn!(key, error = %e, "cooldown: failed to remove key");
        }
    }
}

/// Entries strictly newer than one window ago, oldest first.
fn within_window(history: &[i64], now: i64) -> Vec<i64> {
    let cutoff = now - RATE_LIMIT_WINDOW_MS;
    let mut recent: Vec<i64> = history.iter().copied().filter(|t| *t > cutoff).collect();
    recent.sort_unstable();
    recent
}
