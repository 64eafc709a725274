//! Server configuration from the environment.
//!
//! DESIGN
//! ======
//! Every knob has a default, so an empty environment yields a working
//! in-memory server on port 3000. Values are read through one lookup
//! function so tests can feed a map instead of mutating process env.
//!
//! ERROR HANDLING
//! ==============
//! A variable that is absent falls back to its default. A variable that is
//! present but does not parse is a [`ConfigError`]; a typo in a limit should
//! stop startup rather than silently run with the default.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::str::FromStr;
use std::time::Duration;

use canvas::cooldown::CooldownConfig;

use crate::rate_limit::{RateLimit, RateLimits};

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_COOLDOWN_MINUTES: u32 = 2;
const DEFAULT_MAX_POSTS_PER_HOUR: usize = 30;
const DEFAULT_NOTE_RATE_LIMIT: usize = 720;
const DEFAULT_NOTE_RATE_WINDOW_MINUTES: u64 = 1440;
const DEFAULT_REPORT_RATE_LIMIT: usize = 14_400;
const DEFAULT_REPORT_RATE_WINDOW_MINUTES: u64 = 1440;
const DEFAULT_REPORT_MODERATION_THRESHOLD: u32 = 5;
const DEFAULT_FEED_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: String, value: String },
    #[error("{key} must be greater than zero")]
    Zero { key: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    /// Postgres connection string. The in-memory repository is used when unset.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    /// Served to clients at `/api/config`.
    pub cooldown: CooldownConfig,
    pub rate_limits: RateLimits,
    /// Report count at which a note is flagged for moderation in the logs.
    pub report_moderation_threshold: u32,
    /// Buffered change-feed events per subscriber before it lags.
    pub feed_capacity: usize,
    /// Extra words the moderator rejects, from comma-separated `BLOCKED_WORDS`.
    pub blocked_words: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            cooldown: CooldownConfig::new(DEFAULT_COOLDOWN_MINUTES, DEFAULT_MAX_POSTS_PER_HOUR),
            rate_limits: RateLimits {
                create_note: RateLimit::new(DEFAULT_NOTE_RATE_LIMIT, minutes(DEFAULT_NOTE_RATE_WINDOW_MINUTES)),
                report_note: RateLimit::new(DEFAULT_REPORT_RATE_LIMIT, minutes(DEFAULT_REPORT_RATE_WINDOW_MINUTES)),
            },
            report_moderation_threshold: DEFAULT_REPORT_MODERATION_THRESHOLD,
            feed_capacity: DEFAULT_FEED_CAPACITY,
            blocked_words: Vec::new(),
        }
    }
}

impl Config {
    /// Read configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unparseable or zero value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, which returns a variable's raw value.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unparseable or zero value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = env_parse(&lookup, "PORT", DEFAULT_PORT)?;
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        let db_max_connections = nonzero(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?;

        let cooldown_minutes = nonzero(&lookup, "COOLDOWN_MINUTES", DEFAULT_COOLDOWN_MINUTES)?;
        let max_posts_per_hour = nonzero(&lookup, "MAX_POSTS_PER_HOUR", DEFAULT_MAX_POSTS_PER_HOUR)?;

        let note_limit = nonzero(&lookup, "NOTE_RATE_LIMIT", DEFAULT_NOTE_RATE_LIMIT)?;
        let note_window = nonzero(&lookup, "NOTE_RATE_WINDOW_MINUTES", DEFAULT_NOTE_RATE_WINDOW_MINUTES)?;
        let report_limit = nonzero(&lookup, "REPORT_RATE_LIMIT", DEFAULT_REPORT_RATE_LIMIT)?;
        let report_window = nonzero(&lookup, "REPORT_RATE_WINDOW_MINUTES", DEFAULT_REPORT_RATE_WINDOW_MINUTES)?;

        Ok(Self {
            port,
            database_url,
            db_max_connections,
            cooldown: CooldownConfig::new(cooldown_minutes, max_posts_per_hour),
            rate_limits: RateLimits {
                create_note: RateLimit::new(note_limit, minutes(note_window)),
                report_note: RateLimit::new(report_limit, minutes(report_window)),
            },
            report_moderation_threshold: nonzero(
                &lookup,
                "REPORT_MODERATION_THRESHOLD",
                DEFAULT_REPORT_MODERATION_THRESHOLD,
            )?,
            feed_capacity: nonzero(&lookup, "FEED_CAPACITY", DEFAULT_FEED_CAPACITY)?,
            blocked_words: lookup("BLOCKED_WORDS").map(|raw| split_list(&raw)).unwrap_or_default(),
        })
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|w| !w.is_empty()).map(str::to_lowercase).collect()
}

fn minutes(n: u64) -> Duration {
    Duration::from_secs(n * 60)
}

fn env_parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Copy,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key: key.to_owned(), value: raw }),
    }
}

fn nonzero<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Copy + Default + PartialEq,
{
    let value = env_parse(lookup, key, default)?;
    if value == T::default() {
        return Err(ConfigError::Zero { key: key.to_owned() });
    }
    Ok(value)
}
