//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the note repository, the per-IP rate limiter, the change-feed
//! broadcast sender and the configuration. Everything is behind `Arc` or is
//! itself a cheap handle, so cloning per request costs a few refcounts.

use std::sync::Arc;

use canvas::feed::FeedEvent;
use canvas::moderation::{ContentCheck, DefaultModerator};
use tokio::sync::broadcast;

use crate::config::Config;
use crate::rate_limit::RateLimiter;
use crate::services::notes::NoteRepository;

/// Shared application state, injected into Axum handlers via State extractor.
#[derive(Clone)]
pub struct AppState {
    pub notes: Arc<dyn NoteRepository>,
    pub limiter: RateLimiter,
    /// Insert/delete events for websocket subscribers.
    pub feed: broadcast::Sender<FeedEvent>,
    pub moderator: Arc<dyn ContentCheck + Send + Sync>,
    pub config: Arc<Config>,
}

impl AppState {
    #[must_use]
    pub fn new(notes: Arc<dyn NoteRepository>, config: Config) -> Self {
        let (feed, _) = broadcast::channel(config.feed_capacity);
        Self {
            notes,
            limiter: RateLimiter::new(config.rate_limits),
            feed,
            moderator: Arc::new(DefaultModerator::new().with_blocked_words(&config.blocked_words)),
            config: Arc::new(config),
        }
    }
}
