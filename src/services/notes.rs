//! Note service: creation, listing, reports and deletion.
//!
//! DESIGN
//! ======
//! Every write goes through here so the rules are applied in one order:
//! required fields, then the per-IP rate limit, then validation and
//! sanitization, then moderation, then the repository. Inserts and deletes
//! are published on the change feed after the repository confirms them.
//!
//! ERROR HANDLING
//! ==============
//! [`NoteError`] separates caller mistakes (missing fields, invalid input,
//! moderation, rate limits, unknown ids) from repository failures so the
//! route layer can pick status codes without string matching. A change-feed
//! send with no subscribers is not an error.

#[cfg(test)]
#[path = "notes_test.rs"]
mod notes_test;

use canvas::feed::FeedEvent;
use canvas::moderation::ModerationVerdict;
use canvas::note::{GridArea, Note, NoteDraft, NoteId};
use canvas::validation::{self, ValidationErrors};
use tracing::{debug, info, warn};

use crate::rate_limit::{RateAction, RateLimitError};
use crate::state::AppState;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum NoteError {
    #[error("missing required fields")]
    MissingFields,
    #[error(transparent)]
    Invalid(ValidationErrors),
    #[error("note rejected: {0}")]
    Moderated(String),
    #[error(transparent)]
    RateLimited(#[from] RateLimitError),
    #[error("note not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Which notes a listing returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteFilter {
    All,
    Area(GridArea),
    /// Exact recipient match.
    SentTo(String),
}

impl NoteFilter {
    #[must_use]
    pub fn matches(&self, note: &Note) -> bool {
        match self {
            Self::All => true,
            Self::Area(area) => note.is_within(area),
            Self::SentTo(sent_to) => note.sent_to == *sent_to,
        }
    }
}

/// Raw creation request. Fields are optional so that absence can be
/// reported as one error before anything else runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateNoteInput {
    pub sent_to: Option<String>,
    pub message: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub color: Option<String>,
}

/// Storage backend for notes.
#[async_trait::async_trait]
pub trait NoteRepository: Send + Sync {
    /// Persist an already validated draft and return the stored note.
    async fn insert(&self, draft: &NoteDraft) -> Result<Note, NoteError>;

    /// Notes matching `filter`, newest first.
    async fn list(&self, filter: &NoteFilter) -> Result<Vec<Note>, NoteError>;

    /// Atomically add one report. `None` when the note does not exist.
    async fn increment_report_count(&self, id: NoteId) -> Result<Option<u32>, NoteError>;

    /// Remove a note, returning it. `None` when the note does not exist.
    async fn delete(&self, id: NoteId) -> Result<Option<Note>, NoteError>;

    /// Cheap connectivity check.
    async fn ping(&self) -> Result<(), NoteError>;
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Create a note on behalf of the client at `ip`.
///
/// # Errors
///
/// See [`NoteError`]. The rate limit is consumed even when validation later
/// fails.
pub async fn create_note(state: &AppState, ip: &str, input: CreateNoteInput) -> Result<Note, NoteError> {
    let present = |v: Option<String>| v.filter(|s| !s.is_empty());
    let (Some(sent_to), Some(message), Some(x), Some(y)) = (present(input.sent_to), present(input.message), input.x, input.y)
    else {
        return Err(NoteError::MissingFields);
    };

    state.limiter.check_and_record(RateAction::CreateNote, ip).inspect_err(|e| {
        warn!(%ip, error = %e, "note creation rate limited");
    })?;

    let draft = validate(sent_to, message, x, y, input.color).map_err(NoteError::Invalid)?;

    if let ModerationVerdict::Rejected { reason } = state.moderator.check(&draft.message) {
        info!(%ip, %reason, "note rejected by moderation");
        return Err(NoteError::Moderated(reason));
    }

    let note = state.notes.insert(&draft).await?;
    info!(id = %note.id, x = note.x, y = note.y, "note created");
    publish(state, FeedEvent::Insert(note.clone()));
    Ok(note)
}

fn validate(sent_to: String, message: String, x: f64, y: f64, color: Option<String>) -> Result<NoteDraft, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let (x, y) = validation::validate_coordinates(x, y).unwrap_or_else(|e| {
        errors.merge(e);
        (0, 0)
    });
    match validation::validate_draft(&NoteDraft { sent_to, message, x, y, color }) {
        Ok(draft) if errors.is_empty() => Ok(draft),
        Ok(_) => Err(errors),
        Err(e) => {
            errors.merge(e);
            Err(errors)
        }
    }
}

/// List notes matching `filter`, newest first.
///
/// # Errors
///
/// Returns [`NoteError::Database`] if the repository fails.
pub async fn list_notes(state: &AppState, filter: &NoteFilter) -> Result<Vec<Note>, NoteError> {
    let notes = state.notes.list(filter).await?;
    debug!(count = notes.len(), ?filter, "notes listed");
    Ok(notes)
}

/// Record one report against a note and return its new count.
///
/// # Errors
///
/// Returns [`NoteError::RateLimited`] or [`NoteError::NotFound`], or a
/// repository error.
pub async fn report_note(state: &AppState, ip: &str, id: NoteId) -> Result<u32, NoteError> {
    state.limiter.check_and_record(RateAction::ReportNote, ip).inspect_err(|e| {
        warn!(%ip, error = %e, "report rate limited");
    })?;

    let report_count = state.notes.increment_report_count(id).await?.ok_or(NoteError::NotFound)?;
    info!(%id, report_count, "note reported");
    if report_count >= state.config.report_moderation_threshold {
        warn!(%id, report_count, "note has reached the moderation threshold");
    }
    Ok(report_count)
}

/// Delete a note and announce it on the change feed.
///
/// # Errors
///
/// Returns [`NoteError::NotFound`] or a repository error.
pub async fn delete_note(state: &AppState, id: NoteId) -> Result<Note, NoteError> {
    let note = state.notes.delete(id).await?.ok_or(NoteError::NotFound)?;
    info!(%id, "note deleted");
    publish(state, FeedEvent::Delete(note.clone()));
    Ok(note)
}

fn publish(state: &AppState, event: FeedEvent) {
    match state.feed.send(event) {
        Ok(receivers) => debug!(receivers, "feed event published"),
        Err(_) => debug!("feed event dropped: no subscribers"),
    }
}
