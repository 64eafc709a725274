//! The external note store as seen by the client.
//!
//! [`NoteStore`] is the only way the controller reaches the network. It is
//! `?Send` because the client core is single-threaded (the browser event
//! loop); implementations may hold `Rc` state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::note::{GridArea, Note, NoteDraft, NoteId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    Invalid(String),
    #[error("{0}")]
    RateLimited(String),
    #[error("note not found")]
    NotFound,
    #[error("network error: {0}")]
    Network(String),
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl StoreError {
    /// Text suitable for showing next to the form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Invalid(message) | Self::RateLimited(message) => message.clone(),
            Self::NotFound => "That note no longer exists.".to_owned(),
            Self::Network(_) => "Could not reach the server. Please try again.".to_owned(),
            Self::Server { .. } | Self::Decode(_) => "Something went wrong. Please try again.".to_owned(),
        }
    }
}

/// Body of a report request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub id: NoteId,
}

/// Result of a successful report: the note's new counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportReceipt {
    pub id: NoteId,
    pub report_count: u32,
}

#[async_trait(?Send)]
pub trait NoteStore {
    async fn create_note(&self, draft: &NoteDraft) -> Result<Note, StoreError>;

    /// Every note, newest first.
    async fn list_notes(&self) -> Result<Vec<Note>, StoreError>;

    async fn list_notes_by_area(&self, area: GridArea) -> Result<Vec<Note>, StoreError>;

    async fn list_notes_by_sent_to(&self, sent_to: &str) -> Result<Vec<Note>, StoreError>;

    /// Add one report to a note and return the new count.
    async fn increment_report_count(&self, id: NoteId) -> Result<u32, StoreError>;
}
