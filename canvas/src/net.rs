//! HTTP implementation of [`NoteStore`] against the `/api/notes` service.
//!
//! Response decoding is split into pure functions so status and body
//! handling can be tested without a server.

#[cfg(test)]
#[path = "net_test.rs"]
mod net_test;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::note::{GridArea, Note, NoteDraft, NoteId};
use crate::store::{NoteStore, ReportReceipt, ReportRequest, StoreError};

const NOTES_PATH: &str = "/api/notes";

/// Error body returned by the service: `{ "error": "...", "details": ... }`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    details: Option<serde_json::Value>,
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct HttpNoteStore {
    http: reqwest::Client,
    base_url: String,
}

impl HttpNoteStore {
    /// `base_url` is the service origin, e.g. `https://unsent.example`.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self { http: reqwest::Client::new(), base_url: base_url.trim_end_matches('/').to_owned() }
    }

    fn url(&self) -> String {
        format!("{}{NOTES_PATH}", self.base_url)
    }

    async fn read<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, StoreError> {
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;
        decode_response(status, &text)
    }

    async fn list(&self, query: &[(&str, String)]) -> Result<Vec<Note>, StoreError> {
        let response = self
            .http
            .get(self.url())
            .query(query)
            .send()
            .await
            .map_err(network_error)?;
        Self::read(response).await
    }
}

#[async_trait(?Send)]
impl NoteStore for HttpNoteStore {
    async fn create_note(&self, draft: &NoteDraft) -> Result<Note, StoreError> {
        let response = self
            .http
            .post(self.url())
            .json(draft)
            .send()
            .await
            .map_err(network_error)?;
        Self::read(response).await
    }

    async fn list_notes(&self) -> Result<Vec<Note>, StoreError> {
        self.list(&[]).await
    }

    async fn list_notes_by_area(&self, area: GridArea) -> Result<Vec<Note>, StoreError> {
        self.list(&[
            ("minX", area.min_x.to_string()),
            ("maxX", area.max_x.to_string()),
            ("minY", area.min_y.to_string()),
            ("maxY", area.max_y.to_string()),
        ])
        .await
    }

    async fn list_notes_by_sent_to(&self, sent_to: &str) -> Result<Vec<Note>, StoreError> {
        self.list(&[("sentTo", sent_to.to_owned())]).await
    }

    async fn increment_report_count(&self, id: NoteId) -> Result<u32, StoreError> {
        let response = self
            .http
            .put(self.url())
            .json(&ReportRequest { id })
            .send()
            .await
            .map_err(network_error)?;
        let receipt: ReportReceipt = Self::read(response).await?;
        Ok(receipt.report_count)
    }
}

// =============================================================================
// DECODING
// =============================================================================

fn network_error(e: reqwest::Error) -> StoreError {
    warn!(error = %e, "net: request failed");
    StoreError::Network(e.to_string())
}

/// Decode a success body or map an error status to [`StoreError`].
pub(crate) fn decode_response<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, StoreError> {
    if (200..300).contains(&status) {
        return serde_json::from_str(body).map_err(|e| StoreError::Decode(e.to_string()));
    }
    Err(error_from_status(status, body))
}

/// Map a non-success response to an error, preferring the server's message.
pub(crate) fn error_from_status(status: u16, body: &str) -> StoreError {
    let message = match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => with_details(parsed),
        Err(_) if body.trim().is_empty() => format!("HTTP {status}"),
        Err(_) => body.trim().to_owned(),
    };
    match status {
        400 | 422 => StoreError::Invalid(message),
        404 => StoreError::NotFound,
        429 => StoreError::RateLimited(message),
        _ => StoreError::Server { status, message },
    }
}

/// `error` plus any string details (field messages) appended.
fn with_details(body: ErrorBody) -> String {
    let details: Vec<String> = match body.details {
        Some(serde_json::Value::String(s)) => vec![s],
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|item| {
                item.get("message")
                    .and_then(serde_json::Value::as_str)
                    .or_else(|| item.as_str())
                    .map(str::to_owned)
            })
            .collect(),
        _ => Vec::new(),
    };
    if details.is_empty() { body.error } else { format!("{}: {}", body.error, details.join(", ")) }
}
