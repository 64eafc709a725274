//! Note REST routes.
//!
//! Handlers translate HTTP into [`crate::services::notes`] calls. Error
//! bodies are always `{"error": "...", "details"?: ...}` so the canvas client
//! can show `error` directly.

#[cfg(test)]
#[path = "notes_test.rs"]
mod notes_test;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use canvas::note::{GridArea, Note, NoteId};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::rate_limit::{RateAction, RateLimitError};
use crate::services::notes::{self, CreateNoteInput, NoteError, NoteFilter};
use crate::state::AppState;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    details: Option<Value>,
}

impl ApiError {
    fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self { status, error: error.into(), details: None }
    }

    fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({ "error": self.error });
        if let Some(details) = self.details {
            body["details"] = details;
        }
        (self.status, Json(body)).into_response()
    }
}

/// Map a service error to a response. `context` names the failed operation
/// for repository errors.
fn note_error_to_api(err: NoteError, context: &str) -> ApiError {
    match err {
        NoteError::MissingFields => {
            ApiError::new(StatusCode::BAD_REQUEST, "Missing required fields: message, sent_to, x, y")
        }
        NoteError::Invalid(errors) => ApiError::new(StatusCode::BAD_REQUEST, "Validation failed")
            .with_details(serde_json::to_value(&errors).unwrap_or(Value::Null)),
        NoteError::Moderated(reason) => ApiError::new(StatusCode::BAD_REQUEST, "Note rejected").with_details(json!(reason)),
        NoteError::RateLimited(RateLimitError::Exceeded { action, .. }) => {
            let what = match action {
                RateAction::CreateNote => "creating another note",
                RateAction::ReportNote => "reporting another note",
            };
            ApiError::new(StatusCode::TOO_MANY_REQUESTS, format!("Rate limit exceeded. Please wait before {what}."))
        }
        NoteError::NotFound => ApiError::new(StatusCode::NOT_FOUND, "Note not found"),
        NoteError::Database(e) => {
            tracing::error!(error = %e, "{context}");
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, context).with_details(json!(e.to_string()))
        }
    }
}

fn bad_note_id(rejection: PathRejection) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "Note ID must be a UUID").with_details(json!(rejection.body_text()))
}

fn bad_query(rejection: QueryRejection) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "Invalid query parameters").with_details(json!(rejection.body_text()))
}

// =============================================================================
// CLIENT IP
// =============================================================================

/// Client address as reported by the proxy: the first `x-forwarded-for`
/// entry, then `x-real-ip`, else `"unknown"`.
pub fn client_ip(headers: &HeaderMap) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };
    header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| header("x-real-ip"))
        .unwrap_or("unknown")
        .to_owned()
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(rename = "sentTo")]
    pub sent_to: Option<String>,
    #[serde(rename = "minX")]
    pub min_x: Option<i32>,
    #[serde(rename = "maxX")]
    pub max_x: Option<i32>,
    #[serde(rename = "minY")]
    pub min_y: Option<i32>,
    #[serde(rename = "maxY")]
    pub max_y: Option<i32>,
}

impl ListQuery {
    /// `sentTo` wins over the area; the area needs all four bounds.
    fn filter(self) -> NoteFilter {
        if let Some(sent_to) = self.sent_to.filter(|s| !s.is_empty()) {
            return NoteFilter::SentTo(sent_to);
        }
        match (self.min_x, self.max_x, self.min_y, self.max_y) {
            (Some(min_x), Some(max_x), Some(min_y), Some(max_y)) => {
                NoteFilter::Area(GridArea { min_x, max_x, min_y, max_y })
            }
            _ => NoteFilter::All,
        }
    }
}

/// `GET /api/notes`: list notes, newest first.
pub async fn list_notes(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<Note>>, ApiError> {
    let Query(query) = query.map_err(bad_query)?;
    let notes = notes::list_notes(&state, &query.filter())
        .await
        .map_err(|e| note_error_to_api(e, "Failed to fetch notes"))?;
    Ok(Json(notes))
}

/// Pull a creation request out of a loosely typed body. Strings must be
/// strings and coordinates numbers; anything else counts as missing.
fn create_input(body: &Value) -> CreateNoteInput {
    let string = |key: &str| body.get(key).and_then(Value::as_str).map(str::to_owned);
    CreateNoteInput {
        sent_to: string("sent_to"),
        message: string("message"),
        x: body.get("x").and_then(Value::as_f64),
        y: body.get("y").and_then(Value::as_f64),
        color: string("color"),
    }
}

/// `POST /api/notes`: create a note.
pub async fn create_note(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Note>, ApiError> {
    let input = body.map(|Json(value)| create_input(&value)).unwrap_or_default();
    let ip = client_ip(&headers);
    let note = notes::create_note(&state, &ip, input)
        .await
        .map_err(|e| note_error_to_api(e, "Failed to create note"))?;
    Ok(Json(note))
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub success: bool,
    pub id: NoteId,
    pub report_count: u32,
    pub message: &'static str,
}

async fn report(state: &AppState, headers: &HeaderMap, id: NoteId) -> Result<Json<ReportResponse>, ApiError> {
    let ip = client_ip(headers);
    let report_count = notes::report_note(state, &ip, id)
        .await
        .map_err(|e| note_error_to_api(e, "Failed to report note"))?;
    Ok(Json(ReportResponse { success: true, id, report_count, message: "Report submitted successfully" }))
}

/// `PUT /api/notes`: report the note named by `{"id": ...}`.
pub async fn report_note_by_body(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ReportResponse>, ApiError> {
    let id = body
        .ok()
        .and_then(|Json(value)| value.get("id").and_then(Value::as_str).map(str::to_owned))
        .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "Note ID is required in request body"))?;
    let id = id
        .parse::<NoteId>()
        .map_err(|_| ApiError::new(StatusCode::BAD_REQUEST, "Note ID must be a UUID"))?;
    report(&state, &headers, id).await
}

/// `POST /api/notes/{id}/report`: report a note by path.
pub async fn report_note(
    State(state): State<AppState>,
    headers: HeaderMap,
    id: Result<Path<NoteId>, PathRejection>,
) -> Result<Json<ReportResponse>, ApiError> {
    let Path(id) = id.map_err(bad_note_id)?;
    report(&state, &headers, id).await
}

/// `DELETE /api/notes/{id}`: delete a note.
pub async fn delete_note(
    State(state): State<AppState>,
    id: Result<Path<NoteId>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(id) = id.map_err(bad_note_id)?;
    notes::delete_note(&state, id)
        .await
        .map_err(|e| note_error_to_api(e, "Failed to delete note"))?;
    Ok(Json(json!({ "success": true })))
}
