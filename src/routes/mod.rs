//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Binds the note REST endpoints, the websocket change feed, the client
//! config endpoint and a health check under one Axum router. CORS is open
//! because the canvas page may be served from a different origin.

pub mod feed;
pub mod notes;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{delete, get, post};
use canvas::cooldown::CooldownConfig;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/api/notes",
            get(notes::list_notes).post(notes::create_note).put(notes::report_note_by_body),
        )
        .route("/api/notes/feed", get(feed::handle_feed))
        .route("/api/notes/{id}", delete(notes::delete_note))
        .route("/api/notes/{id}/report", post(notes::report_note))
        .route("/api/config", get(client_config))
        .route("/healthz", get(healthz))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// `GET /api/config`: cooldown settings the canvas client should apply.
async fn client_config(State(state): State<AppState>) -> Json<CooldownConfig> {
    Json(state.config.cooldown)
}

async fn healthz(State(state): State<AppState>) -> StatusCode {
    match state.notes.ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
