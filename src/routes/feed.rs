//! WebSocket change feed.
//!
//! DESIGN
//! ======
//! Each connection subscribes to the note broadcast channel and enters a
//! `select!` loop:
//! - Broadcast events → serialize as `{"event":"insert"|"delete","note":{...}}`
//!   text frames
//! - Incoming client frames → ignored, except close
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade handler subscribes before the handshake completes, so no event
//!    published after the client sees the upgrade is missed
//! 2. Events are forwarded until the client closes or a send fails
//! 3. A subscriber that falls more than the channel capacity behind skips
//!    the lost events and keeps going; the client reloads to resync

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use canvas::feed::FeedEvent;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::state::AppState;

/// `GET /api/notes/feed`: upgrade to the change-feed websocket.
pub async fn handle_feed(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let events = state.feed.subscribe();
    ws.on_upgrade(move |socket| run_feed(socket, events))
}

async fn run_feed(mut socket: WebSocket, mut events: broadcast::Receiver<FeedEvent>) {
    let client_id = Uuid::new_v4();
    info!(%client_id, "feed: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(msg) = msg else { break };
                let Ok(msg) = msg else { break };
                if let Message::Close(_) = msg {
                    break;
                }
            }
            event = events.recv() => match event {
                Ok(event) => {
                    if send_event(&mut socket, &event).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(%client_id, skipped, "feed: subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    info!(%client_id, "feed: client disconnected");
}

async fn send_event(socket: &mut WebSocket, event: &FeedEvent) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "feed: event serialization failed");
            return Ok(());
        }
    };
    debug!(id = %event.note().id, "feed: forwarding event");
    socket.send(Message::Text(json.into())).await
}

#[cfg(test)]
#[path = "feed_test.rs"]
mod feed_test;
