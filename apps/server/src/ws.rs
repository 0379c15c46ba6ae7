//! # WebSocket Change Feed
//!
//! `GET /ws` upgrades to a WebSocket that streams the engine's change
//! events as JSON text frames:
//!
//! ```json
//! { "type": "invoiceCreated", "payload": { ... } }
//! { "type": "stockChanged",   "payload": [ { ... } ] }
//! ```
//!
//! The feed is strictly one-way. Inbound frames are drained and dropped:
//! clients cannot inject anything into the feed, only the engine's own
//! post-commit state goes out. A subscriber that falls behind the ring
//! buffer loses the oldest events and keeps going (at-most-once delivery).

use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::AppState;

const PING_INTERVAL: Duration = Duration::from_secs(30);

pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let mut events = state.engine.subscribe();
    let mut ping = tokio::time::interval(PING_INTERVAL);
    // The first tick fires immediately; skip it.
    ping.tick().await;

    debug!("change feed subscriber connected");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let json = match serde_json::to_string(&event) {
                        Ok(json) => json,
                        Err(e) => {
                            warn!(error = %e, "failed to encode change event");
                            continue;
                        }
                    };
                    if socket.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    // At-most-once: the slow subscriber eats the loss.
                    warn!(skipped, "change feed subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            },

            inbound = socket.recv() => match inbound {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Drained and dropped, never relayed.
                Some(Ok(_)) => {}
            },

            _ = ping.tick() => {
                if socket.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    debug!("change feed subscriber disconnected");
}
