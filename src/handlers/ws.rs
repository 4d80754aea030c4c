//! Live updates over WebSocket.
//!
//! A client first receives the current dataset as a `snapshot` message and
//! then one message per committed mutation. Each connection runs in its own
//! task; a client that falls behind skips the updates it missed.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, instrument, trace, warn};

use crate::events::SnapshotMessage;
use crate::schemas::AppState;

#[instrument(skip(ws))]
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    debug!("Upgrading connection to WebSocket");
    ws.on_upgrade(move |socket| observe(socket, state))
}

async fn send_json<T: Serialize>(socket: &mut WebSocket, message: &T) -> bool {
    let text = match serde_json::to_string(message) {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to serialize WebSocket message: {}", e);
            return true;
        }
    };
    socket.send(Message::Text(text)).await.is_ok()
}

async fn observe(mut socket: WebSocket, state: AppState) {
    // Subscribe before reading the snapshot so no commit falls in between.
    let mut updates = state.repository.subscribe();
    info!("WebSocket observer connected");

    let snapshot = SnapshotMessage::new(state.repository.snapshot().await);
    if !send_json(&mut socket, &snapshot).await {
        debug!("Observer left before the snapshot was delivered");
        return;
    }

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(event) => {
                    trace!("Forwarding {} to observer", event.kind);
                    if !send_json(&mut socket, &event).await {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Observer lagged behind, skipped {} updates", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => trace!("Ignoring message from observer"),
            },
        }
    }

    info!("WebSocket observer disconnected");
}
