/**
 * Realtime WebSocket Transport
 *
 * `GET /ws` upgrades an authenticated request to a websocket. Each socket
 * is one registry connection:
 *
 * - the reader half handles `join` / `leave` control frames,
 * - a writer task forwards control replies and published events,
 * - closing the socket deregisters the connection and with it every
 *   subscription.
 *
 * Joining a topic requires membership in the topic's surface. There is no
 * replay: a client that reconnects must join again and re-fetch history.
 */

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::registry::ConnectionId;
use crate::backend::error::BackendError;
use crate::backend::middleware::auth::{Identity, MaybeIdentity};
use crate::backend::server::state::AppState;
use crate::shared::{ClientFrame, ServerFrame};

/// Control replies waiting to be written
const REPLY_BUFFER: usize = 16;

/// GET /ws
pub async fn handle_ws_upgrade(
    State(state): State<AppState>,
    MaybeIdentity(identity): MaybeIdentity,
    ws: WebSocketUpgrade,
) -> Result<Response, BackendError> {
    let identity = identity.ok_or(BackendError::Unauthorized)?;
    Ok(ws.on_upgrade(move |socket| run_connection(socket, state, identity)))
}

async fn run_connection(socket: WebSocket, state: AppState, identity: Identity) {
    let connection: ConnectionId = Uuid::new_v4();
    let registry = state.bus.registry().clone();
    let mut events = match registry.register(connection) {
        Ok(events) => events,
        Err(e) => {
            tracing::error!("[Realtime] Could not register connection: {}", e);
            return;
        }
    };
    tracing::info!(
        "[Realtime] Connection {} opened for profile {}",
        connection,
        identity.profile_id
    );

    let (mut sink, mut stream) = socket.split();
    let (reply_tx, mut reply_rx) = mpsc::channel::<ServerFrame>(REPLY_BUFFER);

    let writer = tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                biased;
                Some(reply) = reply_rx.recv() => reply,
                Some(event) = events.recv() => ServerFrame::Event((*event).clone()),
                else => break,
            };
            let text = match serde_json::to_string(&frame) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("[Realtime] Failed to serialize frame: {}", e);
                    continue;
                }
            };
            if sink.send(WsMessage::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(incoming) = stream.next().await {
        match incoming {
            Ok(WsMessage::Text(text)) => {
                let reply = match serde_json::from_str::<ClientFrame>(text.as_str()) {
                    Ok(frame) => handle_frame(&state, connection, identity, frame).await,
                    Err(e) => ServerFrame::Error {
                        message: format!("invalid frame: {}", e),
                    },
                };
                if reply_tx.send(reply).await.is_err() {
                    break;
                }
            }
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("[Realtime] Connection {} errored: {}", connection, e);
                break;
            }
        }
    }

    registry.deregister(connection);
    writer.abort();
    tracing::info!("[Realtime] Connection {} closed", connection);
}

async fn handle_frame(
    state: &AppState,
    connection: ConnectionId,
    identity: Identity,
    frame: ClientFrame,
) -> ServerFrame {
    match frame {
        ClientFrame::Join { topic } => {
            let surface = topic.surface();
            match state.store.membership(&surface, identity.profile_id).await {
                Ok(Some(_)) => match state.bus.subscribe(&topic, connection) {
                    Ok(_) => ServerFrame::Joined { topic },
                    Err(e) => ServerFrame::Error {
                        message: e.to_string(),
                    },
                },
                Ok(None) => ServerFrame::Error {
                    message: format!("not a member of {}", surface),
                },
                Err(e) => {
                    tracing::warn!("[Realtime] Membership check for {} failed: {}", topic, e);
                    ServerFrame::Error {
                        message: format!("could not join {}", topic),
                    }
                }
            }
        }
        ClientFrame::Leave { topic } => {
            state.bus.unsubscribe(&topic, connection);
            ServerFrame::Left { topic }
        }
    }
}
