/**
 * Realtime WebSocket Client
 *
 * Client side of `GET /ws`. Implements `TopicLink` over one long-lived
 * websocket and forwards published events as `ClientNotice`s.
 *
 * The server answers control frames in the order it receives them, so
 * join and leave calls wait on a FIFO of reply slots. Enqueueing a slot and
 * sending its frame happen under one lock to keep both orders equal.
 *
 * Delivery stops silently when the socket drops; a `Disconnected` notice is
 * emitted. After `reconnect`, every store must `resync` to rejoin its topic
 * and re-fetch what it missed.
 */

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use super::error::ClientError;
use super::store::TopicLink;
use crate::shared::{ClientFrame, RealtimeEvent, ServerFrame, Topic};

/// How long a join or leave waits for the server's reply
pub const REPLY_TIMEOUT: Duration = Duration::from_secs(10);

/// What the realtime connection reports to its owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientNotice {
    Event(RealtimeEvent),
    Disconnected,
}

type ReplySlots = Arc<Mutex<VecDeque<oneshot::Sender<ServerFrame>>>>;

struct Connection {
    outgoing: mpsc::UnboundedSender<WsMessage>,
    replies: ReplySlots,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl Connection {
    fn shutdown(self) {
        let _ = self.outgoing.send(WsMessage::Close(None));
        self.reader.abort();
        // writer exits after flushing the close frame
        drop(self.writer);
    }
}

pub struct RealtimeClient {
    url: String,
    notices: mpsc::UnboundedSender<ClientNotice>,
    connection: Mutex<Option<Connection>>,
}

impl std::fmt::Debug for RealtimeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeClient")
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

/// Websocket url for an http(s) or ws(s) base url
fn ws_url(base_url: &str, token: &str) -> Result<String, ClientError> {
    let base = base_url.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else if base.starts_with("ws://") || base.starts_with("wss://") {
        base.to_string()
    } else {
        return Err(ClientError::Transport(format!("unsupported url scheme: {}", base_url)));
    };
    Ok(format!("{}/ws?token={}", base, token))
}

impl RealtimeClient {
    /// Open the websocket
    ///
    /// Returns the client and the receiver of its notices.
    pub async fn connect(
        base_url: &str,
        token: &str,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ClientNotice>), ClientError> {
        let (notices, notice_rx) = mpsc::unbounded_channel();
        let client = Self {
            url: ws_url(base_url, token)?,
            notices,
            connection: Mutex::new(None),
        };
        client.reconnect().await?;
        Ok((client, notice_rx))
    }

    fn lock(&self) -> MutexGuard<'_, Option<Connection>> {
        self.connection.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_connected(&self) -> bool {
        self.lock()
            .as_ref()
            .map(|conn| !conn.reader.is_finished())
            .unwrap_or(false)
    }

    /// Dial again, replacing any previous socket
    ///
    /// Subscriptions do not survive; stores rejoin through `resync`.
    pub async fn reconnect(&self) -> Result<(), ClientError> {
        let (socket, _response) = connect_async(self.url.as_str()).await?;
        let (mut sink, mut stream) = socket.split();
        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<WsMessage>();
        let replies: ReplySlots = Arc::new(Mutex::new(VecDeque::new()));

        let writer = tokio::spawn(async move {
            while let Some(message) = outgoing_rx.recv().await {
                let closing = matches!(message, WsMessage::Close(_));
                if sink.send(message).await.is_err() || closing {
                    break;
                }
            }
        });

        let reader = {
            let replies = replies.clone();
            let notices = self.notices.clone();
            tokio::spawn(async move {
                while let Some(incoming) = stream.next().await {
                    let text = match incoming {
                        Ok(WsMessage::Text(text)) => text,
                        Ok(WsMessage::Close(_)) => break,
                        Ok(_) => continue,
                        Err(e) => {
                            tracing::warn!("[Realtime] Socket error: {}", e);
                            break;
                        }
                    };
                    match serde_json::from_str::<ServerFrame>(text.as_str()) {
                        Ok(ServerFrame::Event(event)) => {
                            let _ = notices.send(ClientNotice::Event(event));
                        }
                        Ok(reply) => {
                            let slot = replies.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
                            match slot {
                                Some(slot) => {
                                    let _ = slot.send(reply);
                                }
                                None => tracing::debug!("[Realtime] Unsolicited reply: {:?}", reply),
                            }
                        }
                        Err(e) => tracing::warn!("[Realtime] Undecodable frame: {}", e),
                    }
                }
                // dropping the slots fails every waiting join or leave
                replies.lock().unwrap_or_else(PoisonError::into_inner).clear();
                let _ = notices.send(ClientNotice::Disconnected);
            })
        };

        let previous = self.lock().replace(Connection {
            outgoing,
            replies,
            reader,
            writer,
        });
        if let Some(previous) = previous {
            previous.shutdown();
        }
        tracing::info!("[Realtime] Connected");
        Ok(())
    }

    /// Close the socket; no further notices are emitted
    pub fn close(&self) {
        if let Some(connection) = self.lock().take() {
            connection.shutdown();
        }
    }

    async fn request(&self, frame: ClientFrame) -> Result<ServerFrame, ClientError> {
        let text = serde_json::to_string(&frame)?;
        let (slot, reply) = oneshot::channel();
        {
            let guard = self.lock();
            let connection = guard
                .as_ref()
                .ok_or_else(|| ClientError::Transport("not connected".to_string()))?;
            connection
                .replies
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_back(slot);
            connection
                .outgoing
                .send(WsMessage::Text(text.into()))
                .map_err(|_| ClientError::Transport("connection closed".to_string()))?;
        }

        match tokio::time::timeout(REPLY_TIMEOUT, reply).await {
            Ok(Ok(frame)) => Ok(frame),
            Ok(Err(_)) => Err(ClientError::Transport("connection closed".to_string())),
            Err(_) => Err(ClientError::Transport("timed out waiting for reply".to_string())),
        }
    }
}

#[async_trait]
impl TopicLink for RealtimeClient {
    async fn join(&self, topic: &Topic) -> Result<(), ClientError> {
        match self.request(ClientFrame::Join { topic: topic.clone() }).await? {
            ServerFrame::Joined { .. } => Ok(()),
            ServerFrame::Error { message } => Err(ClientError::Rejected(message)),
            other => Err(ClientError::Decode(format!("unexpected reply to join: {:?}", other))),
        }
    }

    async fn leave(&self, topic: &Topic) -> Result<(), ClientError> {
        match self.request(ClientFrame::Leave { topic: topic.clone() }).await? {
            ServerFrame::Left { .. } => Ok(()),
            ServerFrame::Error { message } => Err(ClientError::Rejected(message)),
            other => Err(ClientError::Decode(format!("unexpected reply to leave: {:?}", other))),
        }
    }
}

impl Drop for RealtimeClient {
    fn drop(&mut self) {
        self.close();
    }
}
