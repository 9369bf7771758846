/**
 * Event Bus
 *
 * Topic-addressed, fire-and-forget fan-out on top of the connection
 * registry. Delivery is at-most-once to the connections subscribed when the
 * event is published; there is no retry and no replay.
 *
 * # Ordering
 *
 * Every event gets a process-wide sequence number. The number is taken and
 * the event enqueued to every subscriber while the topic's lock is held, so
 * within a topic, queue order equals sequence order equals publish order.
 * Nothing is promised across topics.
 *
 * # Slow consumers
 *
 * Per-connection queues are bounded. A full queue drops the event for that
 * connection only; the client reconciles through page-fetch.
 */

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;

use super::registry::{ConnectionId, ConnectionRegistry, RegistryError};
use crate::shared::{EventKind, Message, RealtimeEvent, Topic};

#[derive(Debug)]
pub struct EventBus {
    registry: Arc<ConnectionRegistry>,
    seq: AtomicU64,
}

impl EventBus {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            registry,
            seq: AtomicU64::new(0),
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Subscribe a registered connection to `topic`
    pub fn subscribe(&self, topic: &Topic, connection: ConnectionId) -> Result<bool, RegistryError> {
        self.registry.join(connection, topic)
    }

    pub fn unsubscribe(&self, topic: &Topic, connection: ConnectionId) -> bool {
        self.registry.leave(connection, topic)
    }

    /// Last sequence number handed out
    pub fn last_seq(&self) -> u64 {
        self.seq.load(Ordering::SeqCst)
    }

    /// Publish an event to every current subscriber of `topic`
    ///
    /// Never fails; undeliverable copies are logged and dropped.
    pub fn publish(&self, topic: &Topic, kind: EventKind, payload: Message) {
        let outcome = self.registry.with_subscribers(topic, |subscribers| {
            let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
            let event = Arc::new(RealtimeEvent::new(topic.clone(), kind, payload, seq));
            let mut delivered = 0usize;
            for (connection, sender) in subscribers.iter() {
                match sender.try_send(event.clone()) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        tracing::warn!(
                            "[Realtime] Queue full for connection {}, dropping seq {} on {}",
                            connection,
                            seq,
                            topic
                        );
                    }
                    Err(TrySendError::Closed(_)) => {
                        tracing::debug!("[Realtime] Connection {} already closed, skipping", connection);
                    }
                }
            }
            (seq, delivered, subscribers.len())
        });

        match outcome {
            Some((seq, delivered, total)) => {
                tracing::info!(
                    "[Realtime] {:?} event seq {} on {} delivered to {}/{} subscribers",
                    kind,
                    seq,
                    topic,
                    delivered,
                    total
                );
            }
            None => {
                tracing::debug!("[Realtime] No subscribers on {}, {:?} event dropped", topic, kind);
            }
        }
    }
}
