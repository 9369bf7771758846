/**
 * In-process Topic Link
 *
 * Binds client stores to a connection registered directly on a server-side
 * `EventBus`, without a websocket in between. Used when the sync layer runs
 * in the same process as the server, and in tests.
 *
 * `disconnect` and `reconnect` behave like a dropped and re-dialed socket:
 * subscriptions are lost and stores have to `resync`.
 */

use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

use super::error::ClientError;
use super::store::TopicLink;
use crate::backend::realtime::{ConnectionId, EventBus, EventReceiver};
use crate::shared::Topic;

#[derive(Debug)]
pub struct LocalLink {
    bus: Arc<EventBus>,
    connection: Mutex<ConnectionId>,
}

impl LocalLink {
    /// Register a fresh connection on `bus`
    ///
    /// The receiver yields every event published on topics this link joins.
    pub fn connect(bus: Arc<EventBus>) -> Result<(Self, EventReceiver), ClientError> {
        let connection = Uuid::new_v4();
        let events = Self::register(&bus, connection)?;
        let link = Self {
            bus,
            connection: Mutex::new(connection),
        };
        Ok((link, events))
    }

    fn register(bus: &EventBus, connection: ConnectionId) -> Result<EventReceiver, ClientError> {
        bus.registry()
            .register(connection)
            .map_err(|e| ClientError::Transport(e.to_string()))
    }

    pub fn connection(&self) -> ConnectionId {
        *self.connection.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop the connection and every subscription on it
    pub fn disconnect(&self) {
        self.bus.registry().deregister(self.connection());
    }

    /// Replace the connection with a fresh one
    pub fn reconnect(&self) -> Result<EventReceiver, ClientError> {
        let mut connection = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        self.bus.registry().deregister(*connection);
        let fresh = Uuid::new_v4();
        let events = Self::register(&self.bus, fresh)?;
        *connection = fresh;
        tracing::debug!("[Realtime] Local link reconnected as {}", fresh);
        Ok(events)
    }
}

#[async_trait]
impl TopicLink for LocalLink {
    async fn join(&self, topic: &Topic) -> Result<(), ClientError> {
        self.bus
            .subscribe(topic, self.connection())
            .map(|_| ())
            .map_err(|e| ClientError::Transport(e.to_string()))
    }

    async fn leave(&self, topic: &Topic) -> Result<(), ClientError> {
        self.bus.unsubscribe(topic, self.connection());
        Ok(())
    }
}

impl Drop for LocalLink {
    fn drop(&mut self) {
        self.disconnect();
    }
}
