/**
 * Connection Registry
 *
 * Tracks live realtime connections, the topics each connection has joined,
 * and the subscriber set of every topic.
 *
 * # Locking
 *
 * Connections and topics live in two `DashMap`s so unrelated connections and
 * topics land on independent shards. Each topic's subscriber set sits behind
 * its own mutex, which is also what the event bus holds while it assigns a
 * sequence number and enqueues an event.
 *
 * Lock order is always connection entry, then topic map entry, then topic
 * mutex. The publish path takes only the last two.
 */

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::shared::{RealtimeEvent, Topic};

/// Identity of one live connection
pub type ConnectionId = Uuid;

/// Outbound event queue of a connection
pub type EventSender = mpsc::Sender<Arc<RealtimeEvent>>;
pub type EventReceiver = mpsc::Receiver<Arc<RealtimeEvent>>;

/// Default per-connection queue length
pub const DEFAULT_CONNECTION_BUFFER: usize = 64;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("connection {0} is already registered")]
    AlreadyRegistered(ConnectionId),
    #[error("connection {0} is not registered")]
    NotRegistered(ConnectionId),
}

#[derive(Debug)]
struct ConnectionEntry {
    sender: EventSender,
    topics: HashSet<Topic>,
}

/// Subscribers of one topic, keyed by connection
#[derive(Debug, Default)]
pub struct TopicSubscribers {
    subscribers: HashMap<ConnectionId, EventSender>,
}

impl TopicSubscribers {
    pub fn iter(&self) -> impl Iterator<Item = (&ConnectionId, &EventSender)> {
        self.subscribers.iter()
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

fn lock(topic: &Mutex<TopicSubscribers>) -> MutexGuard<'_, TopicSubscribers> {
    topic.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, ConnectionEntry>,
    topics: DashMap<Topic, Mutex<TopicSubscribers>>,
    buffer: usize,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECTION_BUFFER)
    }
}

impl ConnectionRegistry {
    /// Create a registry whose connections queue up to `buffer` events
    pub fn new(buffer: usize) -> Self {
        Self {
            connections: DashMap::new(),
            topics: DashMap::new(),
            buffer: buffer.max(1),
        }
    }

    /// Register a connection and hand back its event queue
    pub fn register(&self, id: ConnectionId) -> Result<EventReceiver, RegistryError> {
        match self.connections.entry(id) {
            Entry::Occupied(_) => Err(RegistryError::AlreadyRegistered(id)),
            Entry::Vacant(vacant) => {
                let (sender, receiver) = mpsc::channel(self.buffer);
                vacant.insert(ConnectionEntry {
                    sender,
                    topics: HashSet::new(),
                });
                tracing::debug!("[Realtime] Registered connection {}", id);
                Ok(receiver)
            }
        }
    }

    /// Remove a connection and every subscription it holds
    ///
    /// Returns false if the connection was not registered.
    pub fn deregister(&self, id: ConnectionId) -> bool {
        let Some((_, entry)) = self.connections.remove(&id) else {
            return false;
        };
        for topic in &entry.topics {
            self.detach(id, topic);
        }
        tracing::debug!(
            "[Realtime] Deregistered connection {} ({} subscriptions dropped)",
            id,
            entry.topics.len()
        );
        true
    }

    /// Subscribe a connection to a topic
    ///
    /// Returns `Ok(false)` if it was already subscribed.
    pub fn join(&self, id: ConnectionId, topic: &Topic) -> Result<bool, RegistryError> {
        let mut connection = self
            .connections
            .get_mut(&id)
            .ok_or(RegistryError::NotRegistered(id))?;
        if !connection.topics.insert(topic.clone()) {
            return Ok(false);
        }

        let entry = self.topics.entry(topic.clone()).or_default();
        lock(&entry).subscribers.insert(id, connection.sender.clone());
        tracing::debug!("[Realtime] Connection {} joined {}", id, topic);
        Ok(true)
    }

    /// Unsubscribe a connection from a topic
    ///
    /// Returns false if there was nothing to remove.
    pub fn leave(&self, id: ConnectionId, topic: &Topic) -> bool {
        let Some(mut connection) = self.connections.get_mut(&id) else {
            return false;
        };
        if !connection.topics.remove(topic) {
            return false;
        }
        // Still holding the connection entry so a concurrent join of the
        // same pair cannot interleave with the detach.
        self.detach(id, topic);
        drop(connection);
        tracing::debug!("[Realtime] Connection {} left {}", id, topic);
        true
    }

    fn detach(&self, id: ConnectionId, topic: &Topic) {
        let now_empty = match self.topics.get(topic) {
            Some(entry) => {
                let mut subscribers = lock(&entry);
                subscribers.subscribers.remove(&id);
                subscribers.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.topics.remove_if(topic, |_, subscribers| lock(subscribers).is_empty());
        }
    }

    /// Run `f` over the subscribers of `topic` while holding its lock
    ///
    /// Returns None when the topic has no subscribers.
    pub fn with_subscribers<R>(&self, topic: &Topic, f: impl FnOnce(&TopicSubscribers) -> R) -> Option<R> {
        let entry = self.topics.get(topic)?;
        let subscribers = lock(&entry);
        let result = f(&subscribers);
        Some(result)
    }

    pub fn is_registered(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    pub fn is_subscribed(&self, id: ConnectionId, topic: &Topic) -> bool {
        self.connections
            .get(&id)
            .map(|connection| connection.topics.contains(topic))
            .unwrap_or(false)
    }

    /// Topics joined by a connection
    pub fn topics_of(&self, id: ConnectionId) -> Vec<Topic> {
        self.connections
            .get(&id)
            .map(|connection| connection.topics.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Number of topics with at least one subscriber
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.with_subscribers(topic, TopicSubscribers::len).unwrap_or(0)
    }
}
