/**
 * Realtime Event System
 *
 * This module defines the events pushed to clients when a message is
 * created, edited or deleted, the topics they are routed on, and the
 * frames exchanged over the realtime websocket.
 *
 * Every chat surface has exactly one topic. Events carry a sequence number
 * assigned at publish time; within a topic, delivery order equals
 * sequence order.
 */
use crate::shared::error::SharedError;
use crate::shared::message::{Message, SurfaceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Routing key for the events of one chat surface
///
/// Shares the surface's text form, e.g. `channel:<uuid>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Topic(SurfaceId);

impl Topic {
    /// Topic carrying the events of `surface`
    pub fn for_surface(surface: &SurfaceId) -> Self {
        Self(*surface)
    }

    /// Surface this topic belongs to
    pub fn surface(&self) -> SurfaceId {
        self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for Topic {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let surface: SurfaceId = s.parse().map_err(|_| SharedError::parse("topic", s))?;
        Ok(Self(surface))
    }
}

impl TryFrom<String> for Topic {
    type Error = SharedError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Topic> for String {
    fn from(topic: Topic) -> Self {
        topic.to_string()
    }
}

/// Type of realtime event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A new message was posted
    Created,
    /// A message's content was edited
    Updated,
    /// A message was soft-deleted; the payload is redacted
    Deleted,
}

/// Realtime event delivered to every subscriber of a topic
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeEvent {
    /// Topic the event was published on
    pub topic: Topic,
    /// Type of event
    pub kind: EventKind,
    /// The message as persisted
    pub payload: Message,
    /// Publish-order sequence number
    pub seq: u64,
    /// When the event was published
    pub emitted_at: DateTime<Utc>,
}

impl RealtimeEvent {
    /// Create a new realtime event
    pub fn new(topic: Topic, kind: EventKind, payload: Message, seq: u64) -> Self {
        Self {
            topic,
            kind,
            payload,
            seq,
            emitted_at: Utc::now(),
        }
    }
}

/// Control frames sent by a client over the realtime websocket
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Join { topic: Topic },
    Leave { topic: Topic },
}

/// Frames sent by the server over the realtime websocket
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Subscription confirmed
    Joined { topic: Topic },
    /// Subscription removed
    Left { topic: Topic },
    /// A published event
    Event(RealtimeEvent),
    /// A control frame was rejected
    Error { message: String },
}
