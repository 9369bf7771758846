//! Chat Message Data Structure
//!
//! Represents a message posted to a chat surface (a text channel or a direct
//! conversation), fully hydrated with its author. The same structure is
//! returned by page fetches and carried as the payload of realtime events.

use crate::shared::error::SharedError;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Content shown in place of a soft-deleted message
pub const DELETED_PLACEHOLDER: &str = "This message has been deleted.";

/// Globally unique message identifier
pub type MessageId = Uuid;

/// Identifier of a chat surface
///
/// Text form is `channel:<uuid>` or `conversation:<uuid>`, which is also the
/// form used in query strings and topic names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SurfaceId {
    /// A text channel inside a server
    Channel(Uuid),
    /// A direct conversation between two members
    Conversation(Uuid),
}

impl SurfaceId {
    /// Prefix used in the text form
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Channel(_) => "channel",
            Self::Conversation(_) => "conversation",
        }
    }

    /// Underlying channel or conversation id
    pub fn id(&self) -> Uuid {
        match self {
            Self::Channel(id) | Self::Conversation(id) => *id,
        }
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

impl FromStr for SurfaceId {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| SharedError::parse("surface", s))?;
        let id = Uuid::parse_str(id).map_err(|_| SharedError::parse("surface", s))?;
        match kind {
            "channel" => Ok(Self::Channel(id)),
            "conversation" => Ok(Self::Conversation(id)),
            _ => Err(SharedError::parse("surface", s)),
        }
    }
}

impl TryFrom<String> for SurfaceId {
    type Error = SharedError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SurfaceId> for String {
    fn from(surface: SurfaceId) -> Self {
        surface.to_string()
    }
}

/// Role of a member within a server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberRole {
    Guest,
    Moderator,
    Admin,
}

impl MemberRole {
    /// Moderators and admins may delete other members' messages
    pub fn is_elevated(self) -> bool {
        matches!(self, Self::Moderator | Self::Admin)
    }

    /// Stored representation
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Guest => "GUEST",
            Self::Moderator => "MODERATOR",
            Self::Admin => "ADMIN",
        }
    }
}

impl FromStr for MemberRole {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GUEST" => Ok(Self::Guest),
            "MODERATOR" => Ok(Self::Moderator),
            "ADMIN" => Ok(Self::Admin),
            other => Err(SharedError::parse("role", other)),
        }
    }
}

/// A member of the server that owns a chat surface, joined with its profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// Member id (scoped to one server)
    pub id: Uuid,
    /// Profile id supplied by the identity provider
    pub profile_id: Uuid,
    /// Display name
    pub name: String,
    /// Avatar url
    #[serde(default)]
    pub image_url: Option<String>,
    pub role: MemberRole,
}

/// A fully hydrated chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    /// Surface the message was posted to
    pub surface: SurfaceId,
    /// Author, as a member of the surface's server
    pub author: Member,
    /// Text content; the placeholder once deleted
    pub content: String,
    /// Uploaded attachment url
    #[serde(default)]
    pub file_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Soft-delete flag
    #[serde(default)]
    pub deleted: bool,
}

impl Message {
    /// Ordering key: creation time, then id for stability
    pub fn order_key(&self) -> (DateTime<Utc>, MessageId) {
        (self.created_at, self.id)
    }

    /// True when the content was edited after creation
    pub fn is_edited(&self) -> bool {
        !self.deleted && self.updated_at != self.created_at
    }

    /// Attachment-only messages cannot be edited
    pub fn has_attachment(&self) -> bool {
        self.file_url.is_some()
    }

    /// Apply a soft delete: redact content and attachment, keep id and creation time
    pub fn redact(&mut self, at: DateTime<Utc>) {
        self.content = DELETED_PLACEHOLDER.to_string();
        self.file_url = None;
        self.deleted = true;
        self.updated_at = at;
    }

    /// Whether this copy should replace `other` (a copy of the same message)
    ///
    /// A deleted copy always wins so stale copies never resurrect a message.
    /// Otherwise the later `updated_at` wins; ties keep `other`.
    pub fn supersedes(&self, other: &Message) -> bool {
        match (self.deleted, other.deleted) {
            (true, false) => true,
            (false, true) => false,
            _ => self.updated_at > other.updated_at,
        }
    }
}

/// Current time truncated to the microsecond precision persisted by stores
pub fn now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// A modification time strictly later than `previous`
pub fn bumped_after(previous: DateTime<Utc>) -> DateTime<Utc> {
    now_micros().max(previous + Duration::microseconds(1))
}
