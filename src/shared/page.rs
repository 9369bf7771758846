//! Cursor Pagination
//!
//! History is fetched newest page first. Each page is bounded by a limit and
//! an exclusive cursor pointing at the oldest message of the previous page;
//! a page without `next_cursor` is the last one.

use crate::shared::error::SharedError;
use crate::shared::message::{Message, MessageId, SurfaceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Exclusive position in a surface's history
///
/// Text form is `<unix-micros>_<uuid>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PageCursor {
    pub created_at: DateTime<Utc>,
    pub id: MessageId,
}

impl PageCursor {
    /// Cursor pointing at `message`; the next page starts strictly before it
    pub fn at(message: &Message) -> Self {
        Self {
            created_at: message.created_at,
            id: message.id,
        }
    }
}

impl fmt::Display for PageCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.created_at.timestamp_micros(), self.id)
    }
}

impl FromStr for PageCursor {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (micros, id) = s
            .split_once('_')
            .ok_or_else(|| SharedError::parse("cursor", s))?;
        let micros: i64 = micros.parse().map_err(|_| SharedError::parse("cursor", s))?;
        let created_at =
            DateTime::<Utc>::from_timestamp_micros(micros).ok_or_else(|| SharedError::parse("cursor", s))?;
        let id = Uuid::parse_str(id).map_err(|_| SharedError::parse("cursor", s))?;
        Ok(Self { created_at, id })
    }
}

impl TryFrom<String> for PageCursor {
    type Error = SharedError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PageCursor> for String {
    fn from(cursor: PageCursor) -> Self {
        cursor.to_string()
    }
}

/// One page of history, newest message first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub items: Vec<Message>,
    /// Cursor for the next older page; absent when history is exhausted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<PageCursor>,
}

impl Page {
    /// Build a page from items sorted newest first, fetched with `limit`
    pub fn from_items(items: Vec<Message>, limit: u32) -> Self {
        let next_cursor = if items.len() as u64 >= u64::from(limit) && limit > 0 {
            items.last().map(PageCursor::at)
        } else {
            None
        };
        Self { items, next_cursor }
    }
}

/// Query of the page-fetch API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub surface: SurfaceId,
    #[serde(default)]
    pub cursor: Option<PageCursor>,
    #[serde(default)]
    pub limit: Option<u32>,
}
