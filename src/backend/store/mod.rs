//! Persistence Boundary
//!
//! The message store is an external collaborator reached through simple
//! create/read/update/delete calls. Every call returns hydrated entities
//! (author joined with its profile).
//!
//! # Module Structure
//!
//! ```text
//! store/
//! ├── mod.rs    - `MessageStore` trait, `StoreError`
//! ├── memory.rs - In-memory store (default, tests)
//! └── sql.rs    - Sqlite store (sqlx)
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::shared::{Member, Message, MessageId, Page, PageCursor, SurfaceId};

/// In-memory store
pub mod memory;

/// Sqlite store
pub mod sql;

pub use memory::InMemoryStore;
pub use sql::SqliteStore;

/// A message about to be persisted
///
/// The id is chosen by the caller so that a retried create after a lost
/// acknowledgment resolves to the row already written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub id: MessageId,
    pub surface: SurfaceId,
    pub author: Member,
    pub content: String,
    pub file_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Result of a soft delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// This call redacted the message
    Deleted(Message),
    /// The message was already deleted; nothing changed
    AlreadyDeleted(Message),
}

/// Persistence errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    /// The write conflicts with the stored state (e.g. editing a deleted message)
    #[error("conflict: {0}")]
    Conflict(String),
    /// Retryable failure (pool exhausted, io, busy database)
    #[error("transient store failure: {0}")]
    Transient(String),
    #[error("store failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::Transient(err.to_string())
            }
            sqlx::Error::Database(ref db) if db.message().contains("locked") => {
                Self::Transient(err.to_string())
            }
            other => Self::Backend(other.to_string()),
        }
    }
}

/// Message persistence used by the mutation gateway and the history API
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// The member acting as `profile_id` inside `surface`, if any
    async fn membership(
        &self,
        surface: &SurfaceId,
        profile_id: Uuid,
    ) -> Result<Option<Member>, StoreError>;

    /// Persist a message; an id that already exists returns the stored row
    async fn create(&self, message: NewMessage) -> Result<Message, StoreError>;

    async fn get(&self, id: MessageId) -> Result<Message, StoreError>;

    /// Messages of `surface` strictly older than `cursor`, newest first
    async fn page(
        &self,
        surface: &SurfaceId,
        cursor: Option<PageCursor>,
        limit: u32,
    ) -> Result<Page, StoreError>;

    /// Replace content and set `updated_at`; `Conflict` once deleted
    async fn update_content(
        &self,
        id: MessageId,
        content: &str,
        at: DateTime<Utc>,
    ) -> Result<Message, StoreError>;

    /// Redact the message in a single step
    async fn soft_delete(&self, id: MessageId, at: DateTime<Utc>) -> Result<DeleteOutcome, StoreError>;
}
