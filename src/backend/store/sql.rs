//! Sqlite message store
//!
//! Ids are stored as uuid text and timestamps as unix microseconds, so the
//! `(created_at, id)` ordering of the history index matches the ordering key
//! used everywhere else.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use uuid::Uuid;

use super::{DeleteOutcome, MessageStore, NewMessage, StoreError};
use crate::shared::{Member, Message, MessageId, Page, PageCursor, SurfaceId, DELETED_PLACEHOLDER};

const MESSAGE_SELECT: &str = r#"
    SELECT m.id, m.surface, m.content, m.file_url, m.created_at, m.updated_at, m.deleted,
           mb.id AS member_id, mb.profile_id, mb.role, p.name, p.image_url
    FROM messages m
    JOIN members mb ON mb.id = m.member_id
    JOIN profiles p ON p.id = mb.profile_id
"#;

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open a pool for `url` and run migrations
    ///
    /// In-memory databases are private to one connection, so the pool is
    /// pinned to a single connection that never expires.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let in_memory = url.contains(":memory:");
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        tracing::info!("[Store] Running sqlite migrations");
        sqlx::migrate!()
            .run(&pool)
            .await
            .map_err(|e| StoreError::Backend(format!("migration failed: {}", e)))?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert a member (and its profile) into a server
    pub async fn insert_member(&self, server_id: Uuid, member: &Member) -> Result<(), StoreError> {
        sqlx::query("INSERT OR IGNORE INTO profiles (id, name, image_url) VALUES (?, ?, ?)")
            .bind(member.profile_id.to_string())
            .bind(&member.name)
            .bind(member.image_url.as_deref())
            .execute(&self.pool)
            .await?;

        sqlx::query("INSERT INTO members (id, profile_id, server_id, role) VALUES (?, ?, ?, ?)")
            .bind(member.id.to_string())
            .bind(member.profile_id.to_string())
            .bind(server_id.to_string())
            .bind(member.role.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn insert_channel(&self, channel_id: Uuid, server_id: Uuid, name: &str) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO channels (id, server_id, name) VALUES (?, ?, ?)")
            .bind(channel_id.to_string())
            .bind(server_id.to_string())
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn insert_conversation(
        &self,
        conversation_id: Uuid,
        member_one_id: Uuid,
        member_two_id: Uuid,
    ) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO conversations (id, member_one_id, member_two_id) VALUES (?, ?, ?)")
            .bind(conversation_id.to_string())
            .bind(member_one_id.to_string())
            .bind(member_two_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn uuid_column(row: &SqliteRow, column: &str) -> Result<Uuid, StoreError> {
    let text: String = row.try_get(column)?;
    Uuid::parse_str(&text).map_err(|e| StoreError::Backend(format!("bad uuid in {}: {}", column, e)))
}

fn time_column(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>, StoreError> {
    let micros: i64 = row.try_get(column)?;
    DateTime::<Utc>::from_timestamp_micros(micros)
        .ok_or_else(|| StoreError::Backend(format!("bad timestamp in {}: {}", column, micros)))
}

fn member_from_row(row: &SqliteRow) -> Result<Member, StoreError> {
    let role: String = row.try_get("role")?;
    Ok(Member {
        id: uuid_column(row, "member_id")?,
        profile_id: uuid_column(row, "profile_id")?,
        name: row.try_get("name")?,
        image_url: row.try_get("image_url")?,
        role: role.parse().map_err(|e| StoreError::Backend(format!("{}", e)))?,
    })
}

fn message_from_row(row: &SqliteRow) -> Result<Message, StoreError> {
    let surface: String = row.try_get("surface")?;
    Ok(Message {
        id: uuid_column(row, "id")?,
        surface: surface.parse().map_err(|e| StoreError::Backend(format!("{}", e)))?,
        author: member_from_row(row)?,
        content: row.try_get("content")?,
        file_url: row.try_get("file_url")?,
        created_at: time_column(row, "created_at")?,
        updated_at: time_column(row, "updated_at")?,
        deleted: row.try_get("deleted")?,
    })
}

#[async_trait]
impl MessageStore for SqliteStore {
    async fn membership(
        &self,
        surface: &SurfaceId,
        profile_id: Uuid,
    ) -> Result<Option<Member>, StoreError> {
        let query = match surface {
            SurfaceId::Channel(_) => {
                r#"
                SELECT mb.id AS member_id, mb.profile_id, mb.role, p.name, p.image_url
                FROM channels c
                JOIN members mb ON mb.server_id = c.server_id
                JOIN profiles p ON p.id = mb.profile_id
                WHERE c.id = ? AND mb.profile_id = ?
                "#
            }
            SurfaceId::Conversation(_) => {
                r#"
                SELECT mb.id AS member_id, mb.profile_id, mb.role, p.name, p.image_url
                FROM conversations c
                JOIN members mb ON mb.id IN (c.member_one_id, c.member_two_id)
                JOIN profiles p ON p.id = mb.profile_id
                WHERE c.id = ? AND mb.profile_id = ?
                "#
            }
        };

        let row = sqlx::query(query)
            .bind(surface.id().to_string())
            .bind(profile_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(member_from_row).transpose()
    }

    async fn create(&self, message: NewMessage) -> Result<Message, StoreError> {
        let created_at = message.created_at.timestamp_micros();
        sqlx::query(
            r#"
            INSERT INTO messages (id, surface, member_id, content, file_url, created_at, updated_at, deleted)
            VALUES (?, ?, ?, ?, ?, ?, ?, 0)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(message.id.to_string())
        .bind(message.surface.to_string())
        .bind(message.author.id.to_string())
        .bind(&message.content)
        .bind(message.file_url.as_deref())
        .bind(created_at)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        self.get(message.id).await
    }

    async fn get(&self, id: MessageId) -> Result<Message, StoreError> {
        let row = sqlx::query(&format!("{} WHERE m.id = ?", MESSAGE_SELECT))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;
        message_from_row(&row)
    }

    async fn page(
        &self,
        surface: &SurfaceId,
        cursor: Option<PageCursor>,
        limit: u32,
    ) -> Result<Page, StoreError> {
        let rows = match cursor {
            Some(cursor) => {
                let before = cursor.created_at.timestamp_micros();
                sqlx::query(&format!(
                    "{} WHERE m.surface = ? AND (m.created_at < ? OR (m.created_at = ? AND m.id < ?)) \
                     ORDER BY m.created_at DESC, m.id DESC LIMIT ?",
                    MESSAGE_SELECT
                ))
                .bind(surface.to_string())
                .bind(before)
                .bind(before)
                .bind(cursor.id.to_string())
                .bind(i64::from(limit))
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "{} WHERE m.surface = ? ORDER BY m.created_at DESC, m.id DESC LIMIT ?",
                    MESSAGE_SELECT
                ))
                .bind(surface.to_string())
                .bind(i64::from(limit))
                .fetch_all(&self.pool)
                .await?
            }
        };

        let items = rows.iter().map(message_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(Page::from_items(items, limit))
    }

    async fn update_content(
        &self,
        id: MessageId,
        content: &str,
        at: DateTime<Utc>,
    ) -> Result<Message, StoreError> {
        let result = sqlx::query("UPDATE messages SET content = ?, updated_at = ? WHERE id = ? AND deleted = 0")
            .bind(content)
            .bind(at.timestamp_micros())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            // Either missing (get reports NotFound) or already deleted
            self.get(id).await?;
            return Err(StoreError::Conflict(format!("message {} is deleted", id)));
        }
        self.get(id).await
    }

    async fn soft_delete(&self, id: MessageId, at: DateTime<Utc>) -> Result<DeleteOutcome, StoreError> {
        let result = sqlx::query(
            "UPDATE messages SET content = ?, file_url = NULL, deleted = 1, updated_at = ? WHERE id = ? AND deleted = 0",
        )
        .bind(DELETED_PLACEHOLDER)
        .bind(at.timestamp_micros())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        let message = self.get(id).await?;
        if result.rows_affected() == 0 {
            Ok(DeleteOutcome::AlreadyDeleted(message))
        } else {
            Ok(DeleteOutcome::Deleted(message))
        }
    }
}
