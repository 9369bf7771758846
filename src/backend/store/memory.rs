//! In-memory message store
//!
//! Used when no database is configured and throughout the tests. Writes can
//! be made to fail transiently with [`InMemoryStore::fail_next_writes`] to
//! exercise the gateway's retry path.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DeleteOutcome, MessageStore, NewMessage, StoreError};
use crate::shared::{Member, Message, MessageId, Page, PageCursor, SurfaceId};

type OrderKey = (DateTime<Utc>, MessageId);

#[derive(Debug, Default)]
struct Inner {
    /// surface -> profile id -> member
    memberships: HashMap<SurfaceId, HashMap<Uuid, Member>>,
    messages: HashMap<MessageId, Message>,
    by_surface: HashMap<SurfaceId, BTreeSet<OrderKey>>,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
    failing_writes: AtomicU32,
    write_calls: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `member` access to `surface`
    pub async fn add_member(&self, surface: SurfaceId, member: Member) {
        let mut inner = self.inner.write().await;
        inner
            .memberships
            .entry(surface)
            .or_default()
            .insert(member.profile_id, member);
    }

    /// Make the next `count` write calls fail with `Transient`
    pub fn fail_next_writes(&self, count: u32) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    /// Number of write calls received, failed ones included
    pub fn write_calls(&self) -> u64 {
        self.write_calls.load(Ordering::SeqCst)
    }

    fn begin_write(&self) -> Result<(), StoreError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::Transient("injected write failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl MessageStore for InMemoryStore {
    async fn membership(
        &self,
        surface: &SurfaceId,
        profile_id: Uuid,
    ) -> Result<Option<Member>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .memberships
            .get(surface)
            .and_then(|members| members.get(&profile_id))
            .cloned())
    }

    async fn create(&self, message: NewMessage) -> Result<Message, StoreError> {
        self.begin_write()?;
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.messages.get(&message.id) {
            return Ok(existing.clone());
        }

        let stored = Message {
            id: message.id,
            surface: message.surface,
            author: message.author,
            content: message.content,
            file_url: message.file_url,
            created_at: message.created_at,
            updated_at: message.created_at,
            deleted: false,
        };
        inner
            .by_surface
            .entry(stored.surface)
            .or_default()
            .insert(stored.order_key());
        inner.messages.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: MessageId) -> Result<Message, StoreError> {
        let inner = self.inner.read().await;
        inner.messages.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn page(
        &self,
        surface: &SurfaceId,
        cursor: Option<PageCursor>,
        limit: u32,
    ) -> Result<Page, StoreError> {
        let inner = self.inner.read().await;
        let Some(keys) = inner.by_surface.get(surface) else {
            return Ok(Page::default());
        };

        let upper = match cursor {
            Some(cursor) => Bound::Excluded((cursor.created_at, cursor.id)),
            None => Bound::Unbounded,
        };
        let items: Vec<Message> = keys
            .range((Bound::Unbounded, upper))
            .rev()
            .take(limit as usize)
            .filter_map(|(_, id)| inner.messages.get(id).cloned())
            .collect();
        Ok(Page::from_items(items, limit))
    }

    async fn update_content(
        &self,
        id: MessageId,
        content: &str,
        at: DateTime<Utc>,
    ) -> Result<Message, StoreError> {
        self.begin_write()?;
        let mut inner = self.inner.write().await;
        let message = inner.messages.get_mut(&id).ok_or(StoreError::NotFound)?;
        if message.deleted {
            return Err(StoreError::Conflict(format!("message {} is deleted", id)));
        }
        message.content = content.to_string();
        message.updated_at = at;
        Ok(message.clone())
    }

    async fn soft_delete(&self, id: MessageId, at: DateTime<Utc>) -> Result<DeleteOutcome, StoreError> {
        self.begin_write()?;
        let mut inner = self.inner.write().await;
        let message = inner.messages.get_mut(&id).ok_or(StoreError::NotFound)?;
        if message.deleted {
            return Ok(DeleteOutcome::AlreadyDeleted(message.clone()));
        }
        message.redact(at);
        Ok(DeleteOutcome::Deleted(message.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::message::now_micros as now;
    use crate::shared::{MemberRole, DELETED_PLACEHOLDER};
    use chrono::Duration;

    fn member(role: MemberRole) -> Member {
        Member {
            id: Uuid::new_v4(),
            profile_id: Uuid::new_v4(),
            name: "dana".to_string(),
            image_url: None,
            role,
        }
    }

    fn new_message(surface: SurfaceId, author: &Member, offset_us: i64) -> NewMessage {
        NewMessage {
            id: Uuid::new_v4(),
            surface,
            author: author.clone(),
            content: format!("message at {}", offset_us),
            file_url: None,
            created_at: now() + Duration::microseconds(offset_us),
        }
    }

    #[tokio::test]
    async fn test_membership_lookup() {
        let store = InMemoryStore::new();
        let surface = SurfaceId::Channel(Uuid::new_v4());
        let alice = member(MemberRole::Guest);
        store.add_member(surface, alice.clone()).await;

        assert_eq!(store.membership(&surface, alice.profile_id).await.unwrap(), Some(alice.clone()));
        assert_eq!(store.membership(&surface, Uuid::new_v4()).await.unwrap(), None);
        let other = SurfaceId::Conversation(Uuid::new_v4());
        assert_eq!(store.membership(&other, alice.profile_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_create_is_idempotent_by_id() {
        let store = InMemoryStore::new();
        let surface = SurfaceId::Channel(Uuid::new_v4());
        let author = member(MemberRole::Guest);
        let first = new_message(surface, &author, 0);
        let mut resubmitted = first.clone();
        resubmitted.content = "different".to_string();

        let a = store.create(first).await.unwrap();
        let b = store.create(resubmitted).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(store.page(&surface, None, 10).await.unwrap().items.len(), 1);
    }

    #[tokio::test]
    async fn test_paging_walks_history_backwards() {
        let store = InMemoryStore::new();
        let surface = SurfaceId::Channel(Uuid::new_v4());
        let author = member(MemberRole::Guest);
        for offset in 0..5 {
            store.create(new_message(surface, &author, offset)).await.unwrap();
        }

        let first = store.page(&surface, None, 2).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert!(first.items[0].created_at > first.items[1].created_at);

        let second = store.page(&surface, first.next_cursor, 2).await.unwrap();
        assert_eq!(second.items.len(), 2);
        assert!(second.items[0].created_at < first.items[1].created_at);

        let last = store.page(&surface, second.next_cursor, 2).await.unwrap();
        assert_eq!(last.items.len(), 1);
        assert!(last.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_update_rejects_deleted() {
        let store = InMemoryStore::new();
        let surface = SurfaceId::Channel(Uuid::new_v4());
        let author = member(MemberRole::Guest);
        let created = store.create(new_message(surface, &author, 0)).await.unwrap();

        let at = created.created_at + Duration::microseconds(1);
        let deleted = store.soft_delete(created.id, at).await.unwrap();
        assert!(matches!(deleted, DeleteOutcome::Deleted(ref m) if m.content == DELETED_PLACEHOLDER));

        let again = store.soft_delete(created.id, at).await.unwrap();
        assert!(matches!(again, DeleteOutcome::AlreadyDeleted(_)));

        let update = store.update_content(created.id, "edit", at).await;
        assert!(matches!(update, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = InMemoryStore::new();
        let surface = SurfaceId::Channel(Uuid::new_v4());
        let author = member(MemberRole::Guest);
        store.fail_next_writes(1);

        let message = new_message(surface, &author, 0);
        assert!(store.create(message.clone()).await.unwrap_err().is_transient());
        assert!(store.create(message).await.is_ok());
        assert_eq!(store.write_calls(), 2);
    }
}
