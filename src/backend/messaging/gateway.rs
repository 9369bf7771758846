//! Mutation Gateway
//!
//! Entry point for creating, editing and deleting messages. Every operation
//! validates the caller against the persistence layer, performs the write
//! (retrying transient failures), and only then publishes the matching
//! event on the surface's topic. A failed write publishes nothing, and a
//! publish never fails the write.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use super::retry::RetryPolicy;
use crate::backend::error::BackendError;
use crate::backend::middleware::auth::Identity;
use crate::backend::realtime::EventBus;
use crate::backend::store::{DeleteOutcome, MessageStore, NewMessage, StoreError};
use crate::shared::message::{bumped_after, now_micros};
use crate::shared::{EventKind, Member, Message, MessageId, SurfaceId, Topic};

/// Body of a create request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessage {
    pub surface: SurfaceId,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub file_url: Option<String>,
}

/// Body of an edit request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMessage {
    pub surface: SurfaceId,
    pub content: String,
}

pub struct MutationGateway {
    store: Arc<dyn MessageStore>,
    bus: Arc<EventBus>,
    retry: RetryPolicy,
}

impl MutationGateway {
    pub fn new(store: Arc<dyn MessageStore>, bus: Arc<EventBus>, retry: RetryPolicy) -> Self {
        Self { store, bus, retry }
    }

    /// Post a new message
    pub async fn create(
        &self,
        identity: Option<Identity>,
        request: CreateMessage,
    ) -> Result<Message, BackendError> {
        let identity = identity.ok_or(BackendError::Unauthorized)?;
        let file_url = request
            .file_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());
        let content = if request.content.trim().is_empty() {
            file_url
                .clone()
                .ok_or_else(|| BackendError::invalid_input("Message content or attachment is required"))?
        } else {
            request.content
        };

        let author = self.member_of(identity, &request.surface).await?;
        let new_message = NewMessage {
            id: Uuid::new_v4(),
            surface: request.surface,
            author,
            content,
            file_url,
            created_at: now_micros(),
        };

        let message = self
            .retry
            .run("create", || self.store.create(new_message.clone()))
            .await?;
        tracing::info!("[Gateway] Created message {} on {}", message.id, message.surface);

        self.publish(EventKind::Created, &message);
        Ok(message)
    }

    /// Edit a message's content; author only, never once deleted or on attachments
    pub async fn update(
        &self,
        identity: Option<Identity>,
        id: MessageId,
        request: UpdateMessage,
    ) -> Result<Message, BackendError> {
        let identity = identity.ok_or(BackendError::Unauthorized)?;
        if request.content.trim().is_empty() {
            return Err(BackendError::invalid_input("Message content cannot be empty"));
        }

        let member = self.member_of(identity, &request.surface).await?;
        let current = self.load_in_surface(id, &request.surface).await?;
        if current.deleted {
            return Err(BackendError::forbidden("Deleted messages cannot be edited"));
        }
        if current.author.id != member.id {
            return Err(BackendError::forbidden("Only the author can edit a message"));
        }
        if current.has_attachment() {
            return Err(BackendError::forbidden("Attachments cannot be edited"));
        }

        let at = bumped_after(current.updated_at);
        let message = self
            .retry
            .run("update", || self.store.update_content(id, &request.content, at))
            .await
            .map_err(|err| match err {
                // Deleted between the check and the write
                StoreError::Conflict(_) => BackendError::forbidden("Deleted messages cannot be edited"),
                other => other.into(),
            })?;
        tracing::info!("[Gateway] Updated message {} on {}", message.id, message.surface);

        self.publish(EventKind::Updated, &message);
        Ok(message)
    }

    /// Soft-delete a message; author or elevated role
    ///
    /// Deleting an already-deleted message succeeds with the stored payload
    /// and publishes nothing.
    pub async fn delete(
        &self,
        identity: Option<Identity>,
        id: MessageId,
        surface: SurfaceId,
    ) -> Result<Message, BackendError> {
        let identity = identity.ok_or(BackendError::Unauthorized)?;
        let member = self.member_of(identity, &surface).await?;
        let current = self.load_in_surface(id, &surface).await?;

        let is_author = current.author.id == member.id;
        if !is_author && !member.role.is_elevated() {
            return Err(BackendError::forbidden(
                "Only the author, a moderator or an admin can delete a message",
            ));
        }
        if current.deleted {
            tracing::debug!("[Gateway] Message {} already deleted", id);
            return Ok(current);
        }

        let at = bumped_after(current.updated_at);
        // Set when an attempt fails transiently; its write may still have landed
        let unacknowledged = AtomicBool::new(false);
        let outcome = {
            let unacknowledged = &unacknowledged;
            self.retry
                .run("delete", move || async move {
                    let result = self.store.soft_delete(id, at).await;
                    if matches!(result, Err(StoreError::Transient(_))) {
                        unacknowledged.store(true, Ordering::SeqCst);
                    }
                    result
                })
                .await?
        };

        match outcome {
            DeleteOutcome::Deleted(message) => {
                tracing::info!(
                    "[Gateway] Deleted message {} on {} (by {:?})",
                    message.id,
                    message.surface,
                    member.role
                );
                self.publish(EventKind::Deleted, &message);
                Ok(message)
            }
            // A retry found the redaction written by this call's own lost attempt
            DeleteOutcome::AlreadyDeleted(message)
                if unacknowledged.load(Ordering::SeqCst) && message.updated_at == at =>
            {
                tracing::info!(
                    "[Gateway] Deleted message {} on {} (acknowledged on retry)",
                    message.id,
                    message.surface
                );
                self.publish(EventKind::Deleted, &message);
                Ok(message)
            }
            DeleteOutcome::AlreadyDeleted(message) => {
                tracing::debug!("[Gateway] Message {} deleted concurrently", id);
                Ok(message)
            }
        }
    }

    async fn member_of(&self, identity: Identity, surface: &SurfaceId) -> Result<Member, BackendError> {
        let member = self
            .retry
            .run("membership", || self.store.membership(surface, identity.profile_id))
            .await?;
        member.ok_or_else(|| BackendError::forbidden(format!("Not a member of {}", surface)))
    }

    async fn load_in_surface(&self, id: MessageId, surface: &SurfaceId) -> Result<Message, BackendError> {
        let message = self.retry.run("get", || self.store.get(id)).await?;
        if message.surface != *surface {
            return Err(BackendError::not_found("Message not found"));
        }
        Ok(message)
    }

    fn publish(&self, kind: EventKind, message: &Message) {
        self.bus
            .publish(&Topic::for_surface(&message.surface), kind, message.clone());
    }
}
