//! Message Cache
//!
//! Client-side copy of one surface's history. Entries are keyed by id and
//! kept sorted by `(created_at, id)`, so the view is always oldest to newest
//! with at most one entry per message.
//!
//! # Merging
//!
//! Pages and events go through the same merge. For two copies of one
//! message the deleted copy wins, otherwise the later `updated_at` wins, and
//! ties keep what is cached. The merge is therefore idempotent and
//! commutative: the arrival order of pages and events does not change the
//! final state.
//!
//! An `updated` or `deleted` event for a message that is not cached yet is
//! held as a pending patch and folded in when that message is paged in. At
//! most [`MAX_PENDING_PATCHES`] are held; past that the patch for the oldest
//! message is dropped, since it is the last one paging would reach.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

use crate::shared::{EventKind, Message, MessageId, PageCursor, RealtimeEvent, DELETED_PLACEHOLDER};

type OrderKey = (DateTime<Utc>, MessageId);

/// Upper bound on patches held for messages that are not cached
pub const MAX_PENDING_PATCHES: usize = 512;

/// What a merge did to the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// First copy of this message
    Inserted,
    /// A newer copy replaced the cached one
    Replaced,
    /// The cached copy was already as new
    Unchanged,
    /// Held as a pending patch until the message is paged in
    Pending,
    /// Queued until the initial page is merged
    Buffered,
    /// Event for another surface
    Ignored,
}

#[derive(Debug, Default)]
pub struct MessageCache {
    entries: BTreeMap<OrderKey, Message>,
    index: HashMap<MessageId, OrderKey>,
    pending: HashMap<MessageId, Message>,
}

impl MessageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one copy of a message, folding in any pending patch for it
    pub fn merge(&mut self, incoming: Message) -> ApplyOutcome {
        let incoming = match self.pending.remove(&incoming.id) {
            Some(patch) if patch.supersedes(&incoming) => patch,
            _ => incoming,
        };

        match self.index.get(&incoming.id).copied() {
            Some(key) => {
                match self.entries.get_mut(&key) {
                    Some(cached) if incoming.supersedes(cached) => {
                        *cached = incoming;
                        ApplyOutcome::Replaced
                    }
                    Some(_) => ApplyOutcome::Unchanged,
                    None => self.insert(incoming),
                }
            }
            None => self.insert(incoming),
        }
    }

    /// Merge a page of history; returns how many messages were new
    pub fn merge_page(&mut self, items: Vec<Message>) -> usize {
        let mut added = 0;
        for message in items {
            if self.merge(message) == ApplyOutcome::Inserted {
                added += 1;
            }
        }
        added
    }

    /// Apply a realtime event
    pub fn apply(&mut self, event: &RealtimeEvent) -> ApplyOutcome {
        let payload = event.payload.clone();
        match event.kind {
            EventKind::Created => self.merge(payload),
            EventKind::Updated | EventKind::Deleted => {
                if self.index.contains_key(&payload.id) {
                    self.merge(payload)
                } else {
                    self.hold(payload)
                }
            }
        }
    }

    fn insert(&mut self, message: Message) -> ApplyOutcome {
        let key = message.order_key();
        self.index.insert(message.id, key);
        self.entries.insert(key, message);
        ApplyOutcome::Inserted
    }

    fn hold(&mut self, patch: Message) -> ApplyOutcome {
        match self.pending.get(&patch.id) {
            Some(existing) if !patch.supersedes(existing) => {}
            _ => {
                self.pending.insert(patch.id, patch);
            }
        }
        if self.pending.len() > MAX_PENDING_PATCHES {
            self.evict_oldest_patch();
        }
        ApplyOutcome::Pending
    }

    fn evict_oldest_patch(&mut self) {
        let oldest = self
            .pending
            .values()
            .min_by_key(|patch| patch.order_key())
            .map(|patch| patch.id);
        if let Some(id) = oldest {
            self.pending.remove(&id);
            tracing::warn!("[Cache] Pending patch limit reached, dropped patch for {}", id);
        }
    }

    /// Ordered view, oldest first; deleted messages appear as placeholders
    pub fn view(&self) -> Vec<Message> {
        self.entries
            .values()
            .map(|message| {
                let mut message = message.clone();
                if message.deleted {
                    message.content = DELETED_PLACEHOLDER.to_string();
                    message.file_url = None;
                }
                message
            })
            .collect()
    }

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.index.get(id).and_then(|key| self.entries.get(key))
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.index.contains_key(id)
    }

    /// Cursor at the newest cached message
    pub fn newest(&self) -> Option<PageCursor> {
        self.entries.values().next_back().map(PageCursor::at)
    }

    /// Cursor at the oldest cached message
    pub fn oldest(&self) -> Option<PageCursor> {
        self.entries.values().next().map(PageCursor::at)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Drop every entry and pending patch
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
        self.pending.clear();
    }
}
