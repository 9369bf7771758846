/**
 * Sync Router
 *
 * Hands incoming realtime events to the store mounted for their topic and
 * drives the reconnect path for every attached store.
 */

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;

use super::cache::ApplyOutcome;
use super::error::ClientError;
use super::realtime::ClientNotice;
use super::store::{ChatSyncStore, LoadOutcome};
use crate::shared::{RealtimeEvent, Topic};

#[derive(Debug, Default)]
pub struct SyncRouter {
    stores: RwLock<HashMap<Topic, Arc<ChatSyncStore>>>,
}

impl SyncRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route events for the store's topic to it; returns a replaced store
    pub fn attach(&self, store: Arc<ChatSyncStore>) -> Option<Arc<ChatSyncStore>> {
        self.stores
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(store.topic().clone(), store)
    }

    pub fn detach(&self, topic: &Topic) -> Option<Arc<ChatSyncStore>> {
        self.stores
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(topic)
    }

    pub fn get(&self, topic: &Topic) -> Option<Arc<ChatSyncStore>> {
        self.stores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(topic)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.stores.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply `event` to its topic's store; `None` when no store is attached
    pub fn dispatch(&self, event: RealtimeEvent) -> Option<Result<ApplyOutcome, ClientError>> {
        let Some(store) = self.get(&event.topic) else {
            tracing::debug!("[SyncStore] No store for {}, dropping seq {}", event.topic, event.seq);
            return None;
        };
        Some(store.apply_event(event))
    }

    /// Resynchronize every attached store
    pub async fn resync_all(&self) -> Vec<(Topic, Result<LoadOutcome, ClientError>)> {
        let stores: Vec<Arc<ChatSyncStore>> = self
            .stores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        let mut results = Vec::with_capacity(stores.len());
        for store in stores {
            let result = store.resync().await;
            results.push((store.topic().clone(), result));
        }
        results
    }

    /// Dispatch notices until the connection drops
    ///
    /// Returns `true` on `Disconnected`, `false` when the notice channel
    /// closed.
    pub async fn run(&self, notices: &mut mpsc::UnboundedReceiver<ClientNotice>) -> bool {
        while let Some(notice) = notices.recv().await {
            match notice {
                ClientNotice::Event(event) => {
                    if let Some(Err(e)) = self.dispatch(event) {
                        tracing::debug!("[SyncStore] Event not applied: {}", e);
                    }
                }
                ClientNotice::Disconnected => {
                    tracing::warn!("[SyncStore] Realtime connection lost");
                    return true;
                }
            }
        }
        false
    }

    /// Dispatch events from an in-process bus connection until it closes
    #[cfg(feature = "ssr")]
    pub async fn pump(&self, events: &mut crate::backend::realtime::EventReceiver) {
        while let Some(event) = events.recv().await {
            let _ = self.dispatch((*event).clone());
        }
    }
}
