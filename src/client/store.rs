/**
 * Client Sync Store
 *
 * One store per mounted chat surface. It merges paged history and live
 * events into a single ordered, deduplicated view.
 *
 * # Lifecycle
 *
 * ```text
 * Idle -> Loading(Initial) -> Ready <-> Loading(More)
 *                               |  <-> Loading(Resync)
 *                               v
 *                           Unmounted
 * ```
 *
 * - `mount` joins the topic and fetches the newest page concurrently.
 *   Events that arrive before the page are buffered and replayed right
 *   after it is merged.
 * - `load_more` fetches the next older page. At most one is in flight.
 * - `apply_event` is accepted in every state but `Unmounted`.
 * - `resync` is the reconnect path: rejoin, refetch the newest history and
 *   close the gap to what is cached.
 * - `unmount` cancels in-flight work, leaves the topic and drops all state.
 *
 * The inner mutex is never held across an await. Every suspension point
 * races the store's cancellation token, and results that arrive after
 * unmount are discarded.
 */

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

use super::cache::{ApplyOutcome, MessageCache};
use super::error::ClientError;
use crate::shared::{Message, Page, PageCursor, PageRequest, RealtimeEvent, SurfaceId, Topic};

/// Page size used when none is configured
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Upper bound on pages fetched by one `resync`
pub const MAX_GAP_PAGES: usize = 5;

/// Source of history pages
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, request: PageRequest) -> Result<Page, ClientError>;
}

/// Topic subscription control on the realtime transport
#[async_trait]
pub trait TopicLink: Send + Sync {
    async fn join(&self, topic: &Topic) -> Result<(), ClientError>;
    async fn leave(&self, topic: &Topic) -> Result<(), ClientError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    /// First page after mount
    Initial,
    /// Older history
    More,
    /// Newest history after a reconnect
    Resync,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Loading(LoadPhase),
    Ready,
    Unmounted,
}

/// Result of a load operation that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Pages merged; `added` messages were new to the cache
    Loaded { added: usize },
    /// Another load is running or the store is not ready
    Suppressed,
    /// No older history exists
    Exhausted,
    /// The store was unmounted while loading
    Cancelled,
}

/// Snapshot of a store's lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStatus {
    pub state: SyncState,
    pub has_more: bool,
    pub last_error: Option<ClientError>,
}

#[derive(Debug)]
struct Inner {
    state: SyncState,
    cache: MessageCache,
    buffered: Vec<RealtimeEvent>,
    next_cursor: Option<PageCursor>,
    /// At least one history page has been merged
    history_loaded: bool,
    last_error: Option<ClientError>,
}

pub struct ChatSyncStore {
    surface: SurfaceId,
    topic: Topic,
    page_size: u32,
    fetcher: Arc<dyn PageFetcher>,
    link: Arc<dyn TopicLink>,
    cancel: CancellationToken,
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for ChatSyncStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSyncStore")
            .field("surface", &self.surface)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl ChatSyncStore {
    pub fn new(surface: SurfaceId, fetcher: Arc<dyn PageFetcher>, link: Arc<dyn TopicLink>) -> Self {
        Self {
            topic: Topic::for_surface(&surface),
            surface,
            page_size: DEFAULT_PAGE_SIZE,
            fetcher,
            link,
            cancel: CancellationToken::new(),
            inner: Mutex::new(Inner {
                state: SyncState::Idle,
                cache: MessageCache::new(),
                buffered: Vec::new(),
                next_cursor: None,
                history_loaded: false,
                last_error: None,
            }),
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn request(&self, cursor: Option<PageCursor>) -> PageRequest {
        PageRequest {
            surface: self.surface,
            cursor,
            limit: Some(self.page_size),
        }
    }

    /// Join the topic and load the newest page
    pub async fn mount(&self) -> Result<LoadOutcome, ClientError> {
        {
            let mut inner = self.lock();
            match inner.state {
                SyncState::Idle => inner.state = SyncState::Loading(LoadPhase::Initial),
                SyncState::Unmounted => return Err(ClientError::Unmounted),
                _ => return Ok(LoadOutcome::Suppressed),
            }
        }
        tracing::debug!("[SyncStore] Mounting {}", self.topic);

        let request = self.request(None);
        let (joined, fetched) = tokio::select! {
            _ = self.cancel.cancelled() => return Ok(LoadOutcome::Cancelled),
            results = async { tokio::join!(self.link.join(&self.topic), self.fetcher.fetch(request)) } => results,
        };

        let mut inner = self.lock();
        if inner.state == SyncState::Unmounted {
            return Ok(LoadOutcome::Cancelled);
        }

        if let Err(e) = &joined {
            tracing::warn!("[SyncStore] Join {} failed: {}", self.topic, e);
        }

        let result = match fetched {
            Ok(page) => {
                inner.next_cursor = page.next_cursor;
                inner.history_loaded = true;
                let added = inner.cache.merge_page(page.items);
                inner.last_error = joined.err();
                Ok(LoadOutcome::Loaded { added })
            }
            Err(e) => {
                tracing::warn!("[SyncStore] Initial fetch for {} failed: {}", self.topic, e);
                inner.next_cursor = None;
                inner.last_error = Some(e.clone());
                Err(e)
            }
        };

        let buffered = std::mem::take(&mut inner.buffered);
        let replayed = buffered.len();
        for event in &buffered {
            inner.cache.apply(event);
        }
        inner.state = SyncState::Ready;
        tracing::info!(
            "[SyncStore] {} ready with {} messages ({} buffered events replayed)",
            self.topic,
            inner.cache.len(),
            replayed
        );
        result
    }

    /// Fetch the next older page
    pub async fn load_more(&self) -> Result<LoadOutcome, ClientError> {
        let cursor = {
            let mut inner = self.lock();
            match inner.state {
                SyncState::Ready => {}
                SyncState::Unmounted => return Err(ClientError::Unmounted),
                _ => return Ok(LoadOutcome::Suppressed),
            }
            let Some(cursor) = inner.next_cursor else {
                return Ok(LoadOutcome::Exhausted);
            };
            inner.state = SyncState::Loading(LoadPhase::More);
            cursor
        };

        let request = self.request(Some(cursor));
        let fetched = tokio::select! {
            _ = self.cancel.cancelled() => return Ok(LoadOutcome::Cancelled),
            fetched = self.fetcher.fetch(request) => fetched,
        };

        let mut inner = self.lock();
        if inner.state == SyncState::Unmounted {
            return Ok(LoadOutcome::Cancelled);
        }
        inner.state = SyncState::Ready;
        match fetched {
            Ok(page) => {
                inner.next_cursor = page.next_cursor;
                inner.last_error = None;
                let added = inner.cache.merge_page(page.items);
                tracing::debug!("[SyncStore] Loaded {} older messages on {}", added, self.topic);
                Ok(LoadOutcome::Loaded { added })
            }
            Err(e) => {
                tracing::warn!("[SyncStore] Loading older history on {} failed: {}", self.topic, e);
                inner.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Rejoin the topic and merge history published while disconnected
    ///
    /// Fetches newest-first until a page overlaps the cached history or
    /// `MAX_GAP_PAGES` pages were read. When the gap is not closed, either
    /// by the page bound or by a failed fetch after some pages merged, the
    /// older-history cursor moves to the end of the fetched range so
    /// `load_more` walks through the rest.
    pub async fn resync(&self) -> Result<LoadOutcome, ClientError> {
        let newest_cached = {
            let mut inner = self.lock();
            match inner.state {
                SyncState::Ready => {
                    inner.state = SyncState::Loading(LoadPhase::Resync);
                    // live events alone do not anchor history
                    Some(if inner.history_loaded { inner.cache.newest() } else { None })
                }
                SyncState::Idle => None,
                SyncState::Unmounted => return Err(ClientError::Unmounted),
                SyncState::Loading(_) => return Ok(LoadOutcome::Suppressed),
            }
        };
        let Some(newest_cached) = newest_cached else {
            return self.mount().await;
        };
        tracing::info!("[SyncStore] Resynchronizing {}", self.topic);

        let joined = tokio::select! {
            _ = self.cancel.cancelled() => return Ok(LoadOutcome::Cancelled),
            joined = self.link.join(&self.topic) => joined,
        };
        if let Err(e) = &joined {
            tracing::warn!("[SyncStore] Rejoin {} failed: {}", self.topic, e);
        }

        let mut pages: Vec<Page> = Vec::new();
        let mut cursor = None;
        let mut failure = None;
        let mut closed = false;
        while pages.len() < MAX_GAP_PAGES {
            let fetched = tokio::select! {
                _ = self.cancel.cancelled() => return Ok(LoadOutcome::Cancelled),
                fetched = self.fetcher.fetch(self.request(cursor)) => fetched,
            };
            let page = match fetched {
                Ok(page) => page,
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            };
            let overlaps = match (newest_cached, page.items.last()) {
                (Some(newest), Some(oldest_fetched)) => {
                    oldest_fetched.order_key() <= (newest.created_at, newest.id)
                }
                _ => true,
            };
            cursor = page.next_cursor;
            pages.push(page);
            if overlaps || cursor.is_none() {
                closed = true;
                break;
            }
        }

        let mut inner = self.lock();
        if inner.state == SyncState::Unmounted {
            return Ok(LoadOutcome::Cancelled);
        }
        inner.state = SyncState::Ready;

        let mut added = 0;
        let merged_any = !pages.is_empty();
        if merged_any {
            inner.history_loaded = true;
        }
        for page in pages {
            added += inner.cache.merge_page(page.items);
        }
        // An open gap, whether cut off by the page bound or by a failed
        // fetch, is walked from where the gap fetch stopped
        if newest_cached.is_none() || (!closed && merged_any) {
            inner.next_cursor = cursor;
        }

        match failure {
            Some(e) => {
                tracing::warn!("[SyncStore] Resync of {} failed: {}", self.topic, e);
                inner.last_error = Some(e.clone());
                Err(e)
            }
            None => {
                inner.last_error = joined.err();
                if !closed {
                    tracing::warn!(
                        "[SyncStore] Gap on {} not closed after {} pages",
                        self.topic,
                        MAX_GAP_PAGES
                    );
                }
                tracing::info!("[SyncStore] Resync of {} merged {} new messages", self.topic, added);
                Ok(LoadOutcome::Loaded { added })
            }
        }
    }

    /// Apply a live event
    ///
    /// Buffered while the initial page is loading, merged otherwise.
    pub fn apply_event(&self, event: RealtimeEvent) -> Result<ApplyOutcome, ClientError> {
        if event.topic != self.topic {
            tracing::debug!("[SyncStore] Ignoring event for {} on {}", event.topic, self.topic);
            return Ok(ApplyOutcome::Ignored);
        }
        let mut inner = self.lock();
        match inner.state {
            SyncState::Unmounted => Err(ClientError::Unmounted),
            SyncState::Loading(LoadPhase::Initial) => {
                inner.buffered.push(event);
                Ok(ApplyOutcome::Buffered)
            }
            _ => Ok(inner.cache.apply(&event)),
        }
    }

    /// Cancel in-flight work, leave the topic and drop all cached state
    pub async fn unmount(&self) {
        {
            let mut inner = self.lock();
            if inner.state == SyncState::Unmounted {
                return;
            }
            inner.state = SyncState::Unmounted;
            inner.cache.clear();
            inner.buffered.clear();
            inner.next_cursor = None;
            inner.history_loaded = false;
            inner.last_error = None;
        }
        self.cancel.cancel();

        if let Err(e) = self.link.leave(&self.topic).await {
            tracing::warn!("[SyncStore] Leave {} failed: {}", self.topic, e);
        }
        tracing::debug!("[SyncStore] Unmounted {}", self.topic);
    }

    /// Ordered messages, oldest first
    pub fn view(&self) -> Vec<Message> {
        self.lock().cache.view()
    }

    pub fn status(&self) -> SyncStatus {
        let inner = self.lock();
        SyncStatus {
            state: inner.state,
            has_more: inner.next_cursor.is_some(),
            last_error: inner.last_error.clone(),
        }
    }

    pub fn pending_patches(&self) -> usize {
        self.lock().cache.pending_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::message::now_micros;
    use crate::shared::{EventKind, Member, MemberRole};
    use assert_matches::assert_matches;
    use chrono::Duration;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;
    use uuid::Uuid;

    #[derive(Default)]
    struct ScriptedFetcher {
        responses: Mutex<VecDeque<Result<Page, ClientError>>>,
        requests: Mutex<Vec<PageRequest>>,
        calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
    }

    impl ScriptedFetcher {
        fn push(&self, response: Result<Page, ClientError>) {
            self.responses.lock().unwrap().push_back(response);
        }

        fn cursors(&self) -> Vec<Option<PageCursor>> {
            self.requests.lock().unwrap().iter().map(|r| r.cursor).collect()
        }
    }

    #[async_trait]
    impl PageFetcher for ScriptedFetcher {
        async fn fetch(&self, request: PageRequest) -> Result<Page, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.responses.lock().unwrap().pop_front().unwrap_or_else(|| Ok(Page::default()))
        }
    }

    #[derive(Default)]
    struct CountingLink {
        joins: AtomicUsize,
        leaves: AtomicUsize,
    }

    #[async_trait]
    impl TopicLink for CountingLink {
        async fn join(&self, _topic: &Topic) -> Result<(), ClientError> {
            self.joins.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn leave(&self, _topic: &Topic) -> Result<(), ClientError> {
            self.leaves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn surface() -> SurfaceId {
        SurfaceId::Channel(Uuid::from_u128(42))
    }

    fn message(content: &str, offset_ms: i64) -> Message {
        let at = now_micros() + Duration::milliseconds(offset_ms);
        Message {
            id: Uuid::new_v4(),
            surface: surface(),
            author: Member {
                id: Uuid::new_v4(),
                profile_id: Uuid::new_v4(),
                name: "jo".to_string(),
                image_url: None,
                role: MemberRole::Guest,
            },
            content: content.to_string(),
            file_url: None,
            created_at: at,
            updated_at: at,
            deleted: false,
        }
    }

    fn newest_first(mut items: Vec<Message>) -> Vec<Message> {
        items.sort_by_key(|m| std::cmp::Reverse(m.order_key()));
        items
    }

    fn created(payload: Message) -> RealtimeEvent {
        RealtimeEvent::new(Topic::for_surface(&surface()), EventKind::Created, payload, 1)
    }

    fn store(fetcher: Arc<ScriptedFetcher>, link: Arc<CountingLink>) -> ChatSyncStore {
        ChatSyncStore::new(surface(), fetcher, link).with_page_size(2)
    }

    #[tokio::test]
    async fn test_mount_loads_newest_page() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let link = Arc::new(CountingLink::default());
        let a = message("a", 0);
        let b = message("b", 10);
        fetcher.push(Ok(Page::from_items(newest_first(vec![a, b]), 2)));

        let store = store(fetcher.clone(), link.clone());
        assert_eq!(store.status().state, SyncState::Idle);
        assert_eq!(store.mount().await, Ok(LoadOutcome::Loaded { added: 2 }));

        let status = store.status();
        assert_eq!(status.state, SyncState::Ready);
        assert!(status.has_more);
        assert_eq!(link.joins.load(Ordering::SeqCst), 1);
        let view: Vec<_> = store.view().into_iter().map(|m| m.content).collect();
        assert_eq!(view, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_mount_twice_is_suppressed() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let store = store(fetcher.clone(), Arc::new(CountingLink::default()));
        store.mount().await.unwrap();
        assert_eq!(store.mount().await, Ok(LoadOutcome::Suppressed));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_initial_failure_keeps_store_usable() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        fetcher.push(Err(ClientError::Fetch("connection refused".into())));
        let store = store(fetcher.clone(), Arc::new(CountingLink::default()));

        assert_matches!(store.mount().await, Err(ClientError::Fetch(_)));
        let status = store.status();
        assert_eq!(status.state, SyncState::Ready);
        assert!(!status.has_more);
        assert_matches!(status.last_error, Some(ClientError::Fetch(_)));

        store.apply_event(created(message("live", 0))).unwrap();
        assert_eq!(store.view().len(), 1);

        let a = message("a", -10);
        fetcher.push(Ok(Page::from_items(vec![a], 2)));
        assert_eq!(store.resync().await, Ok(LoadOutcome::Loaded { added: 1 }));
        assert_eq!(store.status().last_error, None);
        assert_eq!(store.view().len(), 2);
    }

    #[tokio::test]
    async fn test_load_more_exhausted_without_cursor() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        fetcher.push(Ok(Page::from_items(vec![message("only", 0)], 2)));
        let store = store(fetcher.clone(), Arc::new(CountingLink::default()));
        store.mount().await.unwrap();

        assert_eq!(store.load_more().await, Ok(LoadOutcome::Exhausted));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_load_more_failure_keeps_cache() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        fetcher.push(Ok(Page::from_items(
            newest_first(vec![message("a", 0), message("b", 10)]),
            2,
        )));
        fetcher.push(Err(ClientError::Http {
            status: 503,
            message: "busy".into(),
        }));
        let store = store(fetcher.clone(), Arc::new(CountingLink::default()));
        store.mount().await.unwrap();

        assert_matches!(store.load_more().await, Err(ClientError::Http { status: 503, .. }));
        let status = store.status();
        assert_eq!(status.state, SyncState::Ready);
        assert!(status.has_more);
        assert_eq!(store.view().len(), 2);
    }

    #[tokio::test]
    async fn test_unmount_discards_state_and_rejects_events() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        fetcher.push(Ok(Page::from_items(vec![message("a", 0)], 2)));
        let link = Arc::new(CountingLink::default());
        let store = store(fetcher, link.clone());
        store.mount().await.unwrap();

        store.unmount().await;
        store.unmount().await;

        assert_eq!(link.leaves.load(Ordering::SeqCst), 1);
        assert!(store.view().is_empty());
        assert_eq!(store.status().state, SyncState::Unmounted);
        assert_eq!(store.apply_event(created(message("late", 5))), Err(ClientError::Unmounted));
        assert_eq!(store.load_more().await, Err(ClientError::Unmounted));
    }

    #[tokio::test]
    async fn test_unmount_during_initial_fetch_drops_result() {
        let gate = Arc::new(Notify::new());
        let fetcher = Arc::new(ScriptedFetcher {
            gate: Some(gate.clone()),
            ..Default::default()
        });
        fetcher.push(Ok(Page::from_items(vec![message("a", 0)], 2)));
        let link = Arc::new(CountingLink::default());
        let store = Arc::new(store(fetcher.clone(), link.clone()));

        let mounting = tokio::spawn({
            let store = store.clone();
            async move { store.mount().await }
        });
        while fetcher.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        store.unmount().await;
        gate.notify_one();

        assert_eq!(mounting.await.unwrap(), Ok(LoadOutcome::Cancelled));
        assert!(store.view().is_empty());
        assert_eq!(link.leaves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_foreign_topic_event_is_ignored() {
        let store = store(
            Arc::new(ScriptedFetcher::default()),
            Arc::new(CountingLink::default()),
        );
        let mut other = message("elsewhere", 0);
        other.surface = SurfaceId::Conversation(Uuid::new_v4());
        let event = RealtimeEvent::new(Topic::for_surface(&other.surface), EventKind::Created, other, 1);
        assert_eq!(store.apply_event(event), Ok(ApplyOutcome::Ignored));
        assert!(store.view().is_empty());
    }

    #[tokio::test]
    async fn test_resync_walks_gap_and_moves_cursor_when_not_closed() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let old = message("old", -1_000);
        fetcher.push(Ok(Page::from_items(vec![old.clone()], 2)));
        let store = store(fetcher.clone(), Arc::new(CountingLink::default()));
        store.mount().await.unwrap();
        assert!(!store.status().has_more);

        let fresh: Vec<Message> = (0..(MAX_GAP_PAGES * 2 + 2))
            .map(|i| message(&format!("m{}", i), i as i64 * 10))
            .collect();
        let mut newest = newest_first(fresh);
        for _ in 0..MAX_GAP_PAGES {
            let rest = newest.split_off(2);
            fetcher.push(Ok(Page::from_items(newest, 2)));
            newest = rest;
        }

        assert_eq!(
            store.resync().await,
            Ok(LoadOutcome::Loaded { added: MAX_GAP_PAGES * 2 })
        );
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1 + MAX_GAP_PAGES);
        assert!(store.status().has_more);
    }

    #[tokio::test]
    async fn test_failed_gap_fetch_leaves_missed_history_reachable() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let old = message("old", -1_000);
        fetcher.push(Ok(Page::from_items(vec![old.clone()], 2)));
        let store = store(fetcher.clone(), Arc::new(CountingLink::default()));
        store.mount().await.unwrap();

        let missed = newest_first((0..6).map(|i| message(&format!("m{}", i), i * 10)).collect());
        fetcher.push(Ok(Page::from_items(missed[0..2].to_vec(), 2)));
        fetcher.push(Err(ClientError::Fetch("blip".into())));
        assert_eq!(store.resync().await, Err(ClientError::Fetch("blip".into())));
        let status = store.status();
        assert_eq!(status.state, SyncState::Ready);
        assert!(status.has_more);

        // the retry overlaps the merged page at once
        fetcher.push(Ok(Page::from_items(missed[0..2].to_vec(), 2)));
        assert_eq!(store.resync().await, Ok(LoadOutcome::Loaded { added: 0 }));
        assert!(store.status().has_more);

        fetcher.push(Ok(Page::from_items(missed[2..4].to_vec(), 2)));
        fetcher.push(Ok(Page::from_items(missed[4..6].to_vec(), 2)));
        fetcher.push(Ok(Page::from_items(vec![old.clone()], 2)));
        assert_eq!(store.load_more().await, Ok(LoadOutcome::Loaded { added: 2 }));
        assert_eq!(store.load_more().await, Ok(LoadOutcome::Loaded { added: 2 }));
        assert_eq!(store.load_more().await, Ok(LoadOutcome::Loaded { added: 0 }));
        assert_eq!(store.load_more().await, Ok(LoadOutcome::Exhausted));

        let cursors = fetcher.cursors();
        assert_eq!(
            cursors[cursors.len() - 3..].to_vec(),
            vec![
                Some(PageCursor::at(&missed[1])),
                Some(PageCursor::at(&missed[3])),
                Some(PageCursor::at(&missed[5])),
            ]
        );
        let view: Vec<_> = store.view().into_iter().map(|m| m.content).collect();
        assert_eq!(view, vec!["old", "m0", "m1", "m2", "m3", "m4", "m5"]);
    }
}
