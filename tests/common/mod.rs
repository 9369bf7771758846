//! Common test utilities and helpers
//!
//! - `TestApp`: server state over an in-memory store with one channel
//! - `TestUser`: a member of that channel with a signed token
//! - `HistoryFetcher` / `GatedFetcher`: in-process page fetchers for
//!   driving client stores against the server's history service

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use uuid::Uuid;

use chatsync::backend::messaging::gateway::CreateMessage;
use chatsync::backend::messaging::HistoryService;
use chatsync::backend::middleware::Identity;
use chatsync::backend::server::AppState;
use chatsync::backend::store::InMemoryStore;
use chatsync::client::{ClientError, PageFetcher};
use chatsync::shared::{AppConfig, Member, MemberRole, Message, Page, PageRequest, RetrySettings, SurfaceId};

pub const TEST_SECRET: &str = "chatsync-test-secret";

pub fn test_config(page_size: u32) -> AppConfig {
    AppConfig::builder()
        .jwt_secret(TEST_SECRET)
        .page_size(page_size)
        .max_page_size(50)
        .retry(RetrySettings {
            max_attempts: 3,
            base_delay_ms: 1,
            max_delay_ms: 5,
        })
        .build()
        .expect("valid test config")
}

pub struct TestUser {
    pub member: Member,
    pub identity: Identity,
    pub token: String,
}

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
    pub channel: SurfaceId,
}

impl TestApp {
    pub fn new(page_size: u32) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let state = AppState::new(test_config(page_size), store.clone());
        Self {
            state,
            store,
            channel: SurfaceId::Channel(Uuid::new_v4()),
        }
    }

    /// A user who is not a member of the channel
    pub fn outsider(&self, name: &str) -> TestUser {
        let profile_id = Uuid::new_v4();
        TestUser {
            member: Member {
                id: Uuid::new_v4(),
                profile_id,
                name: name.to_string(),
                image_url: None,
                role: MemberRole::Guest,
            },
            identity: Identity { profile_id },
            token: self.state.verifier.issue(profile_id).expect("token"),
        }
    }

    /// A member of the channel with `role`
    pub async fn member(&self, name: &str, role: MemberRole) -> TestUser {
        let mut user = self.outsider(name);
        user.member.role = role;
        self.store.add_member(self.channel, user.member.clone()).await;
        user
    }

    /// Post through the gateway; successive posts get distinct timestamps
    pub async fn post(&self, user: &TestUser, content: &str) -> Message {
        let message = self
            .state
            .gateway
            .create(
                Some(user.identity),
                CreateMessage {
                    surface: self.channel,
                    content: content.to_string(),
                    file_url: None,
                },
            )
            .await
            .expect("create message");
        tokio::time::sleep(Duration::from_millis(2)).await;
        message
    }

    pub fn fetcher(&self, user: &TestUser) -> Arc<GatedFetcher> {
        Arc::new(GatedFetcher::new(HistoryFetcher {
            history: self.state.history.clone(),
            identity: user.identity,
        }))
    }
}

/// Reads pages straight from the server's history service
pub struct HistoryFetcher {
    pub history: Arc<HistoryService>,
    pub identity: Identity,
}

#[async_trait]
impl PageFetcher for HistoryFetcher {
    async fn fetch(&self, request: PageRequest) -> Result<Page, ClientError> {
        self.history
            .fetch_page(Some(self.identity), request)
            .await
            .map_err(|e| ClientError::Http {
                status: e.status_code().as_u16(),
                message: e.message(),
            })
    }
}

/// Fetcher whose responses can be held back after the page was read
///
/// While held, a fetch reads its page immediately and then waits for
/// `release` before returning it, so the page reflects the server state at
/// request time.
pub struct GatedFetcher {
    inner: HistoryFetcher,
    held: AtomicBool,
    gate: Notify,
    calls: AtomicUsize,
}

impl GatedFetcher {
    pub fn new(inner: HistoryFetcher) -> Self {
        Self {
            inner,
            held: AtomicBool::new(false),
            gate: Notify::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn hold(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.held.store(false, Ordering::SeqCst);
        self.gate.notify_waiters();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Wait until `count` fetches have read their page
    pub async fn wait_for_calls(&self, count: usize) {
        while self.calls() < count {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl PageFetcher for GatedFetcher {
    async fn fetch(&self, request: PageRequest) -> Result<Page, ClientError> {
        let page = self.inner.fetch(request).await;
        if self.held.load(Ordering::SeqCst) {
            let released = self.gate.notified();
            self.calls.fetch_add(1, Ordering::SeqCst);
            released.await;
        } else {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
        page
    }
}

/// Contents of a store view, oldest first
pub fn contents(view: &[Message]) -> Vec<String> {
    view.iter().map(|m| m.content.clone()).collect()
}
