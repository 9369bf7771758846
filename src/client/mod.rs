//! Client Sync Layer
//!
//! Keeps a local, ordered, deduplicated copy of a chat surface's messages
//! consistent with server history and live events.
//!
//! # Module Structure
//!
//! ```text
//! client/
//! ├── mod.rs      - Module exports and documentation
//! ├── store.rs    - ChatSyncStore lifecycle, PageFetcher / TopicLink seams
//! ├── cache.rs    - Merge rules and ordered view
//! ├── router.rs   - Topic to store event routing
//! ├── fetcher.rs  - HTTP page fetcher (reqwest)
//! ├── realtime.rs - Websocket client (tokio-tungstenite)
//! ├── link.rs     - In-process link to a server EventBus (`ssr`)
//! └── error.rs    - ClientError
//! ```
//!
//! # Wiring
//!
//! A `ChatSyncStore` needs a `PageFetcher` for history and a `TopicLink`
//! for subscriptions. Against a remote server these are `HttpPageFetcher`
//! and `RealtimeClient`; the client's notices feed a `SyncRouter`, and on
//! `Disconnected` the owner calls `reconnect` then `resync_all`.

/// Error types
pub mod error;

/// Message cache
pub mod cache;

/// Per-surface sync store
pub mod store;

/// Event routing
pub mod router;

/// HTTP page fetcher
pub mod fetcher;

/// Websocket client
pub mod realtime;

/// In-process link
#[cfg(feature = "ssr")]
pub mod link;

pub use cache::{ApplyOutcome, MessageCache};
pub use error::ClientError;
pub use fetcher::HttpPageFetcher;
#[cfg(feature = "ssr")]
pub use link::LocalLink;
pub use realtime::{ClientNotice, RealtimeClient};
pub use router::SyncRouter;
pub use store::{ChatSyncStore, LoadOutcome, LoadPhase, PageFetcher, SyncState, SyncStatus, TopicLink};
