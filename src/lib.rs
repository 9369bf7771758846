//! chatsync - Main Library
//!
//! Realtime message synchronization core for a chat application: a
//! server-side mutation gateway and topic-based event fan-out, and a
//! client-side sync layer that keeps a local ordered message view
//! consistent with server history and live events.
//!
//! # Module Structure
//!
//! - **`shared`** - Types shared between server and client
//!   - Messages, surfaces, members, roles
//!   - Topics, realtime events, websocket frames
//!   - Cursor pages, configuration, error types
//!
//! - **`backend`** - Server-side code (only compiled with `ssr` feature)
//!   - Connection Registry and Event Bus
//!   - Mutation Gateway and paged history
//!   - Axum HTTP API and websocket endpoint
//!   - In-memory and sqlite message stores
//!
//! - **`client`** - Client sync layer
//!   - Per-surface message cache and `ChatSyncStore`
//!   - HTTP page fetcher and websocket realtime client
//!   - Topic-to-store event routing
//!
//! # Feature Flags
//!
//! - **`ssr`** (default) - enables the backend modules, the server binary
//!   and the in-process `LocalLink` client transport
//!
//! # Usage
//!
//! ```rust,no_run
//! use chatsync::backend::server::init::create_app;
//! use chatsync::shared::AppConfig;
//!
//! # async fn example() {
//! let app = create_app(AppConfig::default()).await;
//! // Serve `app` with axum::serve
//! # }
//! ```
//!
//! # Ordering and Delivery
//!
//! Every message sorts by `(created_at, id)`. Events carry a monotonically
//! increasing sequence number assigned at publish time; a connection
//! receives events for a topic in publish order. Delivery is at most once,
//! so clients resynchronize from history after a reconnect.

/// Shared types and data structures
pub mod shared;

/// Backend server-side code
#[cfg(feature = "ssr")]
pub mod backend;

/// Client sync layer
pub mod client;
