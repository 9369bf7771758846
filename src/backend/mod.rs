//! Backend Module
//!
//! Server side of the realtime message synchronization core. Only compiled
//! with the `ssr` feature.
//!
//! # Architecture
//!
//! - **`realtime`** - Connection Registry, Event Bus, websocket endpoint
//! - **`messaging`** - Mutation Gateway, history reads, HTTP handlers
//! - **`store`** - persistence boundary (in-memory and sqlite)
//! - **`middleware`** - authentication boundary
//! - **`error`** - backend error types and HTTP conversion
//! - **`routes`** - router assembly
//! - **`server`** - state, store selection, initialization
//!
//! # Data Flow
//!
//! A mutation request reaches the gateway, which validates the caller,
//! writes through the store and then publishes on the surface's topic. The
//! bus hands the event to every connection the registry lists for that
//! topic, and each websocket writer forwards it to its client.
//!
//! # Module Structure
//!
//! ```text
//! backend/
//! ├── mod.rs      - Module exports and documentation
//! ├── main.rs     - Server binary
//! ├── server/     - State and initialization
//! ├── routes/     - Route configuration
//! ├── realtime/   - Registry, bus, websocket transport
//! ├── messaging/  - Gateway, history, handlers
//! ├── store/      - Persistence boundary
//! ├── middleware/ - Authentication
//! └── error/      - Error types
//! ```

/// Server setup and configuration
#[cfg(feature = "ssr")]
pub mod server;

/// Route configuration
#[cfg(feature = "ssr")]
pub mod routes;

/// Real-time update system
#[cfg(feature = "ssr")]
pub mod realtime;

/// Message mutations and history
#[cfg(feature = "ssr")]
pub mod messaging;

/// Persistence boundary
#[cfg(feature = "ssr")]
pub mod store;

/// Backend error types
#[cfg(feature = "ssr")]
pub mod error;

/// Middleware for request processing
#[cfg(feature = "ssr")]
pub mod middleware;

/// Re-export commonly used types
#[cfg(feature = "ssr")]
pub use error::BackendError;
#[cfg(feature = "ssr")]
pub use messaging::{MutationGateway, RetryPolicy};
#[cfg(feature = "ssr")]
pub use realtime::{ConnectionRegistry, EventBus};
#[cfg(feature = "ssr")]
pub use server::{create_app, AppState};
#[cfg(feature = "ssr")]
pub use store::{InMemoryStore, MessageStore, SqliteStore, StoreError};
