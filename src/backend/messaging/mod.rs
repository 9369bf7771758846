//! Messaging Module
//!
//! Message mutations and history reads.
//!
//! - **`gateway`** - create / edit / delete, persist then publish
//! - **`history`** - cursor-paged history reads
//! - **`retry`** - backoff for transient persistence failures
//! - **`handlers`** - axum handlers for `/api/messages`

pub mod gateway;
pub mod handlers;
pub mod history;
pub mod retry;

pub use gateway::{CreateMessage, MutationGateway, UpdateMessage};
pub use history::HistoryService;
pub use retry::RetryPolicy;
