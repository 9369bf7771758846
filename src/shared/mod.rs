//! Shared Module
//!
//! This module contains types and data structures that are shared between
//! the server and the client sync layer. These types travel over the page-fetch
//! HTTP API and the realtime websocket, so all of them are serializable.
//!
//! # Overview
//!
//! The shared module provides platform-agnostic types that can be used
//! in both server and client code:
//!
//! - **`message`** - Messages, chat surfaces, members and roles
//! - **`event`** - Topics, realtime events and websocket frames
//! - **`page`** - Cursor-based history pages
//! - **`error`** - Validation and parse errors
//! - **`config`** - Application configuration

/// Message data structures
pub mod message;

/// Realtime event system
pub mod event;

/// Cursor pagination
pub mod page;

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use message::{Member, MemberRole, Message, MessageId, SurfaceId, DELETED_PLACEHOLDER};
pub use event::{ClientFrame, EventKind, RealtimeEvent, ServerFrame, Topic};
pub use page::{Page, PageCursor, PageRequest};
pub use error::SharedError;
pub use config::{AppConfig, AppConfigBuilder, ConfigError, RetrySettings};
