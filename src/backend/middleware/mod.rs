//! Middleware Module
//!
//! Request-level concerns shared by the HTTP and websocket routes.
//!
//! - **`auth`** - bearer token verification and the `MaybeIdentity` extractor

pub mod auth;

pub use auth::{Identity, MaybeIdentity, TokenVerifier};
