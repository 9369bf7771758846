//! Shared Error Types
//!
//! Errors raised by the textual forms shared between the server and the
//! client sync layer: surface ids, topics, roles and page cursors.
//!
//! # Usage
//!
//! ```rust
//! use chatsync::shared::error::SharedError;
//! use chatsync::shared::SurfaceId;
//!
//! let error = "lobby".parse::<SurfaceId>().unwrap_err();
//! assert_eq!(error, SharedError::parse("surface", "lobby"));
//! ```
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SharedError {
    /// A textual identifier could not be parsed
    #[error("Invalid {kind}: '{value}'")]
    ParseError {
        /// What was being parsed (surface, topic, cursor, role)
        kind: &'static str,
        /// The offending input
        value: String,
    },
}

impl SharedError {
    pub fn parse(kind: &'static str, value: impl Into<String>) -> Self {
        Self::ParseError {
            kind,
            value: value.into(),
        }
    }
}
