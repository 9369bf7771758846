/**
 * Client Error Types
 *
 * Errors surfaced by the client sync layer. They are stored in a sync
 * store's status as the last error, so every variant is cheap to clone.
 */

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The request never produced a response
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// The server answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// A response or frame could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Realtime connection failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server rejected a join or leave
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Operation on an unmounted store
    #[error("Store is unmounted")]
    Unmounted,
}

impl ClientError {
    /// Whether retrying the same operation later may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Fetch(_) | ClientError::Transport(_) => true,
            ClientError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Fetch(err.to_string())
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}
