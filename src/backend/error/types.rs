/**
 * Backend Error Types
 *
 * Errors surfaced by the mutation gateway and the history API. Each variant
 * maps to one HTTP status; see `conversion.rs` for the response body.
 *
 * # Error Categories
 *
 * - `Unauthorized` - no verified identity
 * - `Forbidden` - identity lacks membership, ownership or role
 * - `NotFound` - target id absent in the surface
 * - `InvalidInput` - validation failure
 * - `Transient` - persistence hiccup that outlived the retry budget
 * - `Store` - non-retryable persistence failure
 *
 * A double delete is not an error: it resolves to success.
 */

use axum::http::StatusCode;
use thiserror::Error;

use crate::backend::store::StoreError;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("authentication required")]
    Unauthorized,

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Retryable by the caller
    #[error("Temporarily unavailable: {message}")]
    Transient { message: String },

    #[error("Store error: {message}")]
    Store { message: String },
}

impl BackendError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    ///
    /// - `Unauthorized` - 401
    /// - `Forbidden` - 403
    /// - `NotFound` - 404
    /// - `InvalidInput` - 400
    /// - `Transient` - 503
    /// - `Store` - 500
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            Self::Transient { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error message
    pub fn message(&self) -> String {
        match self {
            Self::Unauthorized => "Unauthorized".to_string(),
            Self::Forbidden { message }
            | Self::NotFound { message }
            | Self::InvalidInput { message }
            | Self::Transient { message }
            | Self::Store { message } => message.clone(),
        }
    }
}

impl From<StoreError> for BackendError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::not_found("Message not found"),
            StoreError::Conflict(message) => Self::forbidden(message),
            StoreError::Transient(message) => Self::transient(message),
            StoreError::Backend(message) => Self::Store { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(BackendError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(BackendError::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(BackendError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(BackendError::invalid_input("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(BackendError::transient("x").status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_from_store_error() {
        let err: BackendError = StoreError::NotFound.into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err: BackendError = StoreError::Transient("pool".into()).into();
        assert!(matches!(err, BackendError::Transient { .. }));

        let err: BackendError = StoreError::Backend("disk".into()).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "disk");
    }
}
