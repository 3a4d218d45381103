//! Error types for the client engine.

use pixel_core::{CanvasError, GridError};
use pixel_renderer::RenderError;
use thiserror::Error;

use crate::auth::AuthError;

/// Errors raised by document stores and the sync client.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No shared document has been written yet.
    #[error("No saved canvas found")]
    DocumentNotFound,

    /// The store refused or could not serve the request.
    #[error("Document store unavailable: {0}")]
    Unavailable(String),

    /// HTTP layer failed (connection, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an unexpected status code.
    #[error("Unexpected status {status} from {url}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Request URL.
        url: String,
    },

    /// The live feed failed or closed.
    #[error("Live feed error: {0}")]
    Feed(String),

    /// The store URL is malformed.
    #[error("Invalid store URL: {0}")]
    InvalidUrl(String),

    /// A payload could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    /// Whether retrying the operation may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unavailable(_) | Self::Http(_) | Self::Feed(_) => true,
            Self::Status { status, .. } => *status >= 500,
            Self::DocumentNotFound | Self::InvalidUrl(_) | Self::Json(_) => false,
        }
    }
}

/// Errors returned by session controller actions.
#[derive(Debug, Error)]
pub enum SessionError {
    /// An action that needs a signed-in user ran while signed out.
    #[error("Please login first")]
    NotAuthenticated,

    /// The document store failed.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// A loaded grid did not fit the local canvas.
    #[error("Loaded canvas rejected: {0}")]
    Grid(#[from] GridError),

    /// The canvas configuration is unusable.
    #[error(transparent)]
    Canvas(#[from] CanvasError),

    /// Drawing the grid failed.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Sign-in, sign-up or sign-out failed.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_error_is_retryable() {
        assert!(SyncError::Unavailable("down".into()).is_retryable());
        assert!(SyncError::Feed("closed".into()).is_retryable());
        assert!(SyncError::Status {
            status: 503,
            url: "http://x".into()
        }
        .is_retryable());
        assert!(!SyncError::Status {
            status: 422,
            url: "http://x".into()
        }
        .is_retryable());
        assert!(!SyncError::DocumentNotFound.is_retryable());
        assert!(!SyncError::InvalidUrl("nope".into()).is_retryable());
    }

    #[test]
    fn test_not_authenticated_message() {
        assert_eq!(SessionError::NotAuthenticated.to_string(), "Please login first");
    }
}
