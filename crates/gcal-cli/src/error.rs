//! Client error types.

use gcal_google::ProviderError;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Bad or missing local configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// User input rejected before any request was sent.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Failure reported by the Google backend.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The user declined a confirmation prompt.
    #[error("aborted")]
    Aborted,
}

impl ClientError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<gcal_core::TimeError> for ClientError {
    fn from(err: gcal_core::TimeError) -> Self {
        Self::Validation(err.to_string())
    }
}
