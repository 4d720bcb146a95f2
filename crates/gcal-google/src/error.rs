//! Error types for Google Calendar operations.
//!
//! Every failure surfaced by this crate is a [`ProviderError`] carrying a
//! [`ProviderErrorCode`], a message suitable for printing to the user, and an
//! optional underlying cause.

use std::fmt;
use thiserror::Error;

/// The category of a provider error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// No usable credentials: token missing, corrupt, revoked, or lacking
    /// required scopes. Fixed by re-running `init`.
    AuthenticationFailed,
    /// Missing or invalid configuration, such as the OAuth client secret.
    ConfigurationError,
    /// User input that cannot be sent to the API.
    Validation,
    /// The API answered 429.
    RateLimited,
    /// The requested event or calendar does not exist (404 or 410).
    NotFound,
    /// Any other non-2xx answer from the API.
    RemoteError,
    /// Network error - connection failed, timeout, DNS resolution, etc.
    NetworkError,
    /// Invalid response from the server - parse error, unexpected format.
    InvalidResponse,
    /// Internal error - unexpected state, bug.
    InternalError,
}

impl ProviderErrorCode {
    /// Returns a machine-readable name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::ConfigurationError => "configuration_error",
            Self::Validation => "validation",
            Self::RateLimited => "rate_limited",
            Self::NotFound => "not_found",
            Self::RemoteError => "remote_error",
            Self::NetworkError => "network_error",
            Self::InvalidResponse => "invalid_response",
            Self::InternalError => "internal_error",
        }
    }

    /// Returns the label printed in front of error messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication error",
            Self::ConfigurationError => "configuration error",
            Self::Validation => "invalid input",
            Self::RateLimited => "rate limited",
            Self::NotFound => "not found",
            Self::RemoteError => "API error",
            Self::NetworkError => "network error",
            Self::InvalidResponse => "invalid response",
            Self::InternalError => "internal error",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error that occurred while talking to Google.
#[derive(Debug, Error)]
pub struct ProviderError {
    /// The error code categorizing this error.
    code: ProviderErrorCode,
    /// A human-readable message describing the error.
    message: String,
    /// HTTP status returned by the API, when there was one.
    status: Option<u16>,
    /// The underlying cause of this error, if any.
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    /// Creates a new provider error with the given code and message.
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status: None,
            source: None,
        }
    }

    /// Creates an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthenticationFailed, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Validation, message)
    }

    /// Creates a rate limit error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::RateLimited, message)
    }

    /// Creates a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NotFound, message)
    }

    /// Creates an error for a non-2xx API answer.
    pub fn remote(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::RemoteError, message)
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InternalError, message)
    }

    /// Records the HTTP status that produced this error.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the HTTP status, if the error came from an API answer.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Returns true for errors fixed by re-running `init`.
    pub fn is_auth(&self) -> bool {
        self.code == ProviderErrorCode::AuthenticationFailed
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.label(), self.message)
    }
}

impl From<gcal_core::TimeError> for ProviderError {
    fn from(err: gcal_core::TimeError) -> Self {
        Self::validation(err.to_string())
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "request timed out".to_string()
        } else if err.is_connect() {
            format!("connection failed: {}", err)
        } else {
            format!("request failed: {}", err)
        };
        Self::network(message).with_source(err)
    }
}

/// A specialized Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;
