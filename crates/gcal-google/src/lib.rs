//! Google Calendar backend: OAuth, token storage and the REST client.
//!
//! - [`google::AuthSession`] - token lifecycle for one account
//! - [`google::CalendarClient`] - events and calendar list operations
//! - [`ProviderError`] - error taxonomy shared by all operations

pub mod error;
pub mod google;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use google::{
    AuthSession, CalendarClient, CredentialStore, EventQuery, FileTokenStore, GoogleConfig,
    MemoryTokenStore, OAuthCredentials, TokenInfo, TokenStatus,
};
