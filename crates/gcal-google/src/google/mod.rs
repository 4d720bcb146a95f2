//! Google Calendar access.
//!
//! # Authentication Flow
//!
//! 1. The user supplies their own OAuth client ID/secret (required by Google)
//! 2. A local HTTP listener is bound on the loopback interface
//! 3. The browser is opened on Google's consent page with a PKCE challenge
//! 4. Google redirects to the listener with the authorization code
//! 5. The code is exchanged for access and refresh tokens
//! 6. Tokens are persisted through a [`CredentialStore`]
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use gcal_google::google::{AuthSession, CalendarClient, EventQuery, FileTokenStore, GoogleConfig, OAuthCredentials};
//!
//! let config = GoogleConfig::new(OAuthCredentials::from_file("credentials.json")?);
//! let store = Arc::new(FileTokenStore::new("token.json"));
//! let session = Arc::new(AuthSession::new(config.clone(), store)?);
//! let client = CalendarClient::new(&config, session)?;
//!
//! let events = client.list_events("primary", &EventQuery::upcoming(chrono::Utc::now(), 10)).await?;
//! ```

mod client;
mod config;
mod oauth;
mod session;
mod tokens;

pub use client::{CalendarClient, EventQuery};
pub use config::{
    AUTH_URL, CALENDAR_API_BASE, GoogleConfig, OAuthCredentials, SCOPE_CALENDAR_EVENTS,
    SCOPE_CALENDAR_READONLY, TOKEN_URL,
};
pub use oauth::{LoopbackListener, OAuthClient, PkceFlow, RefreshOutcome, TokenResponse};
pub use session::AuthSession;
pub use tokens::{CredentialStore, FileTokenStore, MemoryTokenStore, TokenInfo, TokenStatus};
