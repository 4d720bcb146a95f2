//! Authenticated session: owns the token lifecycle for one account.
//!
//! The session loads tokens lazily from its [`CredentialStore`], refreshes
//! them when they are known to be expired, and lets the API client force a
//! refresh after a 401. A refresh token rejected by Google clears the store.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};

use super::config::GoogleConfig;
use super::oauth::{OAuthClient, RefreshOutcome};
use super::tokens::{CredentialStore, TokenInfo, TokenStatus};

/// Token lifecycle for one account.
#[derive(Debug)]
pub struct AuthSession {
    store: Arc<dyn CredentialStore>,
    oauth: OAuthClient,
    /// Tokens loaded from the store, kept for the life of the process.
    tokens: Mutex<Option<TokenInfo>>,
}

impl AuthSession {
    /// Creates a session. Nothing is loaded until a token is needed.
    pub fn new(config: GoogleConfig, store: Arc<dyn CredentialStore>) -> ProviderResult<Self> {
        Ok(Self {
            store,
            oauth: OAuthClient::new(config)?,
            tokens: Mutex::new(None),
        })
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &dyn CredentialStore {
        self.store.as_ref()
    }

    /// Reports the stored token's health without network access.
    pub fn status(&self) -> TokenStatus {
        TokenStatus::inspect(self.store.as_ref(), self.oauth.scopes())
    }

    /// Runs the browser consent flow and stores the resulting tokens.
    pub async fn authorize(&self) -> ProviderResult<TokenInfo> {
        let tokens = self.oauth.authorize().await?;
        self.install(tokens.clone()).await?;
        Ok(tokens)
    }

    /// Stores freshly obtained tokens and makes them current.
    pub async fn install(&self, tokens: TokenInfo) -> ProviderResult<()> {
        self.store.save(&tokens)?;
        *self.tokens.lock().await = Some(tokens);
        Ok(())
    }

    /// Deletes the stored tokens.
    pub async fn logout(&self) -> ProviderResult<()> {
        *self.tokens.lock().await = None;
        self.store.clear()
    }

    /// Returns a usable access token, refreshing it first if it is expired.
    pub async fn access_token(&self) -> ProviderResult<String> {
        let mut guard = self.tokens.lock().await;
        let tokens = self.loaded(&mut guard)?;

        if tokens.is_expired() {
            debug!("access token expired, refreshing");
            self.refresh_into(tokens).await?;
        }
        Ok(tokens.access_token.clone())
    }

    /// Refreshes the access token unconditionally.
    ///
    /// Used after the API rejected a token that looked valid locally.
    pub async fn force_refresh(&self) -> ProviderResult<String> {
        let mut guard = self.tokens.lock().await;
        let tokens = self.loaded(&mut guard)?;
        self.refresh_into(tokens).await?;
        Ok(tokens.access_token.clone())
    }

    fn loaded<'a>(&self, slot: &'a mut Option<TokenInfo>) -> ProviderResult<&'a mut TokenInfo> {
        if slot.is_none() {
            let tokens = self.store.load()?;
            let missing = tokens.missing_scopes(self.oauth.scopes());
            if !missing.is_empty() {
                return Err(ProviderError::authentication(format!(
                    "stored token lacks required scopes ({}); run `google-calendar init --force`",
                    missing.join(", ")
                )));
            }
            *slot = Some(tokens);
        }
        slot.as_mut()
            .ok_or_else(|| ProviderError::internal("token cache empty after load"))
    }

    async fn refresh_into(&self, tokens: &mut TokenInfo) -> ProviderResult<()> {
        let refresh_token = tokens.refresh_token.clone().ok_or_else(|| {
            ProviderError::authentication(
                "access token expired and no refresh token is stored; run `google-calendar init`",
            )
        })?;

        match self.oauth.refresh(&refresh_token).await? {
            RefreshOutcome::Refreshed(response) => {
                tokens.apply_refresh(
                    response.access_token,
                    response.expires_in,
                    response.refresh_token,
                );
                self.store.save(tokens)?;
                info!("refreshed access token");
                Ok(())
            }
            RefreshOutcome::Revoked(reason) => {
                warn!("clearing revoked credentials at {}", self.store.location());
                self.store.clear()?;
                Err(ProviderError::authentication(format!(
                    "stored credentials are no longer valid ({}); run `google-calendar init`",
                    reason
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use crate::google::config::OAuthCredentials;
    use crate::google::tokens::MemoryTokenStore;
    use chrono::{Duration, Utc};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> GoogleConfig {
        GoogleConfig::new(OAuthCredentials::new(
            "test-client.apps.googleusercontent.com",
            "test-secret",
        ))
        .with_token_url(format!("{}/token", server.uri()))
    }

    fn token(expired: bool) -> TokenInfo {
        let mut token = TokenInfo::new(
            "old-access",
            Some("refresh".into()),
            Some(3600),
            GoogleConfig::default_scopes(),
        );
        if expired {
            token.expires_at = Some(Utc::now() - Duration::minutes(1));
        }
        token
    }

    fn session(server: &MockServer, store: Arc<MemoryTokenStore>) -> AuthSession {
        AuthSession::new(config(server), store).unwrap()
    }

    async fn mount_refresh(server: &MockServer, times: u64) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "new-access",
                "expires_in": 3600
            })))
            .expect(times)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn valid_token_is_used_without_refresh() {
        let server = MockServer::start().await;
        mount_refresh(&server, 0).await;
        let store = Arc::new(MemoryTokenStore::with_tokens(token(false)));

        let session = session(&server, store);
        assert_eq!(session.access_token().await.unwrap(), "old-access");
        assert_eq!(session.status(), TokenStatus::Valid);
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_and_saved() {
        let server = MockServer::start().await;
        mount_refresh(&server, 1).await;
        let store = Arc::new(MemoryTokenStore::with_tokens(token(true)));

        let session = session(&server, store.clone());
        assert_eq!(session.access_token().await.unwrap(), "new-access");
        // cached afterwards
        assert_eq!(session.access_token().await.unwrap(), "new-access");

        let saved = store.load().unwrap();
        assert_eq!(saved.access_token, "new-access");
        assert_eq!(saved.refresh_token.as_deref(), Some("refresh"));
    }

    #[tokio::test]
    async fn force_refresh_always_calls_endpoint() {
        let server = MockServer::start().await;
        mount_refresh(&server, 1).await;
        let store = Arc::new(MemoryTokenStore::with_tokens(token(false)));

        let session = session(&server, store);
        assert_eq!(session.force_refresh().await.unwrap(), "new-access");
    }

    #[tokio::test]
    async fn revoked_refresh_token_clears_store() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Token has been expired or revoked."
            })))
            .mount(&server)
            .await;
        let store = Arc::new(MemoryTokenStore::with_tokens(token(true)));

        let session = session(&server, store.clone());
        let err = session.access_token().await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
        assert!(err.message().contains("init"));
        assert!(!store.exists());
    }

    #[tokio::test]
    async fn expired_without_refresh_token() {
        let server = MockServer::start().await;
        let mut expired = token(true);
        expired.refresh_token = None;
        let store = Arc::new(MemoryTokenStore::with_tokens(expired));

        let session = session(&server, store);
        assert_eq!(session.status(), TokenStatus::Expired);
        assert!(session.access_token().await.unwrap_err().is_auth());
    }

    #[tokio::test]
    async fn missing_scope_is_auth_error() {
        let server = MockServer::start().await;
        let mut narrow = token(false);
        narrow.scopes = vec![crate::google::config::SCOPE_CALENDAR_READONLY.to_string()];
        let store = Arc::new(MemoryTokenStore::with_tokens(narrow));

        let session = session(&server, store);
        assert_eq!(session.status(), TokenStatus::ScopeMismatch);
        let err = session.access_token().await.unwrap_err();
        assert!(err.is_auth());
        assert!(err.message().contains("calendar.events"));
    }

    #[tokio::test]
    async fn no_token_is_auth_error() {
        let server = MockServer::start().await;
        let session = session(&server, Arc::new(MemoryTokenStore::new()));
        assert_eq!(session.status(), TokenStatus::Missing);
        assert!(session.access_token().await.unwrap_err().is_auth());
    }

    #[tokio::test]
    async fn install_and_logout() {
        let server = MockServer::start().await;
        let store = Arc::new(MemoryTokenStore::new());
        let session = session(&server, store.clone());

        session.install(token(false)).await.unwrap();
        assert!(store.exists());
        assert_eq!(session.access_token().await.unwrap(), "old-access");

        session.logout().await.unwrap();
        assert!(!store.exists());
        assert!(session.access_token().await.is_err());
    }
}
