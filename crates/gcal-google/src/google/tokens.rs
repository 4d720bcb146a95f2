//! OAuth token storage.
//!
//! The auth session reaches stored tokens only through the
//! [`CredentialStore`] trait. [`FileTokenStore`] keeps one JSON file per
//! account; [`MemoryTokenStore`] is used by tests and embedders.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};

/// Seconds subtracted from the server-reported lifetime so that a token is
/// refreshed shortly before it actually expires.
pub const EXPIRY_MARGIN_SECS: i64 = 60;

/// Information about an OAuth token set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// The access token for API requests.
    pub access_token: String,

    /// The refresh token for obtaining new access tokens.
    pub refresh_token: Option<String>,

    /// When the access token expires, minus [`EXPIRY_MARGIN_SECS`].
    pub expires_at: Option<DateTime<Utc>>,

    /// The OAuth scopes that were granted.
    pub scopes: Vec<String>,

    /// When the tokens were last refreshed.
    pub last_refresh: DateTime<Utc>,
}

fn expiry_from(expires_in_secs: Option<i64>) -> Option<DateTime<Utc>> {
    expires_in_secs
        .map(|secs| Utc::now() + Duration::seconds(secs) - Duration::seconds(EXPIRY_MARGIN_SECS))
}

impl TokenInfo {
    /// Creates a new token info from OAuth response data.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expiry_from(expires_in_secs),
            scopes,
            last_refresh: Utc::now(),
        }
    }

    /// Returns true if the access token is expired or about to expire.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() >= expires_at,
            None => false,
        }
    }

    /// Returns true if the token has the required scopes.
    pub fn has_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.scopes.contains(scope))
    }

    /// Returns the required scopes this token lacks.
    pub fn missing_scopes<'a>(&self, required: &'a [String]) -> Vec<&'a str> {
        required
            .iter()
            .filter(|scope| !self.scopes.contains(scope))
            .map(String::as_str)
            .collect()
    }

    /// Updates the access token after a refresh.
    ///
    /// The refresh token is replaced only when Google rotated it.
    pub fn apply_refresh(
        &mut self,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
        rotated_refresh_token: Option<String>,
    ) {
        self.access_token = access_token.into();
        self.expires_at = expiry_from(expires_in_secs);
        if let Some(refresh_token) = rotated_refresh_token {
            self.refresh_token = Some(refresh_token);
        }
        self.last_refresh = Utc::now();
    }

    /// Returns the time until the token expires, if known.
    pub fn time_until_expiry(&self) -> Option<Duration> {
        self.expires_at.map(|expires_at| expires_at - Utc::now())
    }
}

/// Persistent home of an account's tokens.
pub trait CredentialStore: fmt::Debug + Send + Sync {
    /// Loads the stored tokens.
    ///
    /// Fails with an authentication error when nothing is stored or the
    /// stored value is unreadable.
    fn load(&self) -> ProviderResult<TokenInfo>;

    /// Replaces the stored tokens.
    fn save(&self, tokens: &TokenInfo) -> ProviderResult<()>;

    /// Removes the stored tokens. Clearing an empty store succeeds.
    fn clear(&self) -> ProviderResult<()>;

    /// Returns true if something is stored, without validating it.
    fn exists(&self) -> bool;

    /// Describes where tokens live, for messages.
    fn location(&self) -> String;
}

/// Token store backed by a single JSON file.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Creates a store for the given file path. Nothing is read until
    /// [`CredentialStore::load`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the token file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn create_parent(&self) -> ProviderResult<()> {
        let Some(parent) = self.path.parent() else {
            return Ok(());
        };
        if parent.as_os_str().is_empty() || parent.exists() {
            return Ok(());
        }

        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }
        builder.create(parent).map_err(|e| {
            ProviderError::configuration(format!(
                "failed to create token directory {}: {}",
                parent.display(),
                e
            ))
            .with_source(e)
        })
    }
}

impl CredentialStore for FileTokenStore {
    fn load(&self) -> ProviderResult<TokenInfo> {
        if !self.path.exists() {
            debug!("no token file at {:?}", self.path);
            return Err(ProviderError::authentication(format!(
                "not authenticated (no token at {}); run `google-calendar init`",
                self.path.display()
            )));
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            ProviderError::authentication(format!(
                "failed to read token file {}: {}; re-run `google-calendar init`",
                self.path.display(),
                e
            ))
            .with_source(e)
        })?;

        let tokens: TokenInfo = serde_json::from_str(&content).map_err(|e| {
            ProviderError::authentication(format!(
                "token file {} is corrupt ({}); re-run `google-calendar init`",
                self.path.display(),
                e
            ))
            .with_source(e)
        })?;

        debug!("loaded tokens from {:?}", self.path);
        Ok(tokens)
    }

    fn save(&self, tokens: &TokenInfo) -> ProviderResult<()> {
        self.create_parent()?;

        let content = serde_json::to_string_pretty(tokens).map_err(|e| {
            ProviderError::internal(format!("failed to serialize tokens: {}", e)).with_source(e)
        })?;

        // Write to a private temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("json.tmp");
        let write_err = |e: std::io::Error| {
            ProviderError::configuration(format!(
                "failed to write token file {}: {}",
                self.path.display(),
                e
            ))
            .with_source(e)
        };

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&temp_path).map_err(write_err)?;
        file.write_all(content.as_bytes()).map_err(write_err)?;
        file.sync_all().map_err(write_err)?;
        drop(file);

        fs::rename(&temp_path, &self.path).map_err(write_err)?;

        info!("saved tokens to {:?}", self.path);
        Ok(())
    }

    fn clear(&self) -> ProviderResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("cleared tokens from {:?}", self.path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ProviderError::configuration(format!(
                "failed to remove token file {}: {}",
                self.path.display(),
                e
            ))
            .with_source(e)),
        }
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Token store that lives only in memory.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<Option<TokenInfo>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `tokens`.
    pub fn with_tokens(tokens: TokenInfo) -> Self {
        Self {
            tokens: Mutex::new(Some(tokens)),
        }
    }

    fn lock(&self) -> ProviderResult<std::sync::MutexGuard<'_, Option<TokenInfo>>> {
        self.tokens
            .lock()
            .map_err(|_| ProviderError::internal("token store lock poisoned"))
    }
}

impl CredentialStore for MemoryTokenStore {
    fn load(&self) -> ProviderResult<TokenInfo> {
        self.lock()?
            .clone()
            .ok_or_else(|| {
                ProviderError::authentication("not authenticated; run `google-calendar init`")
            })
    }

    fn save(&self, tokens: &TokenInfo) -> ProviderResult<()> {
        *self.lock()? = Some(tokens.clone());
        Ok(())
    }

    fn clear(&self) -> ProviderResult<()> {
        *self.lock()? = None;
        Ok(())
    }

    fn exists(&self) -> bool {
        self.lock().map(|t| t.is_some()).unwrap_or(false)
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

/// Health of the stored token for an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenStatus {
    /// Nothing stored.
    Missing,
    /// Access token still valid.
    Valid,
    /// Access token expired but a refresh token is available.
    ExpiredRefreshable,
    /// Access token expired and cannot be refreshed.
    Expired,
    /// Stored token lacks a required scope.
    ScopeMismatch,
    /// Stored token cannot be parsed.
    Corrupt,
}

impl TokenStatus {
    /// Inspects `store` without touching the network.
    pub fn inspect(store: &dyn CredentialStore, required_scopes: &[String]) -> Self {
        if !store.exists() {
            return Self::Missing;
        }
        let Ok(tokens) = store.load() else {
            return Self::Corrupt;
        };
        if !tokens.has_scopes(required_scopes) {
            Self::ScopeMismatch
        } else if !tokens.is_expired() {
            Self::Valid
        } else if tokens.refresh_token.is_some() {
            Self::ExpiredRefreshable
        } else {
            Self::Expired
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Valid => "valid",
            Self::ExpiredRefreshable => "expired_refreshable",
            Self::Expired => "expired",
            Self::ScopeMismatch => "scope_mismatch",
            Self::Corrupt => "corrupt",
        }
    }

    /// Returns true if API calls can proceed without running `init`.
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Valid | Self::ExpiredRefreshable)
    }
}

impl fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
