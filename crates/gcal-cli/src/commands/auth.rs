//! Authentication commands: `init`, `status`, `logout`.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{info, warn};

use gcal_google::{CalendarClient, CredentialStore, GoogleConfig, OAuthCredentials, TokenStatus};

use super::{Context, print_json};
use crate::config::{ConfigDocument, DEFAULT_ACCOUNT};
use crate::error::{ClientError, ClientResult};

/// Where the client credentials came from.
#[derive(Debug, PartialEq)]
enum CredentialSource {
    /// `--client-id`/`--client-secret` or `--credentials-file`
    Cli,
    /// `calendar.toml` or a `credentials.json` on disk
    Config,
}

/// Runs the OAuth consent flow for the selected account.
///
/// Credentials given on the command line are persisted to `calendar.toml`,
/// and the account is recorded (and made the default when none is set).
pub async fn init(
    ctx: &Context,
    client_id: Option<String>,
    client_secret: Option<String>,
    credentials_file: Option<PathBuf>,
    force: bool,
) -> ClientResult<()> {
    let (credentials, source) =
        resolve_credentials(ctx, client_id, client_secret, credentials_file)?;
    credentials
        .validate()
        .map_err(|e| ClientError::config(format!("invalid Google credentials: {}", e.message())))?;

    let mut ctx = ctx.clone();
    if source == CredentialSource::Cli {
        ctx.config.google = Some(crate::config::GoogleSettings {
            client_id: Some(credentials.client_id.clone()),
            client_secret: Some(credentials.client_secret.clone()),
        });
    }
    let session = ctx.session()?;

    let status = session.status();
    if status.is_usable() && !force {
        record_account(&ctx, &credentials, &source)?;
        println!("Already authenticated as account '{}'.", ctx.account);
        println!("Use --force to re-authorize.");
        return Ok(());
    }

    println!("Starting Google Calendar authorization for account '{}'...", ctx.account);
    println!("A browser window will open; if it does not, copy the URL printed below.");
    session.authorize().await?;
    info!("authorization complete for {}", ctx.account);

    record_account(&ctx, &credentials, &source)?;

    println!();
    println!("Authorized. Token saved to {}", session.store().location());

    let config = ctx.google_config()?;
    match CalendarClient::new(&config, session)?.get_calendar("primary").await {
        Ok(calendar) => println!("Primary calendar: {} ({})", calendar.summary, calendar.id),
        Err(e) => {
            warn!("verification request failed: {}", e);
            println!("Token saved, but reading the primary calendar failed: {}", e);
        }
    }
    Ok(())
}

/// Resolves client credentials.
///
/// Priority: `--client-id` + `--client-secret`, then `--credentials-file`,
/// then `[google]` in `calendar.toml` and the credential file search path.
fn resolve_credentials(
    ctx: &Context,
    client_id: Option<String>,
    client_secret: Option<String>,
    credentials_file: Option<PathBuf>,
) -> ClientResult<(OAuthCredentials, CredentialSource)> {
    match (client_id, client_secret) {
        (Some(id), Some(secret)) => {
            return Ok((OAuthCredentials::new(id, secret), CredentialSource::Cli));
        }
        (None, None) => {}
        _ => {
            return Err(ClientError::config(
                "both --client-id and --client-secret are required when providing credentials directly",
            ));
        }
    }

    if let Some(path) = credentials_file {
        let credentials = OAuthCredentials::from_file(&path)?;
        return Ok((credentials, CredentialSource::Cli));
    }

    let credentials = ctx.config.oauth_credentials(&ctx.paths)?;
    Ok((credentials, CredentialSource::Config))
}

fn record_account(
    ctx: &Context,
    credentials: &OAuthCredentials,
    source: &CredentialSource,
) -> ClientResult<()> {
    let mut doc = ConfigDocument::open(ctx.paths.config_file())?;
    if *source == CredentialSource::Cli {
        doc.set_google_credentials(&credentials.client_id, &credentials.client_secret)?;
        println!("Credentials saved to {}", ctx.paths.config_file().display());
    }
    doc.add_account(&ctx.account)?;
    if ctx.config.accounts.default.is_none() {
        doc.set_default_account(&ctx.account)?;
    }
    doc.save()
}

#[derive(Debug, Serialize)]
struct StatusReport {
    account: String,
    token_path: String,
    status: TokenStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_refresh: Option<chrono::DateTime<chrono::Utc>>,
}

/// Reports the health of the stored token without network access.
pub fn status(ctx: &Context) -> ClientResult<()> {
    let report = status_report(ctx);

    if ctx.is_json() {
        return print_json(&report);
    }

    println!("Account: {}", report.account);
    println!("Token:   {}", report.token_path);
    println!("Status:  {}", report.status);
    if let Some(expires_at) = report.expires_at {
        println!(
            "Expires: {}",
            expires_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M")
        );
    }
    match report.status {
        TokenStatus::Valid | TokenStatus::ExpiredRefreshable => {}
        TokenStatus::ScopeMismatch => {
            println!("Run `google-calendar init --force` to grant the missing scopes.")
        }
        _ => println!("Run `google-calendar init` to authorize."),
    }
    Ok(())
}

fn status_report(ctx: &Context) -> StatusReport {
    let store = ctx.token_store();
    let status = TokenStatus::inspect(&store, &GoogleConfig::default_scopes());
    let tokens = store.load().ok();
    StatusReport {
        account: ctx.account.clone(),
        token_path: store.location(),
        status,
        expires_at: tokens.as_ref().and_then(|t| t.expires_at),
        last_refresh: tokens.as_ref().map(|t| t.last_refresh),
    }
}

/// Deletes the stored token for the account.
pub fn logout(ctx: &Context) -> ClientResult<()> {
    let store = ctx.token_store();
    let existed = store.exists();
    store.clear()?;

    if existed {
        println!("Removed token for account '{}'.", ctx.account);
    } else {
        println!("No token stored for account '{}'.", ctx.account);
    }
    if ctx.account != DEFAULT_ACCOUNT && ctx.config.accounts.contains(&ctx.account) {
        println!("The account stays listed; run `google-calendar init -a {}` to sign in again.", ctx.account);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CalendarConfig, ConfigPaths};
    use chrono::{Duration, Utc};
    use gcal_google::TokenInfo;

    fn context() -> (tempfile::TempDir, Context) {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = Context::new(
            ConfigPaths::new(tmp.path()),
            CalendarConfig::default(),
            "work".into(),
            false,
        );
        (tmp, ctx)
    }

    #[test]
    fn credentials_from_flags() {
        let (_tmp, ctx) = context();
        let (creds, source) = resolve_credentials(
            &ctx,
            Some("cli.apps.googleusercontent.com".into()),
            Some("cli-secret".into()),
            None,
        )
        .unwrap();
        assert_eq!(creds.client_id, "cli.apps.googleusercontent.com");
        assert_eq!(source, CredentialSource::Cli);
    }

    #[test]
    fn partial_flags_fail() {
        let (_tmp, ctx) = context();
        assert!(resolve_credentials(&ctx, Some("id".into()), None, None).is_err());
        assert!(resolve_credentials(&ctx, None, Some("s".into()), None).is_err());
    }

    #[test]
    fn credentials_from_file_flag() {
        let (tmp, ctx) = context();
        let path = tmp.path().join("client.json");
        std::fs::write(
            &path,
            r#"{"installed": {"client_id": "file.apps.googleusercontent.com", "client_secret": "s"}}"#,
        )
        .unwrap();

        let (creds, source) = resolve_credentials(&ctx, None, None, Some(path)).unwrap();
        assert_eq!(creds.client_id, "file.apps.googleusercontent.com");
        assert_eq!(source, CredentialSource::Cli);
    }

    #[test]
    fn credentials_from_config_dir() {
        let (_tmp, ctx) = context();
        std::fs::write(
            ctx.paths.credentials_file(),
            r#"{"web": {"client_id": "dir.apps.googleusercontent.com", "client_secret": "s"}}"#,
        )
        .unwrap();

        let (creds, source) = resolve_credentials(&ctx, None, None, None).unwrap();
        assert_eq!(creds.client_id, "dir.apps.googleusercontent.com");
        assert_eq!(source, CredentialSource::Config);
    }

    #[test]
    fn record_account_sets_first_default_and_saves_cli_credentials() {
        let (_tmp, ctx) = context();
        let creds = OAuthCredentials::new("id.apps.googleusercontent.com", "secret");
        record_account(&ctx, &creds, &CredentialSource::Cli).unwrap();

        let config = CalendarConfig::load(&ctx.paths).unwrap();
        assert_eq!(config.accounts.known, vec!["work"]);
        assert_eq!(config.accounts.default.as_deref(), Some("work"));
        let google = config.google.unwrap();
        assert_eq!(google.client_secret.as_deref(), Some("secret"));
    }

    #[test]
    fn record_account_keeps_existing_default() {
        let (_tmp, mut ctx) = context();
        ctx.config.accounts.default = Some("home".into());
        let creds = OAuthCredentials::new("id.apps.googleusercontent.com", "secret");
        record_account(&ctx, &creds, &CredentialSource::Config).unwrap();

        let config = CalendarConfig::load(&ctx.paths).unwrap();
        assert!(config.accounts.default.is_none());
        assert!(config.accounts.contains("work"));
        assert!(config.google.is_none());
    }

    #[test]
    fn status_reports_each_state() {
        let (_tmp, ctx) = context();
        let store = ctx.token_store();
        assert_eq!(status_report(&ctx).status, TokenStatus::Missing);

        let mut token = TokenInfo::new(
            "a",
            Some("r".into()),
            Some(3600),
            GoogleConfig::default_scopes(),
        );
        store.save(&token).unwrap();
        let report = status_report(&ctx);
        assert_eq!(report.status, TokenStatus::Valid);
        assert!(report.expires_at.is_some());

        token.expires_at = Some(Utc::now() - Duration::minutes(5));
        store.save(&token).unwrap();
        assert_eq!(status_report(&ctx).status, TokenStatus::ExpiredRefreshable);

        std::fs::write(ctx.paths.token_file("work"), "garbage").unwrap();
        assert_eq!(status_report(&ctx).status, TokenStatus::Corrupt);
        status(&ctx).unwrap();
    }

    #[test]
    fn logout_removes_token() {
        let (_tmp, ctx) = context();
        let token = TokenInfo::new("a", None, None, GoogleConfig::default_scopes());
        ctx.token_store().save(&token).unwrap();

        logout(&ctx).unwrap();
        assert!(!ctx.token_store().exists());
        // second logout is fine
        logout(&ctx).unwrap();
    }
}
