//! Command implementations.
//!
//! Each command receives a [`Context`] built once in `main`: resolved paths,
//! the parsed `calendar.toml`, the selected account and the output format.

pub mod accounts;
pub mod auth;
pub mod calendars;
pub mod config;
pub mod events;
pub mod history;
pub mod template;

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use chrono::Local;
use serde::Serialize;
use tracing::debug;

use gcal_core::{OutputFormat, OutputFormatter};
use gcal_google::{AuthSession, CalendarClient, FileTokenStore, GoogleConfig};

use crate::cli::CalendarArg;
use crate::config::{CalendarConfig, ConfigPaths};
use crate::error::{ClientError, ClientResult};
use crate::history::History;
use crate::templates::TemplateStore;

/// Everything a command needs to run.
#[derive(Debug, Clone)]
pub struct Context {
    pub paths: ConfigPaths,
    pub config: CalendarConfig,
    pub account: String,
    pub output: OutputFormat,
    /// Replaces Google's endpoints (API base and `<base>/token`).
    pub(crate) endpoint_override: Option<String>,
}

impl Context {
    pub fn new(paths: ConfigPaths, config: CalendarConfig, account: String, json: bool) -> Self {
        let output = if json {
            OutputFormat::Json
        } else {
            config.preferences.output_format
        };
        Self {
            paths,
            config,
            account,
            output,
            endpoint_override: None,
        }
    }

    pub fn is_json(&self) -> bool {
        self.output == OutputFormat::Json
    }

    /// `--calendar`, or the `default_calendar` preference.
    pub fn calendar_id(&self, arg: &CalendarArg) -> String {
        arg.calendar
            .clone()
            .unwrap_or_else(|| self.config.preferences.default_calendar.clone())
    }

    pub fn google_config(&self) -> ClientResult<GoogleConfig> {
        let credentials = self.config.oauth_credentials(&self.paths)?;
        let mut config = GoogleConfig::new(credentials);
        if let Some(base) = &self.endpoint_override {
            config = config
                .with_api_base_url(base.clone())
                .with_token_url(format!("{}/token", base));
        }
        config.validate()?;
        Ok(config)
    }

    pub fn token_store(&self) -> FileTokenStore {
        FileTokenStore::new(self.paths.token_file(&self.account))
    }

    pub fn session(&self) -> ClientResult<Arc<AuthSession>> {
        let store = Arc::new(self.token_store());
        Ok(Arc::new(AuthSession::new(self.google_config()?, store)?))
    }

    /// API client for the selected account.
    pub fn client(&self) -> ClientResult<CalendarClient> {
        let config = self.google_config()?;
        let store = Arc::new(self.token_store());
        debug!("using account {} ({:?})", self.account, store.path());
        let session = Arc::new(AuthSession::new(config.clone(), store)?);
        Ok(CalendarClient::new(&config, session)?)
    }

    pub fn history(&self) -> History {
        History::new(self.paths.history_file())
    }

    pub fn templates(&self) -> TemplateStore {
        TemplateStore::new(self.paths.templates_dir())
    }

    pub fn formatter(&self) -> OutputFormatter<Local> {
        OutputFormatter::new(Local)
    }
}

/// Prints `value` as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> ClientResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Asks a yes/no question on stderr; anything but `y`/`yes` declines.
pub(crate) fn confirm(question: &str) -> ClientResult<bool> {
    let mut stderr = io::stderr();
    write!(stderr, "{} [y/N] ", question)?;
    stderr.flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Fails with [`ClientError::Aborted`] unless the user agrees.
pub(crate) fn require_confirmation(question: &str) -> ClientResult<()> {
    if confirm(question)? {
        Ok(())
    } else {
        Err(ClientError::Aborted)
    }
}
