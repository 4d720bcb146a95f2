//! Client configuration.
//!
//! Everything lives under one root directory (`~/.google` by default):
//!
//! ```text
//! <root>/calendar.toml               preferences, accounts, [google] credentials
//! <root>/credentials.json            OAuth client secret from Google Cloud Console
//! <root>/tokens/calendar_<acct>.json token cache
//! <root>/calendar_history.json       recent operations
//! <root>/templates/<name>.json       event templates
//! ```
//!
//! Credential values in `[google]` may be `env::VAR_NAME` references.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use gcal_core::OutputFormat;
use gcal_google::OAuthCredentials;

use crate::error::{ClientError, ClientResult};

/// Account used when nothing else selects one.
pub const DEFAULT_ACCOUNT: &str = "default";

/// Per-directory account selector, looked up in the working directory and
/// its parents.
pub const ACCOUNT_FILE: &str = ".google-account";

/// How many parent directories are searched for [`ACCOUNT_FILE`].
const ACCOUNT_FILE_MAX_PARENTS: usize = 5;

// ---------------------------------------------------------------------------
// ConfigPaths
// ---------------------------------------------------------------------------

/// Locations of every file the client reads or writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    root: PathBuf,
}

impl ConfigPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Uses `root` when given, otherwise `~/.google`.
    pub fn from_override(root: Option<PathBuf>) -> Self {
        Self::new(root.unwrap_or_else(Self::default_root))
    }

    pub fn default_root() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".google")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("calendar.toml")
    }

    pub fn credentials_file(&self) -> PathBuf {
        self.root.join("credentials.json")
    }

    pub fn tokens_dir(&self) -> PathBuf {
        self.root.join("tokens")
    }

    pub fn token_file(&self, account: &str) -> PathBuf {
        self.tokens_dir().join(format!("calendar_{}.json", account))
    }

    pub fn history_file(&self) -> PathBuf {
        self.root.join("calendar_history.json")
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.root.join("templates")
    }

    /// Places searched for a client secret file, in order.
    pub fn credential_candidates(&self) -> Vec<PathBuf> {
        let mut candidates = vec![self.credentials_file(), PathBuf::from("credentials.json")];
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join("credentials.json"));
        }
        candidates
    }
}

// ---------------------------------------------------------------------------
// CalendarConfig (calendar.toml)
// ---------------------------------------------------------------------------

/// Parsed contents of `calendar.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    pub preferences: Preferences,
    pub accounts: AccountSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google: Option<GoogleSettings>,
}

/// User preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Calendar used when `--calendar` is not given.
    pub default_calendar: String,

    /// Default for `list --max` and `search --max`.
    pub max_results: usize,

    /// IANA zone sent with event times on create/update.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,

    /// Output format when `--json` is not given.
    pub output_format: OutputFormat,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            default_calendar: "primary".to_string(),
            max_results: 10,
            time_zone: None,
            output_format: OutputFormat::Text,
        }
    }
}

impl Preferences {
    /// Keys accepted by `config get` and `config set`.
    pub const KEYS: &'static [&'static str] =
        &["default_calendar", "max_results", "time_zone", "output_format"];

    /// Returns a preference as a display string.
    pub fn get(&self, key: &str) -> ClientResult<Option<String>> {
        match key {
            "default_calendar" => Ok(Some(self.default_calendar.clone())),
            "max_results" => Ok(Some(self.max_results.to_string())),
            "time_zone" => Ok(self.time_zone.clone()),
            "output_format" => Ok(Some(self.output_format.as_str().to_string())),
            other => Err(unknown_key(other)),
        }
    }
}

fn unknown_key(key: &str) -> ClientError {
    ClientError::validation(format!(
        "unknown preference '{}' (expected one of: {})",
        key,
        Preferences::KEYS.join(", ")
    ))
}

/// Known accounts and the default one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub known: Vec<String>,
}

impl AccountSettings {
    pub fn contains(&self, name: &str) -> bool {
        self.known.iter().any(|a| a == name)
    }
}

/// Inline OAuth client credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoogleSettings {
    /// OAuth client ID, or an `env::` reference.
    pub client_id: Option<String>,

    /// OAuth client secret, or an `env::` reference.
    pub client_secret: Option<String>,
}

impl GoogleSettings {
    /// Resolves both values, or returns `None` when either is absent.
    pub fn resolve_credentials(&self) -> ClientResult<Option<OAuthCredentials>> {
        let (Some(raw_id), Some(raw_secret)) = (&self.client_id, &self.client_secret) else {
            return Ok(None);
        };
        let client_id = crate::secret::resolve(raw_id)?;
        let client_secret = crate::secret::resolve(raw_secret)?;
        Ok(Some(OAuthCredentials::new(client_id, client_secret)))
    }
}

impl CalendarConfig {
    /// Loads `calendar.toml`, or defaults when it does not exist.
    pub fn load(paths: &ConfigPaths) -> ClientResult<Self> {
        let path = paths.config_file();
        if !path.exists() {
            debug!("no config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ClientError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| ClientError::config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Credentials from `[google]`, then the first client secret file found.
    pub fn oauth_credentials(&self, paths: &ConfigPaths) -> ClientResult<OAuthCredentials> {
        if let Some(google) = &self.google
            && let Some(credentials) = google.resolve_credentials()?
        {
            return Ok(credentials);
        }

        let candidates = paths.credential_candidates();
        if let Some(path) = candidates.iter().find(|p| p.is_file()) {
            debug!("using client secret file {:?}", path);
            return Ok(OAuthCredentials::from_file(path)?);
        }

        Err(ClientError::config(format!(
            "OAuth client credentials not found. Download the client secret JSON from \
             Google Cloud Console and save it as {}, or pass --credentials-file",
            paths.credentials_file().display()
        )))
    }
}

// ---------------------------------------------------------------------------
// Account resolution
// ---------------------------------------------------------------------------

/// Picks the account to use.
///
/// Order: explicit flag (or `GOOGLE_CALENDAR_ACCOUNT`), a `.google-account`
/// file in `cwd` or up to five parents, `accounts.default`, then `default`.
pub fn resolve_account(
    flag: Option<&str>,
    cwd: &Path,
    config: &CalendarConfig,
) -> ClientResult<String> {
    let account = flag
        .map(str::to_string)
        .filter(|a| !a.trim().is_empty())
        .or_else(|| find_account_file(cwd))
        .or_else(|| config.accounts.default.clone())
        .unwrap_or_else(|| DEFAULT_ACCOUNT.to_string());
    validate_account_name(&account)?;
    Ok(account)
}

fn find_account_file(cwd: &Path) -> Option<String> {
    cwd.ancestors()
        .take(ACCOUNT_FILE_MAX_PARENTS + 1)
        .map(|dir| dir.join(ACCOUNT_FILE))
        .filter_map(|path| fs::read_to_string(path).ok())
        .map(|content| content.trim().to_string())
        .find(|account| !account.is_empty())
}

/// Account names become file names, so only a safe character set is allowed.
pub fn validate_account_name(name: &str) -> ClientResult<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "@._+-".contains(c));
    if valid {
        Ok(())
    } else {
        Err(ClientError::validation(format!(
            "invalid account name '{}' (use letters, digits and @._+-)",
            name
        )))
    }
}

// ---------------------------------------------------------------------------
// ConfigDocument (in-place edits of calendar.toml)
// ---------------------------------------------------------------------------

/// `calendar.toml` opened for editing. Comments and layout survive.
#[derive(Debug)]
pub struct ConfigDocument {
    path: PathBuf,
    doc: toml_edit::DocumentMut,
}

impl ConfigDocument {
    pub fn open(path: impl Into<PathBuf>) -> ClientResult<Self> {
        let path = path.into();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(ClientError::config(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };
        let doc = content.parse::<toml_edit::DocumentMut>().map_err(|e| {
            ClientError::config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        Ok(Self { path, doc })
    }

    fn table(&mut self, name: &str) -> ClientResult<&mut toml_edit::Table> {
        let location = self.path.display().to_string();
        self.doc
            .entry(name)
            .or_insert(toml_edit::table())
            .as_table_mut()
            .ok_or_else(|| ClientError::config(format!("[{}] in {} is not a table", name, location)))
    }

    /// Validates and stores one preference.
    pub fn set_preference(&mut self, key: &str, value: &str) -> ClientResult<()> {
        let item = match key {
            "default_calendar" => {
                if value.trim().is_empty() {
                    return Err(ClientError::validation("default_calendar must not be empty"));
                }
                Some(toml_edit::value(value.trim()))
            }
            "max_results" => {
                let n: i64 = value.trim().parse().map_err(|_| {
                    ClientError::validation(format!("max_results must be a number, got '{}'", value))
                })?;
                if n < 1 {
                    return Err(ClientError::validation("max_results must be at least 1"));
                }
                Some(toml_edit::value(n))
            }
            "time_zone" => {
                let value = value.trim();
                (!value.is_empty()).then(|| toml_edit::value(value))
            }
            "output_format" => {
                let format: OutputFormat = value.parse().map_err(ClientError::Validation)?;
                Some(toml_edit::value(format.as_str()))
            }
            other => return Err(unknown_key(other)),
        };

        let table = self.table("preferences")?;
        match item {
            Some(item) => {
                table[key] = item;
            }
            None => {
                table.remove(key);
            }
        }
        Ok(())
    }

    /// Adds `name` to the known accounts.
    pub fn add_account(&mut self, name: &str) -> ClientResult<()> {
        let location = self.path.display().to_string();
        let accounts = self.table("accounts")?;
        let known = accounts
            .entry("known")
            .or_insert(toml_edit::value(toml_edit::Array::new()))
            .as_array_mut()
            .ok_or_else(|| {
                ClientError::config(format!("accounts.known in {} is not an array", location))
            })?;
        if !known.iter().any(|v| v.as_str() == Some(name)) {
            known.push(name);
        }
        Ok(())
    }

    pub fn set_default_account(&mut self, name: &str) -> ClientResult<()> {
        self.table("accounts")?["default"] = toml_edit::value(name);
        Ok(())
    }

    pub fn set_google_credentials(&mut self, client_id: &str, client_secret: &str) -> ClientResult<()> {
        let google = self.table("google")?;
        google["client_id"] = toml_edit::value(client_id);
        google["client_secret"] = toml_edit::value(client_secret);
        Ok(())
    }

    pub fn save(&self) -> ClientResult<()> {
        write_private(&self.path, &self.doc.to_string())?;
        info!("saved configuration to {:?}", self.path);
        Ok(())
    }
}

/// Writes `contents` to `path` with mode 0600, creating parent directories.
///
/// The data goes to a fresh temp file that is renamed over `path`, so an
/// existing file with wider permissions ends up 0600 as well.
pub(crate) fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);
    match fs::remove_file(&temp_path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e),
        _ => {}
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(&temp_path)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()?;
    fs::rename(&temp_path, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_under_root() {
        let paths = ConfigPaths::new("/tmp/g");
        assert_eq!(paths.config_file(), PathBuf::from("/tmp/g/calendar.toml"));
        assert_eq!(
            paths.token_file("me@example.com"),
            PathBuf::from("/tmp/g/tokens/calendar_me@example.com.json")
        );
        assert_eq!(paths.history_file(), PathBuf::from("/tmp/g/calendar_history.json"));
        assert_eq!(paths.templates_dir(), PathBuf::from("/tmp/g/templates"));
        assert_eq!(paths.credential_candidates()[0], PathBuf::from("/tmp/g/credentials.json"));
    }

    #[test]
    fn missing_config_gives_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = CalendarConfig::load(&ConfigPaths::new(tmp.path())).unwrap();
        assert_eq!(config.preferences, Preferences::default());
        assert!(config.accounts.known.is_empty());
        assert!(config.google.is_none());
    }

    #[test]
    fn parse_full_config() {
        let config: CalendarConfig = toml::from_str(
            r#"
[preferences]
default_calendar = "team@group.calendar.google.com"
max_results = 25
time_zone = "Europe/Paris"
output_format = "json"

[accounts]
default = "work"
known = ["work", "home"]

[google]
client_id = "id.apps.googleusercontent.com"
client_secret = "secret"
"#,
        )
        .unwrap();

        assert_eq!(config.preferences.max_results, 25);
        assert_eq!(config.preferences.output_format, OutputFormat::Json);
        assert_eq!(config.preferences.time_zone.as_deref(), Some("Europe/Paris"));
        assert_eq!(config.accounts.default.as_deref(), Some("work"));
        assert!(config.accounts.contains("home"));

        let paths = ConfigPaths::new("/nonexistent");
        let creds = config.oauth_credentials(&paths).unwrap();
        assert_eq!(creds.client_id, "id.apps.googleusercontent.com");
    }

    #[test]
    fn bad_toml_is_config_error() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = ConfigPaths::new(tmp.path());
        fs::write(paths.config_file(), "[preferences\n").unwrap();
        assert!(matches!(
            CalendarConfig::load(&paths),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn credentials_from_root_file() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = ConfigPaths::new(tmp.path());
        fs::write(
            paths.credentials_file(),
            r#"{"installed": {"client_id": "f.apps.googleusercontent.com", "client_secret": "s"}}"#,
        )
        .unwrap();

        let creds = CalendarConfig::default().oauth_credentials(&paths).unwrap();
        assert_eq!(creds.client_id, "f.apps.googleusercontent.com");
    }

    #[test]
    fn inline_credentials_with_env_reference() {
        unsafe {
            std::env::set_var("_GCAL_CFG_TEST_SECRET", "from-env");
        }
        let settings = GoogleSettings {
            client_id: Some("id.apps.googleusercontent.com".into()),
            client_secret: Some("env::_GCAL_CFG_TEST_SECRET".into()),
        };
        let creds = settings.resolve_credentials().unwrap().unwrap();
        assert_eq!(creds.client_secret, "from-env");
        unsafe {
            std::env::remove_var("_GCAL_CFG_TEST_SECRET");
        }

        let partial = GoogleSettings {
            client_id: Some("id".into()),
            client_secret: None,
        };
        assert!(partial.resolve_credentials().unwrap().is_none());
    }

    mod document {
        use super::*;

        #[test]
        fn set_preference_keeps_comments() {
            let tmp = tempfile::tempdir().unwrap();
            let path = tmp.path().join("calendar.toml");
            fs::write(&path, "# my settings\n[preferences]\nmax_results = 5 # small\n").unwrap();

            let mut doc = ConfigDocument::open(&path).unwrap();
            doc.set_preference("default_calendar", "work").unwrap();
            doc.set_preference("output_format", "JSON").unwrap();
            doc.save().unwrap();

            let written = fs::read_to_string(&path).unwrap();
            assert!(written.contains("# my settings"));
            assert!(written.contains("# small"));

            let config = CalendarConfig::load_from(&path).unwrap();
            assert_eq!(config.preferences.default_calendar, "work");
            assert_eq!(config.preferences.max_results, 5);
            assert_eq!(config.preferences.output_format, OutputFormat::Json);
        }

        #[test]
        fn set_preference_validates() {
            let tmp = tempfile::tempdir().unwrap();
            let mut doc = ConfigDocument::open(tmp.path().join("calendar.toml")).unwrap();

            assert!(doc.set_preference("max_results", "zero").is_err());
            assert!(doc.set_preference("max_results", "0").is_err());
            assert!(doc.set_preference("output_format", "table").is_err());
            assert!(doc.set_preference("default_calendar", " ").is_err());
            assert!(matches!(
                doc.set_preference("colour", "red"),
                Err(ClientError::Validation(_))
            ));
        }

        #[test]
        fn empty_time_zone_removes_key() {
            let tmp = tempfile::tempdir().unwrap();
            let path = tmp.path().join("calendar.toml");

            let mut doc = ConfigDocument::open(&path).unwrap();
            doc.set_preference("time_zone", "America/New_York").unwrap();
            doc.save().unwrap();
            assert_eq!(
                CalendarConfig::load_from(&path).unwrap().preferences.time_zone.as_deref(),
                Some("America/New_York")
            );

            let mut doc = ConfigDocument::open(&path).unwrap();
            doc.set_preference("time_zone", "").unwrap();
            doc.save().unwrap();
            assert!(CalendarConfig::load_from(&path).unwrap().preferences.time_zone.is_none());
        }

        #[test]
        fn accounts_are_deduplicated() {
            let tmp = tempfile::tempdir().unwrap();
            let path = tmp.path().join("calendar.toml");

            let mut doc = ConfigDocument::open(&path).unwrap();
            doc.add_account("work").unwrap();
            doc.add_account("home").unwrap();
            doc.add_account("work").unwrap();
            doc.set_default_account("home").unwrap();
            doc.save().unwrap();

            let accounts = CalendarConfig::load_from(&path).unwrap().accounts;
            assert_eq!(accounts.known, vec!["work", "home"]);
            assert_eq!(accounts.default.as_deref(), Some("home"));
        }

        #[cfg(unix)]
        #[test]
        fn saved_file_is_private() {
            use std::os::unix::fs::PermissionsExt;

            let tmp = tempfile::tempdir().unwrap();
            let path = tmp.path().join("nested").join("calendar.toml");
            let mut doc = ConfigDocument::open(&path).unwrap();
            doc.set_google_credentials("id", "secret").unwrap();
            doc.save().unwrap();

            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        #[cfg(unix)]
        #[test]
        fn rewriting_a_shared_file_makes_it_private() {
            use std::os::unix::fs::PermissionsExt;

            let tmp = tempfile::tempdir().unwrap();
            let path = tmp.path().join("calendar.toml");
            fs::write(&path, "# mine\n[preferences]\nmax_results = 5\n").unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

            let mut doc = ConfigDocument::open(&path).unwrap();
            doc.set_google_credentials("id", "secret").unwrap();
            doc.save().unwrap();

            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
            let content = fs::read_to_string(&path).unwrap();
            assert!(content.contains("# mine"));
            assert!(content.contains("client_secret"));
            assert!(!tmp.path().join("calendar.toml.tmp").exists());
        }
    }

    mod accounts {
        use super::*;

        fn config_with_default(name: &str) -> CalendarConfig {
            let mut config = CalendarConfig::default();
            config.accounts.default = Some(name.to_string());
            config
        }

        #[test]
        fn flag_wins() {
            let tmp = tempfile::tempdir().unwrap();
            fs::write(tmp.path().join(ACCOUNT_FILE), "dir-account\n").unwrap();
            let account =
                resolve_account(Some("flag"), tmp.path(), &config_with_default("cfg")).unwrap();
            assert_eq!(account, "flag");
        }

        #[test]
        fn account_file_in_parent() {
            let tmp = tempfile::tempdir().unwrap();
            fs::write(tmp.path().join(ACCOUNT_FILE), "  dir-account \n").unwrap();
            let nested = tmp.path().join("a").join("b");
            fs::create_dir_all(&nested).unwrap();

            let account = resolve_account(None, &nested, &config_with_default("cfg")).unwrap();
            assert_eq!(account, "dir-account");
        }

        #[test]
        fn account_file_too_far_up_is_ignored() {
            let tmp = tempfile::tempdir().unwrap();
            fs::write(tmp.path().join(ACCOUNT_FILE), "far").unwrap();
            let nested = tmp.path().join("1/2/3/4/5/6");
            fs::create_dir_all(&nested).unwrap();

            let account = resolve_account(None, &nested, &config_with_default("cfg")).unwrap();
            assert_eq!(account, "cfg");
        }

        #[test]
        fn fallback_to_default() {
            let tmp = tempfile::tempdir().unwrap();
            let account = resolve_account(None, tmp.path(), &CalendarConfig::default()).unwrap();
            assert_eq!(account, DEFAULT_ACCOUNT);
        }

        #[test]
        fn unsafe_names_rejected() {
            for name in ["../evil", "a/b", ".hidden", "", "sp ace"] {
                assert!(validate_account_name(name).is_err(), "{name}");
            }
            for name in ["default", "me@example.com", "work-2", "a+b_c"] {
                assert!(validate_account_name(name).is_ok(), "{name}");
            }
        }
    }
}
