//! Logging setup for the `google-calendar` binary.
//!
//! Everything is written to stderr; stdout is reserved for command output
//! (including `--json`). `RUST_LOG` takes precedence over the configured
//! level.
//!
//! ```ignore
//! use gcal_core::tracing::{init_tracing, TracingConfig};
//!
//! let config = if debug { TracingConfig::cli_debug() } else { TracingConfig::cli() };
//! init_tracing(config)?;
//! ```

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

/// Crates whose events follow the configured level; everything else is WARN.
const OWN_TARGETS: [&str; 4] = ["gcal_core", "gcal_google", "gcal_cli", "google_calendar"];

#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("invalid log filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// Log line layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    /// One short line per event
    #[default]
    Compact,
    /// One JSON object per line
    Json,
}

#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level for our own crates when `RUST_LOG` is unset
    pub level: Level,
    pub output_format: TracingOutputFormat,
    /// Show module path plus file and line
    pub verbose: bool,
    pub timestamps: bool,
    /// Explicit filter directive, used instead of `RUST_LOG`
    pub env_filter: Option<String>,
}

impl TracingConfig {
    /// Normal runs: warnings only, terse lines.
    #[must_use]
    pub fn cli() -> Self {
        Self {
            level: Level::WARN,
            output_format: TracingOutputFormat::Compact,
            verbose: false,
            timestamps: false,
            env_filter: None,
        }
    }

    /// `--debug`: request URLs, token refreshes and file writes.
    #[must_use]
    pub fn cli_debug() -> Self {
        Self {
            level: Level::DEBUG,
            verbose: true,
            ..Self::cli()
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.output_format = format;
        self
    }

    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    fn filter(&self) -> Result<EnvFilter, TracingError> {
        if let Some(directive) = &self.env_filter {
            return Ok(EnvFilter::try_new(directive)?);
        }
        Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive(self.level))))
    }

    fn layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let base = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(self.verbose)
            .with_file(self.verbose)
            .with_line_number(self.verbose);

        match (self.output_format, self.timestamps) {
            (TracingOutputFormat::Json, _) => base.json().boxed(),
            (TracingOutputFormat::Compact, true) => base.compact().boxed(),
            (TracingOutputFormat::Compact, false) => base.compact().without_time().boxed(),
        }
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::cli()
    }
}

/// Installs the global subscriber. Call once, before the first command runs.
///
/// # Errors
///
/// Fails when a subscriber is already installed or the filter directive does
/// not parse.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let filter = config.filter()?;
    let subscriber = tracing_subscriber::registry()
        .with(config.layer())
        .with(filter);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn default_directive(level: Level) -> String {
    let level = level.to_string().to_lowercase();
    let own: Vec<String> = OWN_TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect();
    format!("warn,{}", own.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_quiet() {
        let config = TracingConfig::cli();
        assert_eq!(config.level, Level::WARN);
        assert!(!config.verbose);
        assert!(!config.timestamps);
    }

    #[test]
    fn debug_keeps_cli_layout() {
        let config = TracingConfig::cli_debug();
        assert_eq!(config.level, Level::DEBUG);
        assert_eq!(config.output_format, TracingOutputFormat::Compact);
        assert!(config.verbose);
        assert!(!config.timestamps);
    }

    #[test]
    fn default_directive_scopes_own_crates() {
        let directive = default_directive(Level::DEBUG);
        assert!(directive.starts_with("warn,"));
        assert!(directive.contains("gcal_google=debug"));
        assert!(directive.contains("google_calendar=debug"));
        assert!(EnvFilter::try_new(directive).is_ok());
    }

    #[test]
    fn explicit_filter_is_validated() {
        let config = TracingConfig::cli().with_env_filter("gcal_google=trace");
        assert!(config.filter().is_ok());

        let bad = TracingConfig::cli().with_env_filter("gcal_google=loud");
        assert!(matches!(bad.filter(), Err(TracingError::EnvFilter(_))));
    }

    #[test]
    fn json_format_builds_a_layer() {
        let config = TracingConfig::cli().with_format(TracingOutputFormat::Json);
        let _layer = config.layer();
    }
}
