//! Log of recent write operations (`calendar_history.json`).

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::write_private;
use crate::error::{ClientError, ClientResult};

/// Entries kept on disk; older ones are dropped.
pub const MAX_HISTORY_ENTRIES: usize = 100;

/// Kind of write recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Update,
    Delete,
    QuickAdd,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::QuickAdd => "quick_add",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub operation: Operation,
    pub event_id: String,
    pub calendar_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub account: String,
}

impl HistoryEntry {
    pub fn new(
        operation: Operation,
        event_id: impl Into<String>,
        calendar_id: impl Into<String>,
        account: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            operation,
            event_id: event_id.into(),
            calendar_id: calendar_id.into(),
            title: None,
            account: account.into(),
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryFile {
    #[serde(default)]
    operations: Vec<HistoryEntry>,
}

/// Append-only operation log, capped at [`MAX_HISTORY_ENTRIES`].
#[derive(Debug, Clone)]
pub struct History {
    path: PathBuf,
}

impl History {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> ClientResult<HistoryFile> {
        match fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                ClientError::config(format!(
                    "history file {} is corrupt: {}",
                    self.path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HistoryFile::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn append(&self, entry: HistoryEntry) -> ClientResult<()> {
        let mut file = self.read()?;
        file.operations.push(entry);
        if file.operations.len() > MAX_HISTORY_ENTRIES {
            let excess = file.operations.len() - MAX_HISTORY_ENTRIES;
            file.operations.drain(..excess);
        }
        write_private(&self.path, &serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }

    /// Records `entry` after a successful remote write; failures are only
    /// logged.
    pub fn record(&self, entry: HistoryEntry) {
        if let Err(e) = self.append(entry) {
            warn!("could not update history at {:?}: {}", self.path, e);
        }
    }

    /// Returns up to `limit` entries, most recent first.
    pub fn recent(&self, limit: usize) -> ClientResult<Vec<HistoryEntry>> {
        let file = self.read()?;
        Ok(file.operations.into_iter().rev().take(limit).collect())
    }
}
