//! Reusable event templates stored as `templates/<name>.json`.
//!
//! String fields may contain `{{var}}` placeholders, filled in from
//! `--var key=value` at creation time. Placeholders without a value are left
//! as they are.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::write_private;
use crate::error::{ClientError, ClientResult};

/// Duration used when neither `--end` nor a template gives one.
pub const DEFAULT_DURATION_MINUTES: u32 = 60;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_.-]+)\s*\}\}").expect("Invalid placeholder regex")
});

/// Template variables, `name -> value`.
pub type TemplateVars = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventTemplate {
    pub title: String,
    pub description: String,
    pub location: String,
    pub duration_minutes: u32,
    pub attendees: Vec<String>,
}

impl Default for EventTemplate {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            location: String::new(),
            duration_minutes: DEFAULT_DURATION_MINUTES,
            attendees: Vec::new(),
        }
    }
}

impl EventTemplate {
    /// Substitutes `{{var}}` in every string field.
    pub fn render(&self, vars: &TemplateVars) -> Self {
        Self {
            title: substitute(&self.title, vars),
            description: substitute(&self.description, vars),
            location: substitute(&self.location, vars),
            duration_minutes: self.duration_minutes,
            attendees: self.attendees.iter().map(|a| substitute(a, vars)).collect(),
        }
    }

    /// Placeholder names used anywhere in the template, sorted.
    pub fn placeholders(&self) -> Vec<String> {
        let fields = [&self.title, &self.description, &self.location]
            .into_iter()
            .chain(self.attendees.iter());
        let mut names: Vec<String> = fields
            .flat_map(|s| PLACEHOLDER.captures_iter(s).map(|c| c[1].to_string()))
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

fn substitute(text: &str, vars: &TemplateVars) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &Captures<'_>| match vars.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Parses `key=value` pairs from `--var`.
pub fn parse_vars<S: AsRef<str>>(pairs: &[S]) -> ClientResult<TemplateVars> {
    pairs
        .iter()
        .map(|pair| {
            let pair = pair.as_ref();
            match pair.split_once('=') {
                Some((key, value)) if !key.trim().is_empty() => {
                    Ok((key.trim().to_string(), value.to_string()))
                }
                _ => Err(ClientError::validation(format!(
                    "template variable must be key=value, got '{}'",
                    pair
                ))),
            }
        })
        .collect()
}

/// Directory of `<name>.json` template files.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    dir: PathBuf,
}

impl TemplateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> ClientResult<PathBuf> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(ClientError::validation(format!(
                "invalid template name '{}' (use letters, digits, - and _)",
                name
            )));
        }
        Ok(self.dir.join(format!("{}.json", name)))
    }

    /// All readable templates, sorted by name. Unreadable files are skipped.
    pub fn list(&self) -> ClientResult<Vec<(String, EventTemplate)>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut templates = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match read_template(&path) {
                Ok(template) => templates.push((name.to_string(), template)),
                Err(e) => warn!("skipping template {:?}: {}", path, e),
            }
        }
        templates.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(templates)
    }

    pub fn get(&self, name: &str) -> ClientResult<EventTemplate> {
        let path = self.path_for(name)?;
        if !path.is_file() {
            return Err(ClientError::validation(format!("template '{}' not found", name)));
        }
        read_template(&path)
    }

    pub fn save(&self, name: &str, template: &EventTemplate) -> ClientResult<PathBuf> {
        let path = self.path_for(name)?;
        write_private(&path, &serde_json::to_string_pretty(template)?)?;
        debug!("saved template {:?}", path);
        Ok(path)
    }

    /// Removes a template. Returns `false` when it did not exist.
    pub fn delete(&self, name: &str) -> ClientResult<bool> {
        let path = self.path_for(name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn read_template(path: &Path) -> ClientResult<EventTemplate> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
