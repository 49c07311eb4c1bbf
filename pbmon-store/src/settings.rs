//! Key-value settings store (Port) and its TOML file implementation.
//!
//! Sections map to TOML tables, keys to string values:
//!
//! ```toml
//! [main]
//! telegram_token = "123:abc"
//! telegram_chat_id = "42"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use toml::{Table, Value};
use tracing::debug;

use crate::error::StoreError;

/// Sectioned key-value settings.
pub trait SettingsStore: Send + Sync {
    /// Read a value; `Ok(None)` if the section or key is absent.
    fn get(&self, section: &str, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value, creating the section if needed.
    fn set(&self, section: &str, key: &str, value: &str) -> Result<(), StoreError>;
}

// =============================================================================
// TOML file settings
// =============================================================================

/// Settings persisted in a TOML file.
///
/// The file is re-read on every access so edits made by other tools are
/// picked up without a restart. A missing file reads as empty.
///
/// Access is synchronous `std::fs` I/O on a file of a few lines. Callers on
/// the async runtime only hit it while credentials are unset; once found
/// they are cached by the daemon.
#[derive(Debug, Clone)]
pub struct TomlSettings {
    path: PathBuf,
}

impl TomlSettings {
    /// Settings backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Table, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Table::new()),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };

        raw.parse::<Table>().map_err(|e| {
            StoreError::Deserialization(format!("{}: {}", self.path.display(), e))
        })
    }

    fn save(&self, table: &Table) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
            }
        }

        let rendered = toml::to_string_pretty(table)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        fs::write(&self.path, rendered).map_err(|e| StoreError::io(&self.path, e))
    }
}

impl SettingsStore for TomlSettings {
    fn get(&self, section: &str, key: &str) -> Result<Option<String>, StoreError> {
        let table = self.load()?;
        let value = table
            .get(section)
            .and_then(Value::as_table)
            .and_then(|section| section.get(key));

        Ok(value.map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }))
    }

    fn set(&self, section: &str, key: &str, value: &str) -> Result<(), StoreError> {
        let mut table = self.load()?;

        let entry = table
            .entry(section.to_string())
            .or_insert_with(|| Value::Table(Table::new()));
        let Value::Table(section_table) = entry else {
            return Err(StoreError::Deserialization(format!(
                "{}: [{}] is not a table",
                self.path.display(),
                section
            )));
        };
        section_table.insert(key.to_string(), Value::String(value.to_string()));

        self.save(&table)?;
        debug!(section, key, path = %self.path.display(), "Setting saved");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
