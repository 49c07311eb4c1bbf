//! In-memory settings implementation
//!
//! Used for testing and development without a settings file.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::StoreError;
use crate::settings::SettingsStore;

/// In-memory settings for testing
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: RwLock<HashMap<(String, String), String>>,
    writes: RwLock<usize>,
}

impl MemorySettings {
    /// Create empty settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create settings pre-filled with `(section, key, value)` entries
    pub fn with_values<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str, &'a str)>) -> Self {
        let settings = Self::new();
        {
            let mut values = settings.values.write().unwrap_or_else(|e| e.into_inner());
            for (section, key, value) in entries {
                values.insert((section.to_string(), key.to_string()), value.to_string());
            }
        }
        settings
    }

    /// Number of `set` calls so far
    pub fn write_count(&self) -> usize {
        *self.writes.read().unwrap_or_else(|e| e.into_inner())
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, section: &str, key: &str) -> Result<Option<String>, StoreError> {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(&(section.to_string(), key.to_string())).cloned())
    }

    fn set(&self, section: &str, key: &str, value: &str) -> Result<(), StoreError> {
        self.values
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert((section.to_string(), key.to_string()), value.to_string());
        *self.writes.write().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }
}
