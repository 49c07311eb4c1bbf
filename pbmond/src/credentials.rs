//! Messaging credentials backed by the settings store.
//!
//! Values are read lazily: while a value is empty the store is consulted on
//! every access, so Telegram can be configured without a restart. Once a
//! value is found it is cached for the lifetime of the process.

use std::sync::RwLock;

use pbmon_domain::TelegramCredentials;
use pbmon_ports::CredentialsPort;
use pbmon_store::SettingsStore;
use tracing::{info, warn};

use crate::error::DaemonResult;

/// Settings section holding the credentials.
pub const SETTINGS_SECTION: &str = "main";
/// Bot token key.
pub const TOKEN_KEY: &str = "telegram_token";
/// Chat id key.
pub const CHAT_ID_KEY: &str = "telegram_chat_id";

/// Credentials cache over a [`SettingsStore`].
pub struct SettingsCredentials<S: SettingsStore> {
    store: S,
    token: RwLock<Option<String>>,
    chat_id: RwLock<Option<String>>,
}

impl<S: SettingsStore> SettingsCredentials<S> {
    /// Wrap `store`. Nothing is read until first access.
    pub fn new(store: S) -> Self {
        Self {
            store,
            token: RwLock::new(None),
            chat_id: RwLock::new(None),
        }
    }

    /// Underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn cached(&self, slot: &RwLock<Option<String>>, key: &str) -> Option<String> {
        if let Some(value) = slot.read().unwrap_or_else(|e| e.into_inner()).clone() {
            return Some(value);
        }

        let value = match self.store.get(SETTINGS_SECTION, key) {
            Ok(value) => value?,
            Err(e) => {
                warn!(key, error = %e, "Failed to read setting");
                return None;
            }
        };
        let value = value.trim().to_string();
        if value.is_empty() {
            return None;
        }

        *slot.write().unwrap_or_else(|e| e.into_inner()) = Some(value.clone());
        Some(value)
    }

    fn update(&self, slot: &RwLock<Option<String>>, key: &str, value: &str) -> DaemonResult<()> {
        let value = value.trim();
        if self.cached(slot, key).as_deref() == Some(value) {
            return Ok(());
        }

        self.store.set(SETTINGS_SECTION, key, value)?;
        *slot.write().unwrap_or_else(|e| e.into_inner()) =
            (!value.is_empty()).then(|| value.to_string());
        info!(key, "Setting updated");
        Ok(())
    }

    /// Bot token, if configured.
    pub fn token(&self) -> Option<String> {
        self.cached(&self.token, TOKEN_KEY)
    }

    /// Chat id, if configured.
    pub fn chat_id(&self) -> Option<String> {
        self.cached(&self.chat_id, CHAT_ID_KEY)
    }

    /// Persist a new bot token. Unchanged values are not written.
    pub fn set_token(&self, token: &str) -> DaemonResult<()> {
        self.update(&self.token, TOKEN_KEY, token)
    }

    /// Persist a new chat id. Unchanged values are not written.
    pub fn set_chat_id(&self, chat_id: &str) -> DaemonResult<()> {
        self.update(&self.chat_id, CHAT_ID_KEY, chat_id)
    }
}

impl<S: SettingsStore> CredentialsPort for SettingsCredentials<S> {
    fn telegram(&self) -> Option<TelegramCredentials> {
        let token = self.token()?;
        let chat_id = self.chat_id()?;
        TelegramCredentials::new(token, chat_id).ok()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pbmon_store::MemorySettings;

    #[test]
    fn test_unconfigured() {
        let creds = SettingsCredentials::new(MemorySettings::new());

        assert_eq!(creds.token(), None);
        assert!(!creds.is_configured());
    }

    #[test]
    fn test_reads_from_store() {
        let creds = SettingsCredentials::new(MemorySettings::with_values([
            ("main", "telegram_token", "123:abc"),
            ("main", "telegram_chat_id", "42"),
        ]));

        let telegram = creds.telegram().unwrap();
        assert_eq!(telegram.token(), "123:abc");
        assert_eq!(telegram.chat_id(), "42");
    }

    #[test]
    fn test_empty_value_is_reread() {
        let creds = SettingsCredentials::new(MemorySettings::with_values([
            ("main", "telegram_token", ""),
        ]));
        assert_eq!(creds.token(), None);

        // Configured behind our back
        creds.store().set("main", "telegram_token", "123:abc").unwrap();
        assert_eq!(creds.token(), Some("123:abc".to_string()));
    }

    #[test]
    fn test_value_is_cached_once_set() {
        let creds = SettingsCredentials::new(MemorySettings::with_values([
            ("main", "telegram_chat_id", "42"),
        ]));
        assert_eq!(creds.chat_id(), Some("42".to_string()));

        creds.store().set("main", "telegram_chat_id", "99").unwrap();
        assert_eq!(creds.chat_id(), Some("42".to_string()));
    }

    #[test]
    fn test_setter_persists_only_on_change() {
        let creds = SettingsCredentials::new(MemorySettings::new());

        creds.set_token("123:abc").unwrap();
        assert_eq!(creds.store().write_count(), 1);
        assert_eq!(
            creds.store().get("main", "telegram_token").unwrap(),
            Some("123:abc".to_string())
        );

        creds.set_token("123:abc").unwrap();
        assert_eq!(creds.store().write_count(), 1);

        creds.set_token("456:def").unwrap();
        assert_eq!(creds.store().write_count(), 2);
        assert_eq!(creds.token(), Some("456:def".to_string()));
    }
}
