//! PBMon Storage Layer
//!
//! Provides persistence for daemon settings and per-instance configuration.
//!
//! # Architecture
//!
//! - **SettingsStore trait**: `get(section, key)` / `set(section, key, value)`
//! - **TOML settings**: File-backed implementation (`pbmon.toml`)
//! - **In-memory settings**: Fast implementation for testing
//! - **Instance configs**: Read-modify-write of `instances/<name>/instance.cfg`
//!
//! # Usage
//!
//! ```rust,ignore
//! use pbmon_store::{SettingsStore, TomlSettings};
//!
//! let settings = TomlSettings::new("data/pbmon.toml");
//! settings.set("main", "telegram_chat_id", "42")?;
//! assert_eq!(settings.get("main", "telegram_chat_id")?, Some("42".to_string()));
//! ```

#![warn(clippy::all)]

// Modules
mod error;
mod instance_config;
mod memory;
mod settings;

// Re-exports
pub use error::StoreError;
pub use instance_config::{InstanceConfigStore, INSTANCE_CONFIG_FILE};
pub use memory::MemorySettings;
pub use settings::{SettingsStore, TomlSettings};
