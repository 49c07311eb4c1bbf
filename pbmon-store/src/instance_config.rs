//! Per-instance configuration files.
//!
//! Each trading instance keeps its settings in
//! `<instances-dir>/<instance>/instance.cfg`, a JSON object owned by the
//! trading UI. The daemon only ever touches the two mode keys; every other
//! key and the original key order are written back unchanged.

use std::path::{Path, PathBuf};

use pbmon_domain::{InstanceName, Mode};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::StoreError;

/// File name of an instance's configuration.
pub const INSTANCE_CONFIG_FILE: &str = "instance.cfg";

const LONG_MODE_KEY: &str = "_long_mode";
const SHORT_MODE_KEY: &str = "_short_mode";

/// Access to the instance configuration directory.
#[derive(Debug, Clone)]
pub struct InstanceConfigStore {
    root: PathBuf,
}

impl InstanceConfigStore {
    /// Store rooted at the instances directory (`<state-dir>/instances`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Instances directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of `instance`'s config file.
    pub fn config_path(&self, instance: &InstanceName) -> PathBuf {
        self.root.join(instance.as_str()).join(INSTANCE_CONFIG_FILE)
    }

    /// Whether `instance` has a config file.
    pub async fn exists(&self, instance: &InstanceName) -> bool {
        tokio::fs::try_exists(self.config_path(instance))
            .await
            .unwrap_or(false)
    }

    /// Load `instance`'s config as a JSON object.
    pub async fn load(&self, instance: &InstanceName) -> Result<Map<String, Value>, StoreError> {
        let path = self.config_path(instance);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::not_found("instance config", instance.as_str()));
            }
            Err(e) => return Err(StoreError::io(&path, e)),
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(StoreError::Deserialization(format!(
                "{} is not a JSON object",
                path.display()
            ))),
            Err(e) => Err(StoreError::Deserialization(format!("{}: {}", path.display(), e))),
        }
    }

    /// Overwrite both mode fields of `instance`.
    ///
    /// Returns `Ok(false)` if the instance has no config file, in which case
    /// nothing is written.
    pub async fn set_modes(
        &self,
        instance: &InstanceName,
        long_mode: Mode,
        short_mode: Mode,
    ) -> Result<bool, StoreError> {
        if !self.exists(instance).await {
            debug!(%instance, "Instance config not found");
            return Ok(false);
        }

        let mut config = self.load(instance).await?;
        config.insert(LONG_MODE_KEY.to_string(), Value::String(long_mode.to_string()));
        config.insert(SHORT_MODE_KEY.to_string(), Value::String(short_mode.to_string()));
        self.save(instance, &config).await?;

        info!(%instance, %long_mode, %short_mode, "Instance modes updated");
        Ok(true)
    }

    /// Write `config` with 4-space indentation.
    async fn save(&self, instance: &InstanceName, config: &Map<String, Value>) -> Result<(), StoreError> {
        let path = self.config_path(instance);

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        config
            .serialize(&mut ser)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        // Write next to the target and rename so readers never see half a file.
        let tmp = path.with_extension("cfg.tmp");
        tokio::fs::write(&tmp, &buf)
            .await
            .map_err(|e| StoreError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| StoreError::io(&path, e))
    }
}

// =============================================================================
// Tests
// =============================================================================
