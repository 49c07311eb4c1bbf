//! File-based remote-status adapter.
//!
//! The collector that syncs status from the remote servers drops its current
//! list of outstanding errors into a JSON file. Each entry looks like:
//!
//! ```json
//! {"name": "alice_BTC_binance", "server": "vps1", "mem": ":red[91%]",
//!  "cpu": "12%", "error": "Exception", "traceback": "..."}
//! ```
//!
//! `name` is `offline` or `system` for server-level errors and the instance
//! name otherwise. Activation requests go the other way: one small JSON file
//! per request in the command directory, picked up by the local runner.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use pbmon_domain::{ErrorKind, ErrorRecord, InstanceName, SystemMetrics};
use pbmon_ports::{ActivationPort, PortError, RemoteStatusPort};

// =============================================================================
// Errors
// =============================================================================

/// Errors that can occur while reading the collector's files.
#[derive(Debug, Error)]
pub enum RemoteStatusError {
    /// File could not be read or written
    #[error("I/O error on {path}: {message}")]
    Io { path: PathBuf, message: String },

    /// File content is not a list of error records
    #[error("Failed to parse {path}: {message}")]
    ParseError { path: PathBuf, message: String },
}

impl RemoteStatusError {
    fn io(path: &Path, err: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

impl From<RemoteStatusError> for PortError {
    fn from(err: RemoteStatusError) -> Self {
        match err {
            RemoteStatusError::Io { .. } => PortError::Io(err.to_string()),
            RemoteStatusError::ParseError { .. } => PortError::InvalidResponse(err.to_string()),
        }
    }
}

// =============================================================================
// Wire format
// =============================================================================

/// One error entry as written by the collector.
#[derive(Debug, Clone, Deserialize)]
pub struct RawErrorRecord {
    /// `offline`, `system`, or the instance name
    pub name: String,
    /// Server the error was observed on
    pub server: String,
    /// Memory usage (string or number)
    #[serde(default)]
    pub mem: Option<Value>,
    /// CPU usage (string or number)
    #[serde(default)]
    pub cpu: Option<Value>,
    /// Swap usage (string or number)
    #[serde(default)]
    pub swap: Option<Value>,
    /// Disk usage (string or number)
    #[serde(default)]
    pub disk: Option<Value>,
    /// Error text
    #[serde(default)]
    pub error: Option<Value>,
    /// Traceback
    #[serde(default)]
    pub traceback: Option<Value>,
}

fn as_text(value: &Option<Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

impl From<RawErrorRecord> for ErrorRecord {
    fn from(raw: RawErrorRecord) -> Self {
        let metrics = SystemMetrics {
            mem: as_text(&raw.mem),
            cpu: as_text(&raw.cpu),
            swap: as_text(&raw.swap),
            disk: as_text(&raw.disk),
        };
        let metrics = (metrics != SystemMetrics::default()).then_some(metrics);

        match ErrorKind::from_collector_name(&raw.name) {
            ErrorKind::Offline => ErrorRecord::offline(raw.server),
            ErrorKind::System => ErrorRecord {
                metrics,
                ..ErrorRecord::system(raw.server, SystemMetrics::default())
            },
            ErrorKind::Instance => ErrorRecord::instance(
                raw.name,
                raw.server,
                metrics,
                as_text(&raw.error),
                as_text(&raw.traceback),
            ),
        }
    }
}

// =============================================================================
// File Remote Status
// =============================================================================

/// Remote status read from the collector's error snapshot.
pub struct FileRemoteStatus {
    /// Snapshot written by the collector
    errors_file: PathBuf,
    /// Where activation requests are dropped
    command_dir: PathBuf,
    /// Errors as of the last refresh
    current: RwLock<Vec<ErrorRecord>>,
}

impl FileRemoteStatus {
    /// Create an adapter.
    ///
    /// # Arguments
    ///
    /// * `errors_file` - Collector's error snapshot (missing = no errors)
    /// * `command_dir` - Directory for activation requests
    pub fn new(errors_file: impl Into<PathBuf>, command_dir: impl Into<PathBuf>) -> Self {
        Self {
            errors_file: errors_file.into(),
            command_dir: command_dir.into(),
            current: RwLock::new(Vec::new()),
        }
    }

    /// Path of the activation request for `instance`.
    pub fn activation_path(&self, instance: &InstanceName) -> PathBuf {
        self.command_dir.join(format!("activate_{}.json", instance))
    }

    async fn read_snapshot(&self) -> Result<Vec<ErrorRecord>, RemoteStatusError> {
        let raw = match tokio::fs::read_to_string(&self.errors_file).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(RemoteStatusError::io(&self.errors_file, e)),
        };

        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        let records: Vec<RawErrorRecord> =
            serde_json::from_str(&raw).map_err(|e| RemoteStatusError::ParseError {
                path: self.errors_file.clone(),
                message: e.to_string(),
            })?;

        Ok(records.into_iter().map(ErrorRecord::from).collect())
    }
}

#[async_trait]
impl RemoteStatusPort for FileRemoteStatus {
    async fn refresh(&self) -> Result<(), PortError> {
        let records = self.read_snapshot().await?;
        debug!(count = records.len(), path = %self.errors_file.display(), "Remote status refreshed");
        *self.current.write().await = records;
        Ok(())
    }

    async fn list_errors(&self) -> Result<Vec<ErrorRecord>, PortError> {
        Ok(self.current.read().await.clone())
    }
}

#[async_trait]
impl ActivationPort for FileRemoteStatus {
    async fn activate_instance(&self, instance: &InstanceName) -> Result<(), PortError> {
        tokio::fs::create_dir_all(&self.command_dir)
            .await
            .map_err(|e| RemoteStatusError::io(&self.command_dir, e))?;

        let path = self.activation_path(instance);
        let request = json!({
            "instance": instance.as_str(),
            "remote": false,
            "requested_at": Utc::now().to_rfc3339(),
        });
        let body = serde_json::to_vec_pretty(&request)
            .map_err(|e| PortError::InvalidResponse(e.to_string()))?;

        tokio::fs::write(&path, body)
            .await
            .map_err(|e| RemoteStatusError::io(&path, e))?;

        info!(%instance, path = %path.display(), "Activation requested");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
