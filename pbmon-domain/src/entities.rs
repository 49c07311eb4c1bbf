//! Domain Entities for PBMon
//!
//! Error records reported by the remote-status collector.
//! A record is produced fresh on every poll and never persisted.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Error Kind
// =============================================================================

/// Category of a reported error. Each kind has its own deduplication set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A server stopped reporting
    Offline,
    /// A server is running out of memory, cpu, swap or disk
    System,
    /// A single trading instance failed
    Instance,
}

impl ErrorKind {
    /// Classify a collector error name.
    ///
    /// `offline` and `system` are reserved; any other name is an instance.
    pub fn from_collector_name(name: &str) -> Self {
        match name {
            "offline" => ErrorKind::Offline,
            "system" => ErrorKind::System,
            _ => ErrorKind::Instance,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Offline => write!(f, "offline"),
            ErrorKind::System => write!(f, "system"),
            ErrorKind::Instance => write!(f, "instance"),
        }
    }
}

// =============================================================================
// System Metrics
// =============================================================================

/// Resource usage snapshot attached to system and instance errors.
///
/// Values are pre-formatted by the collector and may carry color markers
/// such as `:red[95%]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemMetrics {
    /// Memory usage
    pub mem: Option<String>,
    /// CPU usage
    pub cpu: Option<String>,
    /// Swap usage
    pub swap: Option<String>,
    /// Disk usage
    pub disk: Option<String>,
}

// =============================================================================
// Error Record
// =============================================================================

/// One error condition reported by the remote-status collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Which deduplication set this record belongs to
    pub kind: ErrorKind,
    /// Deduplication key: server name for offline/system, instance name otherwise
    pub identity: String,
    /// Server the error was observed on
    pub server: String,
    /// Resource metrics, if the collector supplied them
    pub metrics: Option<SystemMetrics>,
    /// Error text (instance errors)
    pub error: Option<String>,
    /// Traceback (instance errors)
    pub traceback: Option<String>,
}

impl ErrorRecord {
    /// A server that stopped reporting.
    pub fn offline(server: impl Into<String>) -> Self {
        let server = server.into();
        Self {
            kind: ErrorKind::Offline,
            identity: server.clone(),
            server,
            metrics: None,
            error: None,
            traceback: None,
        }
    }

    /// A server over its resource limits.
    pub fn system(server: impl Into<String>, metrics: SystemMetrics) -> Self {
        let server = server.into();
        Self {
            kind: ErrorKind::System,
            identity: server.clone(),
            server,
            metrics: Some(metrics),
            error: None,
            traceback: None,
        }
    }

    /// A failing trading instance.
    pub fn instance(
        name: impl Into<String>,
        server: impl Into<String>,
        metrics: Option<SystemMetrics>,
        error: Option<String>,
        traceback: Option<String>,
    ) -> Self {
        Self {
            kind: ErrorKind::Instance,
            identity: name.into(),
            server: server.into(),
            metrics,
            error,
            traceback,
        }
    }

    fn metric(&self, pick: impl Fn(&SystemMetrics) -> Option<&String>) -> Option<&str> {
        self.metrics.as_ref().and_then(pick).map(String::as_str)
    }

    /// Memory usage, if reported
    pub fn mem(&self) -> Option<&str> {
        self.metric(|m| m.mem.as_ref())
    }

    /// CPU usage, if reported
    pub fn cpu(&self) -> Option<&str> {
        self.metric(|m| m.cpu.as_ref())
    }

    /// Swap usage, if reported
    pub fn swap(&self) -> Option<&str> {
        self.metric(|m| m.swap.as_ref())
    }

    /// Disk usage, if reported
    pub fn disk(&self) -> Option<&str> {
        self.metric(|m| m.disk.as_ref())
    }
}

// =============================================================================
// Tests
// =============================================================================
