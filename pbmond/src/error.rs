//! Daemon error types.

use pbmon_domain::DomainError;
use pbmon_ports::PortError;
use pbmon_store::StoreError;
use thiserror::Error;

/// Daemon-level errors.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Domain error
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Collaborator error (collector, messaging, activation)
    #[error("Port error: {0}")]
    Port(#[from] PortError),

    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Filesystem or process error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Another daemon owns the pid file
    #[error("Already running with pid {0}")]
    AlreadyRunning(u32),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for daemon operations.
pub type DaemonResult<T> = Result<T, DaemonError>;

/// Render `err` followed by each distinct cause, separated by `: `.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        // `#[from]` variants already embed their source's message.
        if !out.contains(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = cause.source();
    }
    out
}

// =============================================================================
// Tests
// =============================================================================
