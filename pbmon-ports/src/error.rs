//! Collaborator error types.

use thiserror::Error;

/// Errors returned by collaborator adapters.
#[derive(Debug, Clone, Error)]
pub enum PortError {
    /// Collaborator could not be reached
    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),

    /// Message or reply could not be delivered
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// Collaborator answered with something unreadable
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Credentials are missing
    #[error("Not configured: {0}")]
    NotConfigured(String),

    /// Local filesystem error
    #[error("I/O error: {0}")]
    Io(String),

    /// Timeout waiting for the collaborator
    #[error("Timeout: {0}")]
    Timeout(String),
}

impl From<std::io::Error> for PortError {
    fn from(err: std::io::Error) -> Self {
        PortError::Io(err.to_string())
    }
}
