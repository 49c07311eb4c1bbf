//! Collaborator port definitions.
//!
//! Ports define the interfaces for external services (collector, messaging).
//! Adapters implement these ports for specific services (Telegram, files, stub).

use async_trait::async_trait;

use pbmon_domain::{ErrorRecord, InstanceName, TelegramCredentials};

use crate::command::InboundCommand;
use crate::error::PortError;

// =============================================================================
// Remote Status
// =============================================================================

/// Port for the remote-status collector.
///
/// Implementations:
/// - `FileRemoteStatus` - Reads the collector's error snapshot from disk
/// - `StubRemoteStatus` - For testing (queued batches)
#[async_trait]
pub trait RemoteStatusPort: Send + Sync {
    /// Pull the latest status from the remote servers.
    async fn refresh(&self) -> Result<(), PortError>;

    /// Errors outstanding as of the last refresh, in collector order.
    async fn list_errors(&self) -> Result<Vec<ErrorRecord>, PortError>;
}

/// Port for re-activating an instance after its config changed.
#[async_trait]
pub trait ActivationPort: Send + Sync {
    /// Ask the local runner to reload `instance`.
    async fn activate_instance(&self, instance: &InstanceName) -> Result<(), PortError>;
}

// =============================================================================
// Messaging
// =============================================================================

/// Port for outbound alert delivery.
#[async_trait]
pub trait MessengerPort: Send + Sync {
    /// Deliver `text` (Markdown) to the configured chat.
    async fn send_message(&self, text: &str) -> Result<(), PortError>;
}

/// Port for inbound operator commands.
#[async_trait]
pub trait CommandPort: Send + Sync {
    /// Wait for the next batch of commands.
    ///
    /// May return an empty batch when the wait times out.
    async fn poll_commands(&self) -> Result<Vec<InboundCommand>, PortError>;

    /// Reply to a command in the chat it came from.
    async fn reply(&self, to: &InboundCommand, text: &str) -> Result<(), PortError>;
}

// =============================================================================
// Credentials
// =============================================================================

/// Source of messaging credentials.
pub trait CredentialsPort: Send + Sync {
    /// Current Telegram credentials, `None` while not configured.
    fn telegram(&self) -> Option<TelegramCredentials>;

    /// Whether messaging is configured.
    fn is_configured(&self) -> bool {
        self.telegram().is_some()
    }
}
