//! PBMon Collaborator Connectors
//!
//! Adapters for the messaging channel and the remote-status collector.
//! Normalizes collaborator-specific payloads to domain types.

#![warn(clippy::all)]

// Public modules
pub mod remote_status;
pub mod telegram;

// Re-exports
pub use remote_status::{FileRemoteStatus, RawErrorRecord, RemoteStatusError};
pub use telegram::{TelegramClient, TelegramError, DEFAULT_TELEGRAM_API_URL};
