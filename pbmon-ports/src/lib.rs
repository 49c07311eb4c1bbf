//! PBMon Collaborator Ports
//!
//! Interfaces for everything the daemon talks to but does not own.
//!
//! # Architecture
//!
//! ```text
//! Poll Loop       → RemoteStatusPort → AlertDeduplicator → MessengerPort
//! Command Channel → CommandPort → instance.cfg → ActivationPort
//!                        ↑
//!                 CredentialsPort (token, chat id)
//! ```
//!
//! # Components
//!
//! - **Ports**: Traits for the remote-status collector, messaging and credentials
//! - **Commands**: Transport-neutral inbound command type
//! - **Stub**: In-memory implementations for tests and development
//!
//! # Example
//!
//! ```rust,ignore
//! use pbmon_ports::{MessengerPort, StubMessenger};
//!
//! let messenger = StubMessenger::new();
//! messenger.send_message("Server: *srv1* is offline\n").await?;
//! assert_eq!(messenger.sent().len(), 1);
//! ```

#![warn(clippy::all)]

pub mod command;
pub mod error;
pub mod ports;
pub mod stub;

// Re-exports for convenience
pub use command::InboundCommand;
pub use error::PortError;
pub use ports::{ActivationPort, CommandPort, CredentialsPort, MessengerPort, RemoteStatusPort};
pub use stub::{
    StaticCredentials, StubActivation, StubCommandSource, StubMessenger, StubRemoteStatus,
};
