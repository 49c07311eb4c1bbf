//! PBMon Domain Layer
//!
//! Pure domain types with zero I/O dependencies.
//! Contains the error records reported by the fleet, instance identities,
//! operating modes and messaging credentials.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Public modules
pub mod credentials;
pub mod entities;
pub mod value_objects;

// Re-export commonly used types
pub use credentials::TelegramCredentials;
pub use entities::{ErrorKind, ErrorRecord, SystemMetrics};
pub use value_objects::{DomainError, InstanceName, Mode};
