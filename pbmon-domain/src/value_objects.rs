//! Value Objects for PBMon Domain
//!
//! Immutable, validated domain primitives.
//! All value objects enforce invariants at construction time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Domain errors for value object validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Mode string is not one of the known operating modes
    #[error("Invalid mode: {0}")]
    InvalidMode(String),

    /// Instance name part is empty or would escape the instances directory
    #[error("Invalid instance name: {0}")]
    InvalidInstanceName(String),

    /// Credentials are incomplete
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),
}

// =============================================================================
// Mode
// =============================================================================

/// Operating mode of one side (long or short) of a trading instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Regular trading
    Normal,
    /// Close everything as fast as possible
    Panic,
    /// Finish open positions, open no new ones
    GracefulStop,
}

impl Mode {
    /// Wire form written into `instance.cfg`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Normal => "normal",
            Mode::Panic => "panic",
            Mode::GracefulStop => "graceful_stop",
        }
    }
}

impl FromStr for Mode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Mode::Normal),
            "panic" => Ok(Mode::Panic),
            "graceful_stop" => Ok(Mode::GracefulStop),
            other => Err(DomainError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// InstanceName
// =============================================================================

/// Name of a trading instance: `<user>_<symbol>_<market>`.
///
/// # Invariants
/// - No part is empty
/// - No part contains a path separator or `..`
///
/// The name doubles as a directory name under the instances directory, so
/// these rules keep remote commands from addressing arbitrary files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceName(String);

impl InstanceName {
    /// Build an instance name from its user, symbol and market parts.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidInstanceName` if any part is empty or unsafe
    pub fn from_parts(user: &str, symbol: &str, market: &str) -> Result<Self, DomainError> {
        for part in [user, symbol, market] {
            Self::validate_part(part)?;
        }
        Ok(Self(format!("{}_{}_{}", user, symbol, market)))
    }

    fn validate_part(part: &str) -> Result<(), DomainError> {
        if part.is_empty() {
            return Err(DomainError::InvalidInstanceName("empty part".to_string()));
        }
        if part.contains('/') || part.contains('\\') || part.contains("..") {
            return Err(DomainError::InvalidInstanceName(part.to_string()));
        }
        Ok(())
    }

    /// Get the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_wire_form() {
        assert_eq!(Mode::Normal.as_str(), "normal");
        assert_eq!(Mode::Panic.as_str(), "panic");
        assert_eq!(Mode::GracefulStop.as_str(), "graceful_stop");
        assert_eq!(Mode::GracefulStop.to_string(), "graceful_stop");
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("panic".parse::<Mode>().unwrap(), Mode::Panic);
        assert_eq!("graceful_stop".parse::<Mode>().unwrap(), Mode::GracefulStop);
        assert!(matches!("PANIC".parse::<Mode>(), Err(DomainError::InvalidMode(_))));
    }

    #[test]
    fn test_mode_serde() {
        let json = serde_json::to_string(&Mode::GracefulStop).unwrap();
        assert_eq!(json, "\"graceful_stop\"");
    }

    #[test]
    fn test_instance_name_joins_parts() {
        let name = InstanceName::from_parts("alice", "BTC", "binance").unwrap();
        assert_eq!(name.as_str(), "alice_BTC_binance");
        assert_eq!(name.to_string(), "alice_BTC_binance");
    }

    #[test]
    fn test_instance_name_rejects_empty_part() {
        let result = InstanceName::from_parts("alice", "", "binance");
        assert!(matches!(result, Err(DomainError::InvalidInstanceName(_))));
    }

    #[test]
    fn test_instance_name_rejects_traversal() {
        assert!(InstanceName::from_parts("..", "BTC", "binance").is_err());
        assert!(InstanceName::from_parts("alice", "a/b", "binance").is_err());
        assert!(InstanceName::from_parts("alice", "BTC", "x\\y").is_err());
    }
}
