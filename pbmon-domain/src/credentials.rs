//! Messaging Credentials
//!
//! Telegram bot token and target chat. The token is wiped from memory on
//! drop and never printed by `Debug`.

use crate::value_objects::DomainError;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Telegram bot credentials.
///
/// # Invariants
/// - `token` and `chat_id` are non-empty after trimming
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct TelegramCredentials {
    token: String,
    chat_id: String,
}

impl TelegramCredentials {
    /// Create credentials, rejecting blank values.
    pub fn new(token: impl Into<String>, chat_id: impl Into<String>) -> Result<Self, DomainError> {
        let token = token.into().trim().to_string();
        let chat_id = chat_id.into().trim().to_string();

        if token.is_empty() {
            return Err(DomainError::InvalidCredentials("telegram token is empty".to_string()));
        }
        if chat_id.is_empty() {
            return Err(DomainError::InvalidCredentials("telegram chat id is empty".to_string()));
        }

        Ok(Self { token, chat_id })
    }

    /// Bot token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Chat the daemon reports to and accepts commands from.
    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }
}

impl fmt::Debug for TelegramCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramCredentials")
            .field("token", &"***")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}
