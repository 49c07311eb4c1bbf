//! Telegram Bot API Client
//!
//! Provides Bot API integration for:
//! - Delivering alert messages (`sendMessage`, Markdown)
//! - Receiving operator commands by long polling (`getUpdates`)
//!
//! # Authentication
//!
//! The bot token is part of every method URL: `{api}/bot{token}/{method}`.
//! Credentials are looked up on every call so a token configured while the
//! daemon runs is picked up without a restart. Transport errors are stripped
//! of their URL before they are logged or returned, keeping the token out of
//! the log file.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, warn};

use pbmon_domain::TelegramCredentials;
use pbmon_ports::{CommandPort, CredentialsPort, InboundCommand, MessengerPort, PortError};

// =============================================================================
// Constants
// =============================================================================

/// Telegram Bot API base URL
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Long poll duration in seconds
const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;

/// Telegram rejects messages whose Markdown it cannot parse with this text.
const MARKDOWN_PARSE_ERROR: &str = "can't parse entities";

// =============================================================================
// Errors
// =============================================================================

/// Errors that can occur in the Telegram client.
#[derive(Debug, Clone, Error)]
pub enum TelegramError {
    /// Token or chat id missing
    #[error("Telegram is not configured")]
    NotConfigured,

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    /// API returned error
    #[error("Telegram API error: {code} - {description}")]
    ApiError { code: i64, description: String },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Request timed out
    #[error("Request timed out")]
    Timeout,
}

impl TelegramError {
    fn is_markdown_rejection(&self) -> bool {
        matches!(self, TelegramError::ApiError { code: 400, description } if description.contains(MARKDOWN_PARSE_ERROR))
    }
}

impl From<TelegramError> for PortError {
    fn from(err: TelegramError) -> Self {
        match err {
            TelegramError::NotConfigured => PortError::NotConfigured(err.to_string()),
            TelegramError::Timeout => PortError::Timeout(err.to_string()),
            TelegramError::RequestFailed(_) => PortError::Unavailable(err.to_string()),
            TelegramError::ApiError { .. } => PortError::Delivery(err.to_string()),
            TelegramError::ParseError(_) => PortError::InvalidResponse(err.to_string()),
        }
    }
}

// =============================================================================
// Wire types
// =============================================================================

/// Envelope of every Bot API response.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    error_code: Option<i64>,
    description: Option<String>,
}

/// One entry of `getUpdates`.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    /// Monotonic update id
    pub update_id: i64,
    /// New incoming message, if this update carries one
    pub message: Option<Message>,
}

/// Incoming message.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    /// Message id within the chat
    pub message_id: i64,
    /// Chat the message was posted in
    pub chat: Chat,
    /// Text, absent for stickers, photos and the like
    pub text: Option<String>,
}

/// Chat reference.
#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    /// Chat id (negative for groups)
    pub id: i64,
}

/// Extract slash commands from a batch of updates.
pub fn commands_from_updates(updates: &[Update]) -> Vec<InboundCommand> {
    updates
        .iter()
        .filter_map(|update| update.message.as_ref())
        .filter_map(|message| {
            let text = message.text.as_deref()?;
            InboundCommand::parse(message.chat.id.to_string(), message.message_id, text)
        })
        .collect()
}

// =============================================================================
// Telegram Client
// =============================================================================

/// Telegram Bot API client.
pub struct TelegramClient {
    /// HTTP client
    client: Client,
    /// Base URL, without trailing slash
    api_url: String,
    /// Token and chat id source
    credentials: Arc<dyn CredentialsPort>,
    /// Next `getUpdates` offset (last seen update id + 1)
    next_offset: AtomicI64,
    /// Long poll duration
    poll_timeout_secs: u64,
}

impl TelegramClient {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `api_url` - Bot API base URL (normally [`DEFAULT_TELEGRAM_API_URL`])
    /// * `credentials` - Where to read the token and chat id from
    pub fn new(api_url: impl Into<String>, credentials: Arc<dyn CredentialsPort>) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            credentials,
            next_offset: AtomicI64::new(0),
            poll_timeout_secs: DEFAULT_POLL_TIMEOUT_SECS,
        }
    }

    /// Override the long poll duration.
    pub fn with_poll_timeout(mut self, secs: u64) -> Self {
        self.poll_timeout_secs = secs;
        self
    }

    fn credentials(&self) -> Result<TelegramCredentials, TelegramError> {
        self.credentials.telegram().ok_or(TelegramError::NotConfigured)
    }

    fn method_url(&self, token: &str, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, token, method)
    }

    /// Call a Bot API method with a JSON body.
    async fn call<T: DeserializeOwned>(
        &self,
        token: &str,
        method: &str,
        body: &Value,
        wait: Duration,
    ) -> Result<T, TelegramError> {
        let url = self.method_url(token, method);

        let response = timeout(wait, self.client.post(&url).json(body).send())
            .await
            .map_err(|_| TelegramError::Timeout)?
            .map_err(|e| TelegramError::RequestFailed(e.without_url().to_string()))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| TelegramError::ParseError(e.without_url().to_string()))?;

        let parsed: ApiResponse<T> = serde_json::from_str(&raw).map_err(|e| {
            TelegramError::ParseError(format!("HTTP {}: {}", status, e))
        })?;

        if !parsed.ok {
            return Err(TelegramError::ApiError {
                code: parsed.error_code.unwrap_or_else(|| i64::from(status.as_u16())),
                description: parsed.description.unwrap_or_default(),
            });
        }

        parsed
            .result
            .ok_or_else(|| TelegramError::ParseError(format!("{} returned no result", method)))
    }

    // =========================================================================
    // Messages
    // =========================================================================

    /// Send `text` to `chat_id`, optionally as a reply.
    ///
    /// Markdown is tried first; if Telegram cannot parse it (tracebacks often
    /// contain stray `*` or `_`) the text is resent without formatting.
    ///
    /// # Endpoint
    ///
    /// `POST /bot{token}/sendMessage`
    pub async fn send_text(
        &self,
        chat_id: &str,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<(), TelegramError> {
        let creds = self.credentials()?;
        let wait = Duration::from_secs(REQUEST_TIMEOUT_SECS);

        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown",
        });
        if let Some(message_id) = reply_to {
            body["reply_to_message_id"] = json!(message_id);
        }

        match self.call::<Value>(creds.token(), "sendMessage", &body, wait).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_markdown_rejection() => {
                warn!(error = %e, "Markdown rejected, resending as plain text");
                if let Some(fields) = body.as_object_mut() {
                    fields.remove("parse_mode");
                }
                self.call::<Value>(creds.token(), "sendMessage", &body, wait)
                    .await
                    .map(|_| ())
            }
            Err(e) => Err(e),
        }
    }

    // =========================================================================
    // Updates
    // =========================================================================

    /// Long poll for new updates and advance the offset past them.
    ///
    /// # Endpoint
    ///
    /// `POST /bot{token}/getUpdates`
    pub async fn get_updates(&self) -> Result<Vec<Update>, TelegramError> {
        let creds = self.credentials()?;
        let body = json!({
            "offset": self.next_offset.load(Ordering::SeqCst),
            "timeout": self.poll_timeout_secs,
            "allowed_updates": ["message"],
        });
        let wait = Duration::from_secs(self.poll_timeout_secs + REQUEST_TIMEOUT_SECS);

        let updates: Vec<Update> = self.call(creds.token(), "getUpdates", &body, wait).await?;

        if let Some(last) = updates.iter().map(|u| u.update_id).max() {
            self.next_offset.store(last + 1, Ordering::SeqCst);
        }
        debug!(count = updates.len(), "Received updates");

        Ok(updates)
    }

    /// Offset that will be sent with the next `getUpdates`.
    pub fn next_offset(&self) -> i64 {
        self.next_offset.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessengerPort for TelegramClient {
    async fn send_message(&self, text: &str) -> Result<(), PortError> {
        let creds = self.credentials()?;
        self.send_text(creds.chat_id(), text, None).await?;
        Ok(())
    }
}

#[async_trait]
impl CommandPort for TelegramClient {
    async fn poll_commands(&self) -> Result<Vec<InboundCommand>, PortError> {
        let updates = self.get_updates().await?;
        Ok(commands_from_updates(&updates))
    }

    async fn reply(&self, to: &InboundCommand, text: &str) -> Result<(), PortError> {
        self.send_text(&to.chat_id, text, Some(to.message_id)).await?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
