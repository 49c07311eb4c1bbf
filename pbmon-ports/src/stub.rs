//! Stub implementations for testing.
//!
//! These implementations simulate the collector and messaging channel
//! without touching the network or the filesystem.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use pbmon_domain::{ErrorRecord, InstanceName, TelegramCredentials};

use crate::command::InboundCommand;
use crate::error::PortError;
use crate::ports::{ActivationPort, CommandPort, CredentialsPort, MessengerPort, RemoteStatusPort};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// =============================================================================
// Stub Remote Status
// =============================================================================

/// Stub collector for testing.
///
/// Each `refresh` advances to the next queued batch; once the queue is
/// drained the last batch keeps being reported.
pub struct StubRemoteStatus {
    /// Batches still to be served
    queued: Mutex<VecDeque<Vec<ErrorRecord>>>,
    /// Batch visible to `list_errors`
    current: Mutex<Vec<ErrorRecord>>,
    /// Number of refresh calls
    refreshes: Mutex<usize>,
    /// Whether to simulate a failure on the next refresh
    fail_next: Mutex<bool>,
}

impl StubRemoteStatus {
    /// Create a collector reporting no errors.
    pub fn new() -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            current: Mutex::new(Vec::new()),
            refreshes: Mutex::new(0),
            fail_next: Mutex::new(false),
        }
    }

    /// Queue a batch to be served by a later refresh.
    pub fn push_batch(&self, batch: Vec<ErrorRecord>) {
        lock(&self.queued).push_back(batch);
    }

    /// Configure the next refresh to fail.
    pub fn set_fail_next(&self, fail: bool) {
        *lock(&self.fail_next) = fail;
    }

    /// Number of refresh calls seen so far.
    pub fn refresh_count(&self) -> usize {
        *lock(&self.refreshes)
    }

    fn should_fail(&self) -> bool {
        let mut fail_next = lock(&self.fail_next);
        let fail = *fail_next;
        *fail_next = false;
        fail
    }
}

impl Default for StubRemoteStatus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStatusPort for StubRemoteStatus {
    async fn refresh(&self) -> Result<(), PortError> {
        *lock(&self.refreshes) += 1;
        if self.should_fail() {
            return Err(PortError::Unavailable("Simulated collector failure".to_string()));
        }
        if let Some(batch) = lock(&self.queued).pop_front() {
            *lock(&self.current) = batch;
        }
        Ok(())
    }

    async fn list_errors(&self) -> Result<Vec<ErrorRecord>, PortError> {
        Ok(lock(&self.current).clone())
    }
}

// =============================================================================
// Stub Activation
// =============================================================================

/// Records activation requests.
#[derive(Default)]
pub struct StubActivation {
    activated: Mutex<Vec<InstanceName>>,
}

impl StubActivation {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Instances activated so far, in call order.
    pub fn activated(&self) -> Vec<InstanceName> {
        lock(&self.activated).clone()
    }
}

#[async_trait]
impl ActivationPort for StubActivation {
    async fn activate_instance(&self, instance: &InstanceName) -> Result<(), PortError> {
        tracing::debug!(%instance, "Stub: instance activated");
        lock(&self.activated).push(instance.clone());
        Ok(())
    }
}

// =============================================================================
// Stub Messenger
// =============================================================================

/// Records outbound messages.
#[derive(Default)]
pub struct StubMessenger {
    sent: Mutex<Vec<String>>,
    fail_next: Mutex<bool>,
}

impl StubMessenger {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages delivered so far.
    pub fn sent(&self) -> Vec<String> {
        lock(&self.sent).clone()
    }

    /// Configure the next send to fail.
    pub fn set_fail_next(&self, fail: bool) {
        *lock(&self.fail_next) = fail;
    }
}

#[async_trait]
impl MessengerPort for StubMessenger {
    async fn send_message(&self, text: &str) -> Result<(), PortError> {
        {
            let mut fail_next = lock(&self.fail_next);
            if *fail_next {
                *fail_next = false;
                return Err(PortError::Delivery("Simulated delivery failure".to_string()));
            }
        }
        lock(&self.sent).push(text.to_string());
        Ok(())
    }
}

// =============================================================================
// Stub Command Source
// =============================================================================

/// Serves queued command batches and records replies.
///
/// Once the queue is empty `poll_commands` waits forever, like a long poll
/// with no traffic.
#[derive(Default)]
pub struct StubCommandSource {
    queued: Mutex<VecDeque<Vec<InboundCommand>>>,
    replies: Mutex<Vec<(InboundCommand, String)>>,
}

impl StubCommandSource {
    /// Create a source with nothing queued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a batch of commands.
    pub fn push(&self, batch: Vec<InboundCommand>) {
        lock(&self.queued).push_back(batch);
    }

    /// Replies sent so far with the command they answer.
    pub fn replies(&self) -> Vec<(InboundCommand, String)> {
        lock(&self.replies).clone()
    }
}

#[async_trait]
impl CommandPort for StubCommandSource {
    async fn poll_commands(&self) -> Result<Vec<InboundCommand>, PortError> {
        let next = lock(&self.queued).pop_front();
        match next {
            Some(batch) => Ok(batch),
            None => std::future::pending().await,
        }
    }

    async fn reply(&self, to: &InboundCommand, text: &str) -> Result<(), PortError> {
        lock(&self.replies).push((to.clone(), text.to_string()));
        Ok(())
    }
}

// =============================================================================
// Static Credentials
// =============================================================================

/// Fixed credentials.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    credentials: Option<TelegramCredentials>,
}

impl StaticCredentials {
    /// Credentials that are always configured.
    pub fn new(credentials: TelegramCredentials) -> Self {
        Self {
            credentials: Some(credentials),
        }
    }

    /// Credentials that are never configured.
    pub fn none() -> Self {
        Self { credentials: None }
    }
}

impl CredentialsPort for StaticCredentials {
    fn telegram(&self) -> Option<TelegramCredentials> {
        self.credentials.clone()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stub_remote_status_serves_batches_in_order() {
        let status = StubRemoteStatus::new();
        status.push_batch(vec![ErrorRecord::offline("srv1")]);
        status.push_batch(Vec::new());

        status.refresh().await.unwrap();
        assert_eq!(status.list_errors().await.unwrap().len(), 1);

        status.refresh().await.unwrap();
        assert!(status.list_errors().await.unwrap().is_empty());

        // Drained queue keeps the last batch
        status.refresh().await.unwrap();
        assert!(status.list_errors().await.unwrap().is_empty());
        assert_eq!(status.refresh_count(), 3);
    }

    #[tokio::test]
    async fn test_stub_remote_status_simulated_failure() {
        let status = StubRemoteStatus::new();
        status.set_fail_next(true);

        assert!(status.refresh().await.is_err());
        assert!(status.refresh().await.is_ok());
    }

    #[tokio::test]
    async fn test_stub_messenger_records_and_fails() {
        let messenger = StubMessenger::new();
        messenger.set_fail_next(true);

        assert!(messenger.send_message("first").await.is_err());
        messenger.send_message("second").await.unwrap();

        assert_eq!(messenger.sent(), vec!["second"]);
    }

    #[tokio::test]
    async fn test_stub_activation_records() {
        let activation = StubActivation::new();
        let name = InstanceName::from_parts("alice", "BTC", "binance").unwrap();

        activation.activate_instance(&name).await.unwrap();

        assert_eq!(activation.activated(), vec![name]);
    }

    #[tokio::test]
    async fn test_stub_command_source_replies() {
        let source = StubCommandSource::new();
        let cmd = InboundCommand::parse("42", 1, "/help").unwrap();
        source.push(vec![cmd.clone()]);

        let batch = source.poll_commands().await.unwrap();
        assert_eq!(batch, vec![cmd.clone()]);

        source.reply(&cmd, "ok").await.unwrap();
        assert_eq!(source.replies(), vec![(cmd, "ok".to_string())]);
    }

    #[test]
    fn test_static_credentials() {
        let creds = TelegramCredentials::new("123:abc", "42").unwrap();
        assert!(StaticCredentials::new(creds).is_configured());
        assert!(!StaticCredentials::none().is_configured());
    }
}
