//! Poll Loop: periodic error collection and alerting.
//!
//! Each iteration rotates the log file, then (if messaging is configured)
//! pulls a fresh error batch, feeds it through the [`AlertDeduplicator`] and
//! sends whatever is new. Failures are logged and the loop carries on.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use pbmon_engine::{AlertDeduplicator, AlertState};
use pbmon_ports::{CredentialsPort, MessengerPort, RemoteStatusPort};

use crate::error::{error_chain, DaemonResult};
use crate::logging::RotatingLogFile;

// =============================================================================
// Poll Loop
// =============================================================================

/// Interval-paced monitoring task. Owns the alert state.
pub struct PollLoop {
    remote: Arc<dyn RemoteStatusPort>,
    messenger: Arc<dyn MessengerPort>,
    credentials: Arc<dyn CredentialsPort>,
    dedup: AlertDeduplicator,
    interval: Duration,
    log_file: Option<RotatingLogFile>,
    log_max_bytes: u64,
}

impl PollLoop {
    /// Create a poll loop with empty alert state.
    pub fn new(
        remote: Arc<dyn RemoteStatusPort>,
        messenger: Arc<dyn MessengerPort>,
        credentials: Arc<dyn CredentialsPort>,
        interval: Duration,
    ) -> Self {
        Self {
            remote,
            messenger,
            credentials,
            dedup: AlertDeduplicator::new(),
            interval,
            log_file: None,
            log_max_bytes: u64::MAX,
        }
    }

    /// Rotate `log_file` each iteration once it reaches `max_bytes`.
    pub fn with_log_rotation(mut self, log_file: RotatingLogFile, max_bytes: u64) -> Self {
        self.log_file = Some(log_file);
        self.log_max_bytes = max_bytes;
        self
    }

    /// Identities announced so far.
    pub fn alert_state(&self) -> &AlertState {
        self.dedup.state()
    }

    /// One deduplication cycle against a fresh batch.
    ///
    /// Returns the message that was sent, if any.
    pub async fn run_cycle(&mut self) -> DaemonResult<Option<String>> {
        self.remote.refresh().await?;
        let batch = self.remote.list_errors().await?;
        debug!(count = batch.len(), "Errors collected");

        let Some(message) = self.dedup.process(&batch) else {
            return Ok(None);
        };

        info!(%message, "Send Message");
        self.messenger.send_message(&message).await?;
        Ok(Some(message))
    }

    /// One loop iteration without the trailing sleep.
    pub async fn tick(&mut self) -> DaemonResult<Option<String>> {
        if let Some(log_file) = &self.log_file {
            match log_file.rotate_if_needed(self.log_max_bytes) {
                Ok(true) => info!(path = %log_file.path().display(), "Log rotated"),
                Ok(false) => {}
                Err(e) => warn!(error = %e, "Log rotation failed"),
            }
        }

        if !self.credentials.is_configured() {
            debug!("Messaging not configured, skipping cycle");
            return Ok(None);
        }

        self.run_cycle().await
    }

    /// Run forever.
    pub async fn run(mut self) {
        info!(interval_secs = self.interval.as_secs(), "Poll loop started");
        loop {
            if let Err(e) = self.tick().await {
                error!(error = %error_chain(&e), "Poll cycle failed");
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pbmon_domain::{ErrorKind, ErrorRecord, TelegramCredentials};
    use pbmon_ports::{StaticCredentials, StubMessenger, StubRemoteStatus};
    use tempfile::TempDir;

    struct Harness {
        remote: Arc<StubRemoteStatus>,
        messenger: Arc<StubMessenger>,
        poll: PollLoop,
    }

    fn harness(credentials: StaticCredentials) -> Harness {
        let remote = Arc::new(StubRemoteStatus::new());
        let messenger = Arc::new(StubMessenger::new());
        let poll = PollLoop::new(
            remote.clone(),
            messenger.clone(),
            Arc::new(credentials),
            Duration::from_millis(1),
        );
        Harness {
            remote,
            messenger,
            poll,
        }
    }

    fn configured() -> StaticCredentials {
        StaticCredentials::new(TelegramCredentials::new("123:abc", "42").unwrap())
    }

    #[tokio::test]
    async fn test_offline_then_cleared() {
        let mut h = harness(configured());
        h.remote.push_batch(vec![ErrorRecord::offline("srv1")]);
        h.remote.push_batch(Vec::new());

        let sent = h.poll.tick().await.unwrap();
        assert_eq!(sent.as_deref(), Some("Server: *srv1* is offline\n"));
        assert_eq!(h.poll.alert_state().identities(ErrorKind::Offline), vec!["srv1"]);

        let sent = h.poll.tick().await.unwrap();
        assert_eq!(sent, None);
        assert!(h.poll.alert_state().is_empty());
        assert_eq!(h.messenger.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_same_batch_twice_sends_once() {
        let mut h = harness(configured());
        h.remote.push_batch(vec![ErrorRecord::offline("srv1")]);

        h.poll.tick().await.unwrap();
        h.poll.tick().await.unwrap();

        assert_eq!(h.remote.refresh_count(), 2);
        assert_eq!(h.messenger.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_unconfigured_skips_cycle() {
        let mut h = harness(StaticCredentials::none());
        h.remote.push_batch(vec![ErrorRecord::offline("srv1")]);

        assert_eq!(h.poll.tick().await.unwrap(), None);
        assert_eq!(h.remote.refresh_count(), 0);
        assert!(h.messenger.sent().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_failure_is_error_and_recovers() {
        let mut h = harness(configured());
        h.remote.push_batch(vec![ErrorRecord::offline("srv1")]);
        h.remote.set_fail_next(true);

        assert!(h.poll.tick().await.is_err());
        assert!(h.messenger.sent().is_empty());

        h.poll.tick().await.unwrap();
        assert_eq!(h.messenger.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_delivery_failure_is_error() {
        let mut h = harness(configured());
        h.remote.push_batch(vec![ErrorRecord::offline("srv1")]);
        h.messenger.set_fail_next(true);

        assert!(h.poll.tick().await.is_err());
        // Identity is already recorded; a lost message is not retried.
        assert!(h.poll.alert_state().contains(ErrorKind::Offline, "srv1"));
    }

    #[tokio::test]
    async fn test_tick_rotates_log() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("PBMon.log");
        std::fs::write(&path, "x".repeat(32)).unwrap();
        let log = RotatingLogFile::open(&path).unwrap();

        let h = harness(StaticCredentials::none());
        let mut poll = h.poll.with_log_rotation(log, 16);
        poll.tick().await.unwrap();

        assert!(dir.path().join("PBMon.log.old").exists());
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_run_survives_failures() {
        let h = harness(configured());
        h.remote.set_fail_next(true);
        h.remote.push_batch(vec![ErrorRecord::offline("srv1")]);
        let remote = h.remote.clone();
        let messenger = h.messenger.clone();

        let task = tokio::spawn(h.poll.run());
        for _ in 0..200 {
            if !messenger.sent().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        task.abort();

        assert!(remote.refresh_count() >= 2);
        assert_eq!(messenger.sent(), vec!["Server: *srv1* is offline\n"]);
    }
}
