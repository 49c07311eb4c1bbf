//! Daemon: Main runtime orchestrator.
//!
//! The Daemon ties together the two long-lived tasks:
//! - Poll Loop (error collection, deduplication, alerts)
//! - Command Channel (operator commands, only when messaging is configured)
//!
//! # Lifecycle
//!
//! 1. Load configuration
//! 2. Claim the pid file (see `LifecycleGuard::acquire`)
//! 3. Wire adapters
//! 4. Run both tasks on the current thread until the process is killed

use std::sync::Arc;

use tracing::info;

use pbmon_connectors::{FileRemoteStatus, TelegramClient};
use pbmon_ports::CredentialsPort;
use pbmon_store::{InstanceConfigStore, TomlSettings};

use crate::commands::CommandChannel;
use crate::config::Config;
use crate::credentials::SettingsCredentials;
use crate::logging::RotatingLogFile;
use crate::monitor::PollLoop;

// =============================================================================
// Daemon
// =============================================================================

/// The main PBMon daemon.
pub struct Daemon {
    /// Alerting task
    poll: PollLoop,
    /// Operator command task
    commands: CommandChannel,
    /// Decides whether the command channel runs
    credentials: Arc<dyn CredentialsPort>,
}

impl Daemon {
    /// Create a daemon from already wired tasks.
    pub fn new(poll: PollLoop, commands: CommandChannel, credentials: Arc<dyn CredentialsPort>) -> Self {
        Self {
            poll,
            commands,
            credentials,
        }
    }

    /// Wire the production adapters described by `config`.
    pub fn from_config(config: &Config, log_file: Option<RotatingLogFile>) -> Self {
        let credentials: Arc<dyn CredentialsPort> = Arc::new(SettingsCredentials::new(
            TomlSettings::new(&config.settings_file),
        ));
        let telegram = Arc::new(TelegramClient::new(
            config.telegram_api_url.clone(),
            credentials.clone(),
        ));
        let remote = Arc::new(FileRemoteStatus::new(
            &config.remote_errors_file,
            config.command_dir(),
        ));

        let mut poll = PollLoop::new(
            remote.clone(),
            telegram.clone(),
            credentials.clone(),
            config.poll_interval,
        );
        if let Some(log_file) = log_file {
            poll = poll.with_log_rotation(log_file, config.log_max_bytes);
        }

        let commands = CommandChannel::new(
            telegram,
            remote,
            credentials.clone(),
            InstanceConfigStore::new(config.instances_dir()),
        );

        Self::new(poll, commands, credentials)
    }

    /// Run until the process is killed.
    pub async fn run(self) {
        info!(version = env!("CARGO_PKG_VERSION"), "Starting PBMon daemon");

        let Self {
            poll,
            commands,
            credentials,
        } = self;

        let command_task = async move {
            if credentials.is_configured() {
                commands.run().await;
            } else {
                info!("Messaging not configured, command channel disabled");
            }
        };

        tokio::join!(poll.run(), command_task);
    }
}
