//! Command Channel: operator commands from the messaging channel.
//!
//! Supported commands:
//! - `/panic <user> <symbol> <market>`
//! - `/normal <user> <symbol> <market>`
//! - `/graceful_stop <user> <symbol> <market>`
//! - `/help`
//!
//! Mode commands rewrite both mode fields of the instance config and ask the
//! local runner to reactivate the instance.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use pbmon_domain::{InstanceName, Mode};
use pbmon_ports::{ActivationPort, CommandPort, CredentialsPort, InboundCommand};
use pbmon_store::InstanceConfigStore;

use crate::error::{error_chain, DaemonResult};

/// Reply to `/help`.
pub const HELP_TEXT: &str = "Commands:\n\
/panic <user> <symbol> <market> - set panic mode\n\
/graceful_stop <user> <symbol> <market> - set graceful_stop mode\n\
/normal <user> <symbol> <market> - set normal mode";

/// Reply to a mode command with the wrong number of arguments.
pub const USAGE_TEXT: &str = "Usage: /<cmd> <user> <symbol> <market>";

/// Pause after a failed poll before trying again.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

// =============================================================================
// Command Channel
// =============================================================================

/// Listens for operator commands and applies them.
pub struct CommandChannel {
    commands: Arc<dyn CommandPort>,
    activation: Arc<dyn ActivationPort>,
    credentials: Arc<dyn CredentialsPort>,
    instances: InstanceConfigStore,
    retry_delay: Duration,
}

impl CommandChannel {
    /// Create a command channel.
    pub fn new(
        commands: Arc<dyn CommandPort>,
        activation: Arc<dyn ActivationPort>,
        credentials: Arc<dyn CredentialsPort>,
        instances: InstanceConfigStore,
    ) -> Self {
        Self {
            commands,
            activation,
            credentials,
            instances,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Override the pause after a failed poll.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Apply one command and return the reply, or `None` if it is ignored.
    pub async fn handle(&self, command: &InboundCommand) -> Option<String> {
        let Some(credentials) = self.credentials.telegram() else {
            debug!("Messaging not configured, ignoring command");
            return None;
        };
        if command.chat_id != credentials.chat_id() {
            warn!(chat_id = %command.chat_id, command = %command.name, "Command from unknown chat ignored");
            return None;
        }

        if command.name == "help" {
            return Some(HELP_TEXT.to_string());
        }

        let Ok(mode) = Mode::from_str(&command.name) else {
            debug!(command = %command.name, "Unknown command ignored");
            return None;
        };

        Some(self.set_mode(mode, &command.args).await)
    }

    async fn set_mode(&self, mode: Mode, args: &[String]) -> String {
        let [user, symbol, market] = args else {
            return USAGE_TEXT.to_string();
        };

        let instance = match InstanceName::from_parts(user, symbol, market) {
            Ok(instance) => instance,
            Err(e) => {
                warn!(error = %e, "Rejected instance name");
                return format!("Instance {} not found", args.join("_"));
            }
        };

        match self.instances.set_modes(&instance, mode, mode).await {
            Ok(true) => {}
            Ok(false) => return format!("Instance {} not found", instance),
            Err(e) => {
                error!(%instance, error = %error_chain(&e), "Failed to update instance config");
                return format!("Failed to update {}", instance);
            }
        }

        // Config is written; a failed activation only delays the change.
        if let Err(e) = self.activation.activate_instance(&instance).await {
            error!(%instance, error = %e, "Failed to activate instance");
        }

        info!(%instance, %mode, "Instance mode set");
        format!("{} set to {}", instance, mode)
    }

    /// Wait for one batch of commands and answer each.
    ///
    /// Returns the number of replies sent.
    pub async fn poll_once(&self) -> DaemonResult<usize> {
        let batch = self.commands.poll_commands().await?;
        let mut replied = 0;

        for command in &batch {
            let Some(reply) = self.handle(command).await else {
                continue;
            };
            match self.commands.reply(command, &reply).await {
                Ok(()) => replied += 1,
                Err(e) => warn!(command = %command.name, error = %e, "Failed to send reply"),
            }
        }

        Ok(replied)
    }

    /// Run forever.
    pub async fn run(self) {
        info!("Command channel started");
        loop {
            if let Err(e) = self.poll_once().await {
                warn!(error = %error_chain(&e), "Command poll failed");
                tokio::time::sleep(self.retry_delay).await;
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
