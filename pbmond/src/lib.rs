//! PBMon Daemon Library
//!
//! Background monitor for a fleet of trading-bot instances.
//!
//! # Architecture
//!
//! ```text
//! errors.json → FileRemoteStatus → Poll Loop → AlertDeduplicator → Telegram
//!
//! Telegram → Command Channel → instance.cfg → activation request
//!
//! LifecycleGuard (pid file) keeps a single daemon per state directory
//! ```
//!
//! # Components
//!
//! - **Daemon**: Runs the Poll Loop and Command Channel side by side
//! - **Poll Loop**: Interval-paced alerting with log rotation
//! - **Command Channel**: `/panic`, `/normal`, `/graceful_stop`, `/help`
//! - **Lifecycle Guard**: start/stop/restart/status via the pid file
//! - **Config**: Environment-based configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use pbmond::{Config, Daemon};
//!
//! let config = Config::from_env()?;
//! Daemon::from_config(&config, None).run().await;
//! ```

#![warn(clippy::all)]

pub mod commands;
pub mod config;
pub mod credentials;
pub mod daemon;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod monitor;

// Re-exports for convenience
pub use commands::{CommandChannel, HELP_TEXT, USAGE_TEXT};
pub use config::Config;
pub use credentials::SettingsCredentials;
pub use daemon::Daemon;
pub use error::{error_chain, DaemonError, DaemonResult};
pub use lifecycle::{LifecycleGuard, ProcessControl, SysinfoProcessControl};
pub use logging::{init_tracing, RotatingLogFile};
pub use monitor::PollLoop;
