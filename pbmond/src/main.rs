//! PBMon Daemon
//!
//! # Usage
//!
//! ```bash
//! # Run in the foreground (exits 1 if another daemon is running)
//! pbmond
//!
//! # Control a background daemon
//! pbmond start | stop | restart | status
//! ```
//!
//! # Environment Variables
//!
//! - `PBMON_STATE_DIR`: Root of pid, log, instance and settings files (default: data)
//! - `PBMON_POLL_INTERVAL_SECS`: Seconds between poll cycles (default: 60)
//! - `PBMON_LOG_MAX_BYTES`: Log rotation threshold (default: 10485760)
//! - `PBMON_SETTINGS_FILE`: Credentials file (default: `<state-dir>/pbmon.toml`)
//! - `PBMON_REMOTE_ERRORS_FILE`: Collector snapshot (default: `<state-dir>/remote/errors.json`)
//! - `PBMON_TELEGRAM_API_URL`: Bot API base URL (default: https://api.telegram.org)
//! - `PBMON_ENTRY_POINT`: Command-line suffix for the liveness check (default: pbmond)

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use pbmond::{
    init_tracing, Config, Daemon, DaemonError, LifecycleGuard, RotatingLogFile,
    SysinfoProcessControl,
};

#[derive(Parser)]
#[command(name = "pbmond", version, about = "PBMon fleet monitoring daemon")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start a background daemon
    Start,
    /// Kill the running daemon
    Stop,
    /// Restart the running daemon
    Restart,
    /// Report whether a daemon is running
    Status,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        None => run_daemon(config).await,
        Some(command) => control(command, config).await,
    }
}

fn guard(config: &Config) -> anyhow::Result<LifecycleGuard<SysinfoProcessControl>> {
    let program = std::env::current_exe()?;
    Ok(LifecycleGuard::from_config(
        config,
        program,
        SysinfoProcessControl::new(),
    ))
}

async fn run_daemon(config: Config) -> anyhow::Result<ExitCode> {
    let log_file = RotatingLogFile::open(config.log_file())?;
    init_tracing(Some(log_file.clone()));

    match guard(&config)?.acquire() {
        Ok(()) => {}
        Err(DaemonError::AlreadyRunning(pid)) => {
            error!(pid, "PBMon is already running");
            eprintln!("PBMon is already running (pid {})", pid);
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    }

    info!(
        state_dir = %config.state_dir.display(),
        poll_interval_secs = config.poll_interval.as_secs(),
        "Start: PBMon"
    );

    Daemon::from_config(&config, Some(log_file)).run().await;
    Ok(ExitCode::SUCCESS)
}

async fn control(command: Command, config: Config) -> anyhow::Result<ExitCode> {
    init_tracing(None);
    let guard = guard(&config)?;

    let ok = match command {
        Command::Start => guard.start().await,
        Command::Stop => {
            guard.stop();
            true
        }
        Command::Restart => guard.restart().await,
        Command::Status => guard.is_running(),
    };

    match guard.running_pid() {
        Some(pid) => println!("PBMon is running (pid {})", pid),
        None => println!("PBMon is not running"),
    }

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
