//! Lifecycle Guard: singleton daemon control through a pid file.
//!
//! A daemon counts as running when the pid in the pid file belongs to a live
//! process whose command line references the daemon entry point. Stale pid
//! files are tolerated and never deleted.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use sysinfo::{Pid, ProcessRefreshKind, System, UpdateKind};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{DaemonError, DaemonResult};

/// Liveness checks after spawning before giving up.
pub const DEFAULT_START_ATTEMPTS: u32 = 6;

/// Delay between liveness checks after spawning.
pub const DEFAULT_START_POLL_INTERVAL: Duration = Duration::from_secs(1);

// =============================================================================
// Process Control
// =============================================================================

/// OS process table access.
pub trait ProcessControl: Send + Sync {
    /// Command line of a live process, `None` if there is none.
    fn command_line(&self, pid: u32) -> Option<Vec<String>>;

    /// Force-kill a process. Returns whether the signal was delivered.
    fn kill(&self, pid: u32) -> bool;

    /// Spawn `program` in the background, detached from our stdio and
    /// process group. Returns the child's pid.
    fn spawn_detached(&self, program: &Path, args: &[String]) -> io::Result<u32>;
}

/// [`ProcessControl`] backed by `sysinfo` and `std::process`.
pub struct SysinfoProcessControl {
    system: Mutex<System>,
}

impl SysinfoProcessControl {
    /// Create with an empty process table; entries are refreshed per lookup.
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }

    fn with_process<T>(&self, pid: u32, f: impl FnOnce(&sysinfo::Process) -> T) -> Option<T> {
        let mut system = self.system.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let pid = Pid::from_u32(pid);
        // A plain refresh leaves the command line empty.
        let refresh = ProcessRefreshKind::new().with_cmd(UpdateKind::Always);
        if !system.refresh_process_specifics(pid, refresh) {
            return None;
        }
        system.process(pid).map(f)
    }
}

impl Default for SysinfoProcessControl {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessControl for SysinfoProcessControl {
    fn command_line(&self, pid: u32) -> Option<Vec<String>> {
        self.with_process(pid, |process| process.cmd().to_vec())
    }

    fn kill(&self, pid: u32) -> bool {
        self.with_process(pid, |process| process.kill()).unwrap_or(false)
    }

    fn spawn_detached(&self, program: &Path, args: &[String]) -> io::Result<u32> {
        let mut command = std::process::Command::new(program);
        command
            .args(args)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let child = command.spawn()?;
        Ok(child.id())
    }
}

// =============================================================================
// Lifecycle Guard
// =============================================================================

/// Pid-file based singleton guard.
pub struct LifecycleGuard<P: ProcessControl> {
    pid_file: PathBuf,
    entry_point: String,
    program: PathBuf,
    control: P,
    start_attempts: u32,
    start_poll_interval: Duration,
}

impl<P: ProcessControl> LifecycleGuard<P> {
    /// Create a guard.
    ///
    /// # Arguments
    ///
    /// * `pid_file` - Where the running daemon records its pid
    /// * `entry_point` - Command-line suffix identifying the daemon
    /// * `program` - Executable spawned by `start`
    /// * `control` - Process table access
    pub fn new(
        pid_file: impl Into<PathBuf>,
        entry_point: impl Into<String>,
        program: impl Into<PathBuf>,
        control: P,
    ) -> Self {
        Self {
            pid_file: pid_file.into(),
            entry_point: entry_point.into().to_lowercase(),
            program: program.into(),
            control,
            start_attempts: DEFAULT_START_ATTEMPTS,
            start_poll_interval: DEFAULT_START_POLL_INTERVAL,
        }
    }

    /// Guard for the daemon described by `config`.
    pub fn from_config(config: &Config, program: impl Into<PathBuf>, control: P) -> Self {
        Self::new(config.pid_file(), config.entry_point.clone(), program, control)
    }

    /// Override how long `start` waits for the child to come up.
    pub fn with_start_polling(mut self, attempts: u32, interval: Duration) -> Self {
        self.start_attempts = attempts;
        self.start_poll_interval = interval;
        self
    }

    /// Pid file path.
    pub fn pid_file(&self) -> &Path {
        &self.pid_file
    }

    /// Pid recorded in the pid file, if readable and numeric.
    pub fn load_pid(&self) -> Option<u32> {
        let raw = fs::read_to_string(&self.pid_file).ok()?;
        match raw.trim().parse::<u32>() {
            Ok(pid) => Some(pid),
            Err(_) => {
                debug!(path = %self.pid_file.display(), "Pid file is not numeric");
                None
            }
        }
    }

    /// Record the current process as the running daemon.
    pub fn save_pid(&self) -> DaemonResult<()> {
        if let Some(parent) = self.pid_file.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.pid_file, std::process::id().to_string())?;
        debug!(pid = std::process::id(), path = %self.pid_file.display(), "Pid saved");
        Ok(())
    }

    /// Claim the singleton slot for the current process.
    ///
    /// Fails with [`DaemonError::AlreadyRunning`] if another daemon is live,
    /// otherwise records our pid.
    pub fn acquire(&self) -> DaemonResult<()> {
        if let Some(pid) = self.running_pid() {
            return Err(DaemonError::AlreadyRunning(pid));
        }
        self.save_pid()
    }

    fn matches_entry_point(&self, cmdline: &[String]) -> bool {
        cmdline
            .iter()
            .any(|arg| arg.to_lowercase().ends_with(&self.entry_point))
    }

    /// Pid of another live daemon, if any.
    pub fn running_pid(&self) -> Option<u32> {
        let pid = self.load_pid()?;
        // Our own pid in the file can only be a stale record.
        if pid == std::process::id() {
            return None;
        }
        let cmdline = self.control.command_line(pid)?;
        self.matches_entry_point(&cmdline).then_some(pid)
    }

    /// Whether another daemon is running.
    pub fn is_running(&self) -> bool {
        self.running_pid().is_some()
    }

    async fn wait_until(&self, running: bool) -> bool {
        for _ in 0..self.start_attempts {
            tokio::time::sleep(self.start_poll_interval).await;
            if self.is_running() == running {
                return true;
            }
        }
        false
    }

    /// Spawn a background daemon unless one is running.
    ///
    /// Returns whether a daemon is running afterwards. Failures are logged,
    /// never returned.
    pub async fn start(&self) -> bool {
        if self.is_running() {
            debug!("Already running");
            return true;
        }

        info!(program = %self.program.display(), "Start");
        match self.control.spawn_detached(&self.program, &[]) {
            Ok(pid) => debug!(pid, "Spawned background process"),
            Err(e) => {
                error!(error = %e, "Failed to spawn daemon");
                return false;
            }
        }

        if self.wait_until(true).await {
            true
        } else {
            error!(attempts = self.start_attempts, "Daemon did not come up");
            false
        }
    }

    /// Kill the running daemon, if any. Returns whether one was killed.
    pub fn stop(&self) -> bool {
        let Some(pid) = self.running_pid() else {
            debug!("Not running");
            return false;
        };

        info!(pid, "Stop");
        let killed = self.control.kill(pid);
        if !killed {
            warn!(pid, "Kill was not delivered");
        }
        killed
    }

    /// Stop then start, only if a daemon is currently running.
    pub async fn restart(&self) -> bool {
        if !self.is_running() {
            debug!("Not running, nothing to restart");
            return false;
        }

        self.stop();
        if !self.wait_until(false).await {
            warn!("Daemon still alive after kill");
        }
        self.start().await
    }
}

// =============================================================================
// Tests
// =============================================================================
