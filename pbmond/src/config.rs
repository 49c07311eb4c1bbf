//! Daemon configuration.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Every on-disk location hangs off the state directory.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use pbmon_connectors::DEFAULT_TELEGRAM_API_URL;

use crate::error::{DaemonError, DaemonResult};

/// Default seconds between poll cycles.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Default log size that triggers rotation (10 MiB).
pub const DEFAULT_LOG_MAX_BYTES: u64 = 10 * 1024 * 1024;

/// Default command-line suffix identifying a running daemon.
pub const DEFAULT_ENTRY_POINT: &str = "pbmond";

/// Log file name inside `<state-dir>/logs`.
pub const LOG_FILE_NAME: &str = "PBMon.log";

/// Pid file name inside `<state-dir>/pid`.
pub const PID_FILE_NAME: &str = "pbmon.pid";

// =============================================================================
// Configuration
// =============================================================================

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of all daemon state
    pub state_dir: PathBuf,
    /// Time between poll cycles
    pub poll_interval: Duration,
    /// Log size that triggers rotation
    pub log_max_bytes: u64,
    /// Settings file holding the messaging credentials
    pub settings_file: PathBuf,
    /// Error snapshot written by the remote-status collector
    pub remote_errors_file: PathBuf,
    /// Telegram Bot API base URL
    pub telegram_api_url: String,
    /// Command-line suffix used for the liveness match
    pub entry_point: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> DaemonResult<Self> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        let state_dir = PathBuf::from(env::var("PBMON_STATE_DIR").unwrap_or_else(|_| "data".to_string()));
        let mut config = Self::with_state_dir(state_dir);

        if let Ok(val) = env::var("PBMON_POLL_INTERVAL_SECS") {
            config.poll_interval = Duration::from_secs(parse_u64("PBMON_POLL_INTERVAL_SECS", &val)?);
        }
        if let Ok(val) = env::var("PBMON_LOG_MAX_BYTES") {
            config.log_max_bytes = parse_u64("PBMON_LOG_MAX_BYTES", &val)?;
        }
        if let Ok(val) = env::var("PBMON_SETTINGS_FILE") {
            config.settings_file = PathBuf::from(val);
        }
        if let Ok(val) = env::var("PBMON_REMOTE_ERRORS_FILE") {
            config.remote_errors_file = PathBuf::from(val);
        }
        if let Ok(val) = env::var("PBMON_TELEGRAM_API_URL") {
            config.telegram_api_url = val;
        }
        if let Ok(val) = env::var("PBMON_ENTRY_POINT") {
            if val.trim().is_empty() {
                return Err(DaemonError::Config("PBMON_ENTRY_POINT must not be empty".to_string()));
            }
            config.entry_point = val.trim().to_lowercase();
        }

        Ok(config)
    }

    /// Defaults rooted at `state_dir`.
    pub fn with_state_dir(state_dir: impl Into<PathBuf>) -> Self {
        let state_dir = state_dir.into();
        Self {
            settings_file: state_dir.join("pbmon.toml"),
            remote_errors_file: state_dir.join("remote").join("errors.json"),
            state_dir,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            log_max_bytes: DEFAULT_LOG_MAX_BYTES,
            telegram_api_url: DEFAULT_TELEGRAM_API_URL.to_string(),
            entry_point: DEFAULT_ENTRY_POINT.to_string(),
        }
    }

    /// Create test configuration rooted at `dir`.
    ///
    /// Short poll interval; the Bot API URL points at a closed local port.
    pub fn test(dir: &Path) -> Self {
        Self {
            poll_interval: Duration::from_millis(10),
            telegram_api_url: "http://127.0.0.1:9".to_string(),
            ..Self::with_state_dir(dir)
        }
    }

    /// `<state-dir>/pid/pbmon.pid`
    pub fn pid_file(&self) -> PathBuf {
        self.state_dir.join("pid").join(PID_FILE_NAME)
    }

    /// `<state-dir>/logs/PBMon.log`
    pub fn log_file(&self) -> PathBuf {
        self.state_dir.join("logs").join(LOG_FILE_NAME)
    }

    /// `<state-dir>/instances`
    pub fn instances_dir(&self) -> PathBuf {
        self.state_dir.join("instances")
    }

    /// `<state-dir>/cmd`, where activation requests are dropped
    pub fn command_dir(&self) -> PathBuf {
        self.state_dir.join("cmd")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::with_state_dir("data")
    }
}

fn parse_u64(key: &str, val: &str) -> DaemonResult<u64> {
    val.trim()
        .parse::<u64>()
        .map_err(|_| DaemonError::Config(format!("Invalid {} value: {}", key, val)))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.state_dir, PathBuf::from("data"));
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(config.log_max_bytes, 10_485_760);
        assert_eq!(config.entry_point, "pbmond");
        assert_eq!(config.telegram_api_url, "https://api.telegram.org");
    }

    #[test]
    fn test_derived_paths() {
        let config = Config::with_state_dir("/srv/pbmon");

        assert_eq!(config.pid_file(), PathBuf::from("/srv/pbmon/pid/pbmon.pid"));
        assert_eq!(config.log_file(), PathBuf::from("/srv/pbmon/logs/PBMon.log"));
        assert_eq!(config.instances_dir(), PathBuf::from("/srv/pbmon/instances"));
        assert_eq!(config.command_dir(), PathBuf::from("/srv/pbmon/cmd"));
        assert_eq!(config.settings_file, PathBuf::from("/srv/pbmon/pbmon.toml"));
        assert_eq!(
            config.remote_errors_file,
            PathBuf::from("/srv/pbmon/remote/errors.json")
        );
    }

    #[test]
    fn test_test_config() {
        let config = Config::test(Path::new("/tmp/x"));

        assert_eq!(config.state_dir, PathBuf::from("/tmp/x"));
        assert!(config.poll_interval < Duration::from_secs(1));
    }

    #[test]
    fn test_parse_u64() {
        assert_eq!(parse_u64("K", " 30 ").unwrap(), 30);
        assert!(matches!(parse_u64("K", "soon"), Err(DaemonError::Config(_))));
        assert!(parse_u64("K", "-1").is_err());
    }
}
