//! Log file with size-based rotation.
//!
//! The tracing fmt layer writes through [`RotatingLogFile`]; the poll loop
//! calls [`RotatingLogFile::rotate_if_needed`] once per cycle. A rotation
//! renames the file to `<name>.old` (replacing any earlier one) and reopens a
//! fresh file at the original path.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "pbmond=info,pbmon_connectors=info,pbmon_store=info";

struct LogFile {
    path: PathBuf,
    file: File,
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// `PBMon.log` -> `PBMon.log.old`
pub fn rotated_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".old");
    PathBuf::from(name)
}

// =============================================================================
// Rotating Log File
// =============================================================================

/// Append-only log file shared by all tracing writers.
#[derive(Clone)]
pub struct RotatingLogFile {
    inner: Arc<Mutex<LogFile>>,
}

impl RotatingLogFile {
    /// Open (or create) the log at `path`, creating its directory.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = open_append(&path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(LogFile { path, file })),
        })
    }

    fn lock(&self) -> MutexGuard<'_, LogFile> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Path of the live log file.
    pub fn path(&self) -> PathBuf {
        self.lock().path.clone()
    }

    /// Rotate if the live file has reached `max_bytes`.
    ///
    /// Returns whether a rotation happened.
    pub fn rotate_if_needed(&self, max_bytes: u64) -> io::Result<bool> {
        let mut log = self.lock();

        let size = match fs::metadata(&log.path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                // Removed from under us; start a new one.
                log.file = open_append(&log.path)?;
                return Ok(false);
            }
            Err(e) => return Err(e),
        };
        if size < max_bytes {
            return Ok(false);
        }

        log.file.flush()?;
        fs::rename(&log.path, rotated_path(&log.path))?;
        log.file = open_append(&log.path)?;
        Ok(true)
    }
}

/// Writer handed out to the fmt layer for one event.
pub struct LogWriter {
    inner: Arc<Mutex<LogFile>>,
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut log = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        log.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut log = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        log.file.flush()
    }
}

impl<'a> MakeWriter<'a> for RotatingLogFile {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter {
            inner: Arc::clone(&self.inner),
        }
    }
}

// =============================================================================
// Subscriber
// =============================================================================

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Install the global subscriber.
///
/// With a log file, events go there without ANSI colors; otherwise to stderr.
pub fn init_tracing(log_file: Option<RotatingLogFile>) {
    match log_file {
        Some(log_file) => tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(log_file))
            .with(env_filter())
            .init(),
        None => tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr))
            .with(env_filter())
            .init(),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_line(log: &RotatingLogFile, line: &str) {
        let mut writer = log.make_writer();
        writer.write_all(line.as_bytes()).unwrap();
    }

    #[test]
    fn test_rotated_path() {
        assert_eq!(
            rotated_path(Path::new("/x/logs/PBMon.log")),
            PathBuf::from("/x/logs/PBMon.log.old")
        );
    }

    #[test]
    fn test_open_creates_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("PBMon.log");

        let log = RotatingLogFile::open(&path).unwrap();
        write_line(&log, "hello\n");

        assert_eq!(fs::read_to_string(&path).unwrap(), "hello\n");
    }

    #[test]
    fn test_no_rotation_below_threshold() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("PBMon.log");
        let log = RotatingLogFile::open(&path).unwrap();
        write_line(&log, "short\n");

        assert!(!log.rotate_if_needed(1024).unwrap());
        assert!(!rotated_path(&path).exists());
    }

    #[test]
    fn test_rotation_at_threshold() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("PBMon.log");
        let log = RotatingLogFile::open(&path).unwrap();
        write_line(&log, &"x".repeat(64));

        assert!(log.rotate_if_needed(64).unwrap());
        assert_eq!(fs::read_to_string(rotated_path(&path)).unwrap().len(), 64);
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);

        // Later writes land in the fresh file, which stays below threshold
        write_line(&log, "after\n");
        assert!(!log.rotate_if_needed(64).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "after\n");
        assert_eq!(fs::read_to_string(rotated_path(&path)).unwrap().len(), 64);
    }

    #[test]
    fn test_rotation_replaces_previous_old_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("PBMon.log");
        fs::write(rotated_path(&path), "ancient").unwrap();

        let log = RotatingLogFile::open(&path).unwrap();
        write_line(&log, "0123456789");
        assert!(log.rotate_if_needed(10).unwrap());

        assert_eq!(fs::read_to_string(rotated_path(&path)).unwrap(), "0123456789");
    }

    #[test]
    fn test_removed_file_is_recreated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("PBMon.log");
        let log = RotatingLogFile::open(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert!(!log.rotate_if_needed(10).unwrap());
        write_line(&log, "back\n");
        assert_eq!(fs::read_to_string(&path).unwrap(), "back\n");
    }
}
