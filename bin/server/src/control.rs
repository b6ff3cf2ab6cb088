//! Daemon process control.
//!
//! The control surface never shares memory with the daemon; everything
//! goes through the lock file, the log file, and process signals, so the
//! two sides can be deployed and restarted independently.

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::process::Stdio;
use telepost_scheduler::{CYCLE_MARKER, InstanceLock, ProcessProbe, SystemProbe};
use tracing::{info, warn};

/// Number of log lines returned by the logs action.
pub const LOG_TAIL_LINES: usize = 50;

/// Errors from daemon control actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    /// A live daemon already owns the lock.
    AlreadyRunning {
        /// Pid recorded in the lock file.
        pid: u32,
    },
    /// No live daemon owns the lock.
    NotRunning,
    /// Process management failed.
    Io {
        /// Underlying failure description.
        reason: String,
    },
    /// The action is not available on this platform.
    Unsupported,
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRunning { pid } => {
                write!(f, "scheduler already running with pid {pid}")
            }
            Self::NotRunning => write!(f, "scheduler is not running"),
            Self::Io { reason } => write!(f, "process control failed: {reason}"),
            Self::Unsupported => write!(f, "action not supported on this platform"),
        }
    }
}

impl std::error::Error for ControlError {}

/// Output of a connection-check run.
#[derive(Debug, Clone)]
pub struct CheckOutput {
    /// Whether the check process exited successfully.
    pub success: bool,
    /// Combined stdout and stderr of the check.
    pub output: String,
}

/// Handle over the daemon's lock file, log file, and executable.
pub struct DaemonControl {
    lock_file: PathBuf,
    log_file: PathBuf,
    daemon_bin: PathBuf,
}

impl DaemonControl {
    /// Creates a control handle over the daemon's files.
    #[must_use]
    pub fn new(
        lock_file: impl Into<PathBuf>,
        log_file: impl Into<PathBuf>,
        daemon_bin: impl Into<PathBuf>,
    ) -> Self {
        Self {
            lock_file: lock_file.into(),
            log_file: log_file.into(),
            daemon_bin: daemon_bin.into(),
        }
    }

    /// True when the lock file exists, live owner or not.
    #[must_use]
    pub fn lock_file_exists(&self) -> bool {
        self.lock_file.exists()
    }

    /// Pid of the live daemon, if one holds the lock.
    ///
    /// A lock file naming a dead process reads as not running; the next
    /// daemon start reclaims it.
    #[must_use]
    pub fn running_pid(&self) -> Option<u32> {
        let lock = InstanceLock::new(&self.lock_file);
        match lock.read_pid() {
            Ok(Some(pid)) if SystemProbe.is_alive(pid) => Some(pid),
            Ok(_) => None,
            Err(err) => {
                warn!(error = %err, "could not inspect the lock file");
                None
            }
        }
    }

    /// Launches the daemon as a detached process.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::AlreadyRunning`] when a live daemon holds
    /// the lock, or [`ControlError::Io`] when the spawn fails.
    pub fn start(&self) -> Result<u32, ControlError> {
        if let Some(pid) = self.running_pid() {
            return Err(ControlError::AlreadyRunning { pid });
        }

        let child = tokio::process::Command::new(&self.daemon_bin)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ControlError::Io {
                reason: format!("could not launch {}: {e}", self.daemon_bin.display()),
            })?;

        let pid = child.id().ok_or_else(|| ControlError::Io {
            reason: "daemon exited before reporting a pid".to_string(),
        })?;
        info!(pid, "scheduler daemon started");
        Ok(pid)
    }

    /// Asks the live daemon to shut down.
    ///
    /// Termination is a request: the daemon finishes any in-flight cycle
    /// and releases its lock on the way out.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::NotRunning`] when no live daemon holds the
    /// lock, or [`ControlError::Io`] when the signal cannot be sent.
    pub fn stop(&self) -> Result<u32, ControlError> {
        let pid = self.running_pid().ok_or(ControlError::NotRunning)?;
        terminate(pid)?;
        info!(pid, "asked scheduler daemon to stop");
        Ok(pid)
    }

    /// Timestamp of the most recent cycle, read from the daemon log.
    #[must_use]
    pub fn last_cycle(&self) -> Option<String> {
        let contents = fs::read_to_string(&self.log_file).ok()?;
        contents
            .lines()
            .rev()
            .find(|line| line.contains(CYCLE_MARKER))
            .and_then(|line| line.split_whitespace().next())
            .map(str::to_string)
    }

    /// Last `lines` lines of the daemon log, oldest first.
    #[must_use]
    pub fn tail_log(&self, lines: usize) -> Vec<String> {
        let Ok(contents) = fs::read_to_string(&self.log_file) else {
            return Vec::new();
        };
        let all: Vec<&str> = contents.lines().collect();
        let skip = all.len().saturating_sub(lines);
        all[skip..].iter().map(|line| (*line).to_string()).collect()
    }

    /// Runs the daemon's connection check and captures its output.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::Io`] when the check process cannot be run.
    pub async fn run_check(&self) -> Result<CheckOutput, ControlError> {
        let output = tokio::process::Command::new(&self.daemon_bin)
            .arg("--check")
            .output()
            .await
            .map_err(|e| ControlError::Io {
                reason: format!("could not run {} --check: {e}", self.daemon_bin.display()),
            })?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(CheckOutput {
            success: output.status.success(),
            output: text,
        })
    }
}

#[cfg(unix)]
fn terminate(pid: u32) -> Result<(), ControlError> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    kill(Pid::from_raw(pid as i32), Signal::SIGTERM).map_err(|e| ControlError::Io {
        reason: format!("could not signal pid {pid}: {e}"),
    })
}

#[cfg(not(unix))]
fn terminate(_pid: u32) -> Result<(), ControlError> {
    Err(ControlError::Unsupported)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn control_in(dir: &tempfile::TempDir) -> DaemonControl {
        DaemonControl::new(
            dir.path().join("scheduler.lock"),
            dir.path().join("scheduler.log"),
            "telepost-daemon",
        )
    }

    #[test]
    fn missing_lock_file_reads_as_not_running() {
        let dir = tempfile::tempdir().expect("tempdir");
        let control = control_in(&dir);

        assert_eq!(control.running_pid(), None);
        assert_eq!(control.stop(), Err(ControlError::NotRunning));
    }

    #[test]
    fn a_live_pid_in_the_lock_file_reads_as_running() {
        let dir = tempfile::tempdir().expect("tempdir");
        let control = control_in(&dir);

        // Our own pid is certainly alive.
        let own = std::process::id();
        fs::write(dir.path().join("scheduler.lock"), own.to_string()).expect("seed lock");

        assert_eq!(control.running_pid(), Some(own));
    }

    #[test]
    fn last_cycle_takes_the_newest_marker_line() {
        let dir = tempfile::tempdir().expect("tempdir");
        let control = control_in(&dir);

        let log = format!(
            "2026-03-10T09:00:00Z INFO {CYCLE_MARKER}\n\
             2026-03-10T09:05:00Z INFO no scheduled posts to publish\n\
             2026-03-10T09:15:00Z INFO {CYCLE_MARKER}\n"
        );
        fs::write(dir.path().join("scheduler.log"), log).expect("seed log");

        assert_eq!(
            control.last_cycle().as_deref(),
            Some("2026-03-10T09:15:00Z")
        );
    }

    #[test]
    fn last_cycle_without_markers_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let control = control_in(&dir);
        fs::write(dir.path().join("scheduler.log"), "INFO started\n").expect("seed log");

        assert_eq!(control.last_cycle(), None);
    }

    #[test]
    fn tail_log_returns_the_newest_lines_oldest_first() {
        let dir = tempfile::tempdir().expect("tempdir");
        let control = control_in(&dir);

        let log: String = (1..=10).map(|n| format!("line {n}\n")).collect();
        fs::write(dir.path().join("scheduler.log"), log).expect("seed log");

        assert_eq!(control.tail_log(3), vec!["line 8", "line 9", "line 10"]);
        assert_eq!(control.tail_log(100).len(), 10);
    }

    #[test]
    fn tail_log_of_a_missing_file_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let control = control_in(&dir);

        assert!(control.tail_log(50).is_empty());
    }
}
