//! Pid-file mutual exclusion for the scheduler process.
//!
//! The lock is cooperative: holding it means a lock file at a well-known
//! path names a live process. The state machine is
//! `Unlocked → Held(pid) → Unlocked`, with staleness detected through an
//! injectable liveness probe so tests can simulate dead owners without
//! spawning processes.

use crate::error::LockError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Capability to ask whether a pid belongs to a running process.
pub trait ProcessProbe: Send + Sync {
    /// True when a process with this pid is currently running.
    fn is_alive(&self, pid: u32) -> bool;
}

/// Probe backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

impl ProcessProbe for SystemProbe {
    #[cfg(unix)]
    fn is_alive(&self, pid: u32) -> bool {
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        // Signal 0 performs the existence check without delivering anything.
        kill(Pid::from_raw(pid as i32), None).is_ok()
    }

    #[cfg(not(unix))]
    fn is_alive(&self, _pid: u32) -> bool {
        // Without a liveness check, assume the recorded owner is running.
        true
    }
}

/// Cross-restart single-instance guard backed by a pid file.
pub struct InstanceLock {
    path: PathBuf,
    pid: u32,
    probe: Box<dyn ProcessProbe>,
    held: bool,
}

impl InstanceLock {
    /// Creates a lock for the current process at the given path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_probe(path, std::process::id(), Box::new(SystemProbe))
    }

    /// Creates a lock with an explicit owner pid and liveness probe.
    #[must_use]
    pub fn with_probe(path: impl Into<PathBuf>, pid: u32, probe: Box<dyn ProcessProbe>) -> Self {
        Self {
            path: path.into(),
            pid,
            probe,
            held: false,
        }
    }

    /// Returns the lock file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True while this instance owns the lock.
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.held
    }

    /// Reads the pid recorded in the lock file, if any.
    ///
    /// Unparseable content is treated as an absent record; a file we
    /// cannot interpret cannot name a live owner.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read.
    pub fn read_pid(&self) -> Result<Option<u32>, LockError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path).map_err(|e| LockError::Io {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        match contents.trim().parse::<u32>() {
            Ok(pid) => Ok(Some(pid)),
            Err(_) => {
                warn!(path = %self.path.display(), "lock file content is not a pid");
                Ok(None)
            }
        }
    }

    /// Attempts to take exclusive ownership.
    ///
    /// A lock file naming a live foreign process denies the attempt and
    /// leaves the file untouched. A stale record is removed and replaced.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::AlreadyHeld`] when another live instance owns
    /// the lock, or [`LockError::Io`] when the file cannot be managed.
    pub fn acquire(&mut self) -> Result<(), LockError> {
        if let Some(existing) = self.read_pid()? {
            if existing != self.pid && self.probe.is_alive(existing) {
                return Err(LockError::AlreadyHeld { pid: existing });
            }
            warn!(
                stale_pid = existing,
                path = %self.path.display(),
                "removing stale lock file"
            );
            self.remove_file()?;
        }

        self.write_pid()?;
        self.held = true;
        info!(pid = self.pid, path = %self.path.display(), "instance lock acquired");
        Ok(())
    }

    /// Releases the lock if the file still names this process.
    ///
    /// Idempotent and non-failing; registered for normal shutdown, signal
    /// shutdown, and drop, so a failure here can only be logged.
    pub fn release(&mut self) {
        self.held = false;

        match self.read_pid() {
            Ok(Some(pid)) if pid == self.pid => {
                if let Err(err) = self.remove_file() {
                    warn!(error = %err, "failed to remove lock file on release");
                } else {
                    info!(path = %self.path.display(), "instance lock released");
                }
            }
            Ok(Some(pid)) => {
                debug!(owner = pid, "lock file owned by another process, leaving it");
            }
            Ok(None) => {}
            Err(err) => {
                warn!(error = %err, "could not inspect lock file on release");
            }
        }
    }

    /// Writes this pid through a temporary file and an atomic rename.
    fn write_pid(&self) -> Result<(), LockError> {
        let io_err = |e: std::io::Error| LockError::Io {
            path: self.path.clone(),
            reason: e.to_string(),
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let staging = self.path.with_extension("lock.tmp");
        fs::write(&staging, self.pid.to_string()).map_err(io_err)?;
        fs::rename(&staging, &self.path).map_err(io_err)
    }

    fn remove_file(&self) -> Result<(), LockError> {
        fs::remove_file(&self.path).map_err(|e| LockError::Io {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        if self.held {
            self.release();
        }
    }
}
