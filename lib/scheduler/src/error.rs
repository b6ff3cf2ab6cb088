//! Error types for the scheduler crate.

use std::fmt;
use std::path::PathBuf;

/// Errors from instance-lock operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    /// Another live process holds the lock. The file was left untouched.
    AlreadyHeld { pid: u32 },
    /// The lock file could not be read, written, or removed.
    Io { path: PathBuf, reason: String },
}

impl fmt::Display for LockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyHeld { pid } => {
                write!(f, "another scheduler instance is running (pid {pid})")
            }
            Self::Io { path, reason } => {
                write!(f, "lock file {} unusable: {reason}", path.display())
            }
        }
    }
}

impl std::error::Error for LockError {}
