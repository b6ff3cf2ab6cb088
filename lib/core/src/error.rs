//! Error handling foundation for telepost.
//!
//! This module provides the shared error taxonomy for the publish pipeline
//! plus the `Result` type alias using rootcause. Crates define additional
//! domain-specific errors in their own error modules and add
//! layer-appropriate context via rootcause's `.context()` as errors
//! propagate up the stack.
//!
//! The taxonomy distinguishes failures that must never be retried
//! (validation of post content) from failures that the next cycle will
//! re-evaluate (transport and provider errors), because the task store
//! remains the source of truth.

use rootcause::Report;
use std::fmt;

/// A Result type alias using rootcause's Report for error handling.
///
/// Each layer adds its own context via `.context()` as errors propagate.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

/// Failure modes of a publish attempt against the messaging provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// The post content is malformed or incomplete for its type.
    ///
    /// Never retried; the post transitions to the Error status.
    Validation { reason: String },
    /// The provider rejected the request or the network failed.
    ///
    /// Surfaced to the caller for status bookkeeping, never retried
    /// within the same call.
    Transport { reason: String },
}

impl PublishError {
    /// Creates a validation failure.
    #[must_use]
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Creates a transport failure.
    #[must_use]
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    /// Returns true for validation failures.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation { reason } => write!(f, "post validation failed: {reason}"),
            Self::Transport { reason } => write!(f, "publish transport failed: {reason}"),
        }
    }
}

impl std::error::Error for PublishError {}

/// Failure modes of task-store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store answered with a non-success status.
    Api { status: u16, body: String },
    /// The request never produced an answer.
    Transport { reason: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api { status, body } => {
                write!(f, "task store returned {status}: {body}")
            }
            Self::Transport { reason } => write!(f, "task store unreachable: {reason}"),
        }
    }
}

impl std::error::Error for StoreError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_type_works() {
        let ok: Result<i32> = Ok(42);
        assert_eq!(ok.expect("should be ok"), 42);
    }

    #[test]
    fn publish_error_display() {
        let err = PublishError::validation("poll needs at least 2 options");
        assert!(err.to_string().contains("validation failed"));
        assert!(err.is_validation());

        let err = PublishError::transport("connection reset");
        assert!(err.to_string().contains("transport failed"));
        assert!(!err.is_validation());
    }

    #[test]
    fn store_error_display() {
        let err = StoreError::Api {
            status: 429,
            body: "rate limited".to_string(),
        };
        assert!(err.to_string().contains("429"));
    }
}
