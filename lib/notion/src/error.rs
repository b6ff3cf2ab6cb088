//! Error types for the Notion crate.
//!
//! Transport-level failures use the shared [`telepost_core::StoreError`];
//! this module only covers the per-record parse stage, where one bad page
//! must never fail the whole fetch.

use std::fmt;

/// Errors from projecting a raw store page into a [`crate::RawPost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The page carries no identifier.
    MissingId,
    /// The page is not the object shape the store documents.
    MalformedPage { reason: String },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingId => write!(f, "page has no id"),
            Self::MalformedPage { reason } => write!(f, "malformed page: {reason}"),
        }
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_display() {
        assert!(ParseError::MissingId.to_string().contains("no id"));
        let err = ParseError::MalformedPage {
            reason: "properties is not an object".to_string(),
        };
        assert!(err.to_string().contains("properties"));
    }
}
