//! Error types for the l2index pipeline.

use thiserror::Error;

/// Errors that can occur while scanning and indexing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    #[error("Orchestrator not initialized: call init() before scanning")]
    NotInitialized,

    #[error("Orchestrator already initialized")]
    AlreadyInitialized,

    #[error("Data source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Invalid contract {address}: {reason}")]
    InvalidContract { address: String, reason: String },

    #[error("Transaction {tx_hash} not found")]
    NotFound { tx_hash: String },

    #[error("Invalid block range: from {from} > to {to}")]
    InvalidRange { from: u64, to: u64 },

    #[error("Unexpected event: expected {expected}, got {actual}")]
    UnexpectedEvent { expected: String, actual: String },

    #[error("Scan cancelled")]
    Cancelled,
}

impl IndexError {
    /// Returns `true` if retrying the same pass may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SourceUnavailable(_))
    }

    /// Shorthand for wrapping any displayable error as `SourceUnavailable`.
    pub fn source(err: impl std::fmt::Display) -> Self {
        Self::SourceUnavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_source_errors_are_retryable() {
        assert!(IndexError::source("timeout").is_retryable());
        assert!(!IndexError::NotInitialized.is_retryable());
        assert!(!IndexError::InvalidContract {
            address: "0x0".into(),
            reason: "no code".into(),
        }
        .is_retryable());
        assert!(!IndexError::NotFound { tx_hash: "0xab".into() }.is_retryable());
    }

    #[test]
    fn display_includes_context() {
        let err = IndexError::InvalidRange { from: 10, to: 5 };
        assert_eq!(err.to_string(), "Invalid block range: from 10 > to 5");
    }
}
