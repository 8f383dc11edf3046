//! Transport and decoding errors of the EVM data source.

use l2index_core::IndexError;
use thiserror::Error;

use crate::request::JsonRpcError;

/// Errors that can occur while talking to an L1 JSON-RPC node.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed (connection refused, non-2xx status, ...).
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON-RPC error object returned by the node.
    #[error("RPC error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),

    /// Local rate limiter refused the request and the wait would be too long.
    #[error("Rate limit exceeded (provider: {provider})")]
    RateLimited { provider: String },

    /// Request timed out.
    #[error("Request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// Response body could not be deserialized.
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// A log, transaction or calldata did not have the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl TransportError {
    /// Returns `true` if sending the same request again may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Timeout { .. } | Self::RateLimited { .. }
        )
    }
}

impl From<TransportError> for IndexError {
    fn from(err: TransportError) -> Self {
        IndexError::SourceUnavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_to_source_unavailable() {
        let err: IndexError = TransportError::Timeout { ms: 30_000 }.into();
        assert_eq!(
            err,
            IndexError::SourceUnavailable("Request timed out after 30000ms".into())
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn rpc_errors_are_not_retried() {
        let err = TransportError::Rpc(JsonRpcError {
            code: -32005,
            message: "query returned more than 10000 results".into(),
            data: None,
        });
        assert!(!err.is_retryable());
        assert!(!TransportError::Decode("short log data".into()).is_retryable());
    }
}
