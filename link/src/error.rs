//! Error types for storage-link.
//!
//! Every operation reports its failure exactly once through the `Result`
//! resolved by its [`Pending`](crate::Pending) handle. Each variant carries the
//! numeric code the storage service clients have always exposed, available via
//! [`StorageLinkError::code`].

use thiserror::Error;

/// Result type for storage-link operations.
pub type Result<T> = std::result::Result<T, StorageLinkError>;

/// Errors that can occur while talking to the storage service.
#[derive(Debug, Clone, Error)]
pub enum StorageLinkError {
    /// Invalid client configuration (missing application key, no runtime, ...)
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Argument rejected before any request was sent
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The load balancer could not be reached or returned a malformed answer
    #[error("Balancer resolution failed: {0}")]
    ResolutionError(String),

    /// The request body could not be serialized
    #[error("Failed to encode request: {0}")]
    EncodeError(String),

    /// HTTP-level failure talking to the storage endpoint
    #[error("Transport error: {0}")]
    TransportError(String),

    /// The response body was not valid JSON or had an unexpected shape
    #[error("Failed to decode response: {0}")]
    DecodeError(String),

    /// The storage service answered with an error object
    #[error("Server error ({code}): {message}")]
    ServerError { code: i64, message: String },

    /// Operation rejected because the client is offline
    #[error("Connectivity error: {0}")]
    ConnectivityError(String),

    /// A pub/sub command was issued while the transport is not connected
    #[error("Not connected: {0}")]
    NotConnected(String),

    /// Presence lookup failed
    #[error("Presence error: {0}")]
    PresenceError(String),

    /// Internal invariant violated
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl StorageLinkError {
    /// Numeric error code, matching the codes reported by the service SDKs.
    ///
    /// Server errors report the code sent by the server.
    pub fn code(&self) -> i64 {
        match self {
            StorageLinkError::ConfigurationError(_) => 1000,
            StorageLinkError::ValidationError(_) => 1001,
            StorageLinkError::ResolutionError(_) => 1002,
            StorageLinkError::EncodeError(_) => 1004,
            StorageLinkError::TransportError(_) => 1005,
            StorageLinkError::DecodeError(_) => 1006,
            StorageLinkError::ConnectivityError(_) => 1007,
            StorageLinkError::NotConnected(_) => 1008,
            StorageLinkError::PresenceError(_) => 1011,
            StorageLinkError::InternalError(_) => 1099,
            StorageLinkError::ServerError { code, .. } => *code,
        }
    }

    /// Whether this error is eligible for the balancer failover retry.
    pub fn is_transport(&self) -> bool {
        matches!(self, StorageLinkError::TransportError(_))
    }
}

impl From<reqwest::Error> for StorageLinkError {
    fn from(err: reqwest::Error) -> Self {
        StorageLinkError::TransportError(err.to_string())
    }
}

impl From<serde_json::Error> for StorageLinkError {
    fn from(err: serde_json::Error) -> Self {
        StorageLinkError::DecodeError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(StorageLinkError::ValidationError("x".into()).code(), 1001);
        assert_eq!(StorageLinkError::TransportError("x".into()).code(), 1005);
        assert_eq!(StorageLinkError::ConnectivityError("x".into()).code(), 1007);
        let server = StorageLinkError::ServerError {
            code: 42,
            message: "table not found".into(),
        };
        assert_eq!(server.code(), 42);
        assert_eq!(server.to_string(), "Server error (42): table not found");
    }

    #[test]
    fn test_only_transport_errors_fail_over() {
        assert!(StorageLinkError::TransportError("reset".into()).is_transport());
        assert!(!StorageLinkError::DecodeError("bad".into()).is_transport());
        assert!(!StorageLinkError::ServerError {
            code: 1,
            message: String::new()
        }
        .is_transport());
    }
}
