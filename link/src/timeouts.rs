//! Timeout configuration for storage-link HTTP requests.
//!
//! Only the default reqwest transport reads these values; custom
//! [`HttpTransport`](crate::HttpTransport) implementations apply their own.

use std::time::Duration;

/// Timeout configuration for storage requests.
///
/// # Examples
///
/// ```rust
/// use storage_link::StorageTimeouts;
/// use std::time::Duration;
///
/// // Use defaults (recommended for most cases)
/// let timeouts = StorageTimeouts::default();
///
/// // Custom timeouts for high-latency environments
/// let timeouts = StorageTimeouts::builder()
///     .connection_timeout(Duration::from_secs(60))
///     .request_timeout(Duration::from_secs(120))
///     .build();
///
/// // Aggressive timeouts for local development
/// let timeouts = StorageTimeouts::fast();
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageTimeouts {
    /// Timeout for establishing connections (TCP + TLS handshake).
    /// Default: 10 seconds
    pub connection_timeout: Duration,

    /// Timeout for a whole request, from send until the body is read.
    /// A request that exceeds it fails with a transport error.
    /// Default: 30 seconds
    pub request_timeout: Duration,

    /// How long idle pooled connections are kept.
    /// Default: 90 seconds
    pub pool_idle_timeout: Duration,
}

impl Default for StorageTimeouts {
    fn default() -> Self {
        Self {
            connection_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            pool_idle_timeout: Duration::from_secs(90),
        }
    }
}

impl StorageTimeouts {
    /// Create a new builder for custom timeout configuration.
    pub fn builder() -> StorageTimeoutsBuilder {
        StorageTimeoutsBuilder::new()
    }

    /// Shorter timeouts suitable for a storage endpoint on localhost.
    pub fn fast() -> Self {
        Self {
            connection_timeout: Duration::from_secs(2),
            request_timeout: Duration::from_secs(5),
            pool_idle_timeout: Duration::from_secs(30),
        }
    }

    /// Longer timeouts for high-latency or unreliable networks.
    pub fn relaxed() -> Self {
        Self {
            connection_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(120),
            pool_idle_timeout: Duration::from_secs(90),
        }
    }

    /// Check if a duration represents "no timeout" (zero or very large).
    pub fn is_no_timeout(duration: Duration) -> bool {
        duration.is_zero() || duration > Duration::from_secs(86400 * 365)
    }
}

/// Builder for creating custom [`StorageTimeouts`] configurations.
#[derive(Debug, Clone)]
pub struct StorageTimeoutsBuilder {
    timeouts: StorageTimeouts,
}

impl StorageTimeoutsBuilder {
    fn new() -> Self {
        Self {
            timeouts: StorageTimeouts::default(),
        }
    }

    /// Set the connection timeout (TCP + TLS handshake).
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.connection_timeout = timeout;
        self
    }

    /// Set the connection timeout in seconds.
    pub fn connection_timeout_secs(self, secs: u64) -> Self {
        self.connection_timeout(Duration::from_secs(secs))
    }

    /// Set the per-request timeout. Zero disables it.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.request_timeout = timeout;
        self
    }

    /// Set the per-request timeout in seconds.
    pub fn request_timeout_secs(self, secs: u64) -> Self {
        self.request_timeout(Duration::from_secs(secs))
    }

    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.pool_idle_timeout = timeout;
        self
    }

    /// Build the timeout configuration.
    pub fn build(self) -> StorageTimeouts {
        self.timeouts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let timeouts = StorageTimeouts::default();
        assert_eq!(timeouts.connection_timeout, Duration::from_secs(10));
        assert_eq!(timeouts.request_timeout, Duration::from_secs(30));
        assert_eq!(timeouts.pool_idle_timeout, Duration::from_secs(90));
    }

    #[test]
    fn test_builder() {
        let timeouts = StorageTimeouts::builder()
            .connection_timeout_secs(60)
            .request_timeout_secs(120)
            .build();

        assert_eq!(timeouts.connection_timeout, Duration::from_secs(60));
        assert_eq!(timeouts.request_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_presets() {
        assert!(StorageTimeouts::fast().connection_timeout <= Duration::from_secs(5));
        assert!(StorageTimeouts::relaxed().request_timeout >= Duration::from_secs(60));
    }

    #[test]
    fn test_is_no_timeout() {
        assert!(StorageTimeouts::is_no_timeout(Duration::ZERO));
        assert!(!StorageTimeouts::is_no_timeout(Duration::from_secs(3600)));
    }
}
