use serde::{Deserialize, Serialize};

/// Connection-level options for the storage client.
///
/// These options control how the client behaves around the pub/sub
/// connection:
/// - whether item mutations issued while offline are buffered and replayed
/// - the prefix used to build notification channel names
///
/// # Example
///
/// ```rust
/// use storage_link::ConnectionOptions;
///
/// let options = ConnectionOptions::default()
///     .with_offline_buffering(false)
///     .with_channel_prefix("rtcs");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionOptions {
    /// Buffer put/update/delete item operations while the pub/sub transport
    /// is reconnecting, and replay them in order once it is back.
    /// Default: true
    #[serde(default = "default_offline_buffering")]
    pub offline_buffering: bool,

    /// Prefix of every notification channel (`<prefix>_<table>...`).
    /// Default: "rtcs"
    #[serde(default = "default_channel_prefix")]
    pub channel_prefix: String,
}

fn default_offline_buffering() -> bool {
    true
}

fn default_channel_prefix() -> String {
    "rtcs".to_string()
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            offline_buffering: default_offline_buffering(),
            channel_prefix: default_channel_prefix(),
        }
    }
}

impl ConnectionOptions {
    /// Create new connection options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether item mutations are buffered while offline
    pub fn with_offline_buffering(mut self, enabled: bool) -> Self {
        self.offline_buffering = enabled;
        self
    }

    /// Set the notification channel prefix
    pub fn with_channel_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.channel_prefix = prefix.into();
        self
    }
}
