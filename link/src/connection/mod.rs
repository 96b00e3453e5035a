//! Pub/sub connection bookkeeping.
//!
//! This module contains:
//! - [`state`]: connection status plus the per-channel subscribe and
//!   unsubscribe commands in flight
//! - [`offline`]: the FIFO of item mutations issued while offline

pub mod offline;
pub mod state;

pub use offline::{BufferedOperation, Completion, OfflineBuffer};
pub use state::{ConnectionState, PubSubCommand};

/// Connection status as last reported by the pub/sub transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// No connection event received yet
    #[default]
    Initial,
    Connected,
    /// The connection dropped; the client is offline until it reconnects
    Reconnecting,
}

impl ConnectionStatus {
    pub fn is_offline(self) -> bool {
        self == ConnectionStatus::Reconnecting
    }
}
