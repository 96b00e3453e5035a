//! Connection lifecycle event handlers for the storage client.
//!
//! Provides callback-based hooks for monitoring the pub/sub transport:
//!
//! - [`on_connect`](EventHandlers::on_connect): first connection established
//! - [`on_disconnect`](EventHandlers::on_disconnect): the transport closed
//! - [`on_reconnecting`](EventHandlers::on_reconnecting): connection lost, the
//!   client is now offline and buffers item mutations
//! - [`on_reconnect`](EventHandlers::on_reconnect): connection restored
//! - [`on_error`](EventHandlers::on_error): transport exception
//!
//! # Example
//!
//! ```rust
//! use storage_link::EventHandlers;
//!
//! let handlers = EventHandlers::new()
//!     .on_connect(|| println!("Connected"))
//!     .on_reconnecting(|| println!("Offline, buffering writes"))
//!     .on_error(|error| eprintln!("Transport error: {}", error));
//! ```

use std::fmt;
use std::sync::Arc;

/// Type alias for argument-less lifecycle callbacks.
pub type OnLifecycleCallback = Arc<dyn Fn() + Send + Sync>;

/// Type alias for the on_error callback.
pub type OnErrorCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Connection lifecycle event handlers.
///
/// All handlers are optional and run on the task that delivers the transport
/// event, after the client has updated its own connection state.
#[derive(Clone, Default)]
pub struct EventHandlers {
    pub(crate) on_connect: Option<OnLifecycleCallback>,
    pub(crate) on_disconnect: Option<OnLifecycleCallback>,
    pub(crate) on_reconnecting: Option<OnLifecycleCallback>,
    pub(crate) on_reconnect: Option<OnLifecycleCallback>,
    pub(crate) on_error: Option<OnErrorCallback>,
}

impl fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandlers")
            .field("on_connect", &self.on_connect.is_some())
            .field("on_disconnect", &self.on_disconnect.is_some())
            .field("on_reconnecting", &self.on_reconnecting.is_some())
            .field("on_reconnect", &self.on_reconnect.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

impl EventHandlers {
    /// Create a new empty `EventHandlers` (no callbacks registered).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_connect(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_connect = Some(Arc::new(f));
        self
    }

    pub fn on_disconnect(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_disconnect = Some(Arc::new(f));
        self
    }

    /// Register a callback invoked when the connection drops and the
    /// transport starts reconnecting.
    pub fn on_reconnecting(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_reconnecting = Some(Arc::new(f));
        self
    }

    /// Register a callback invoked once the transport has reconnected.
    ///
    /// Buffered operations start replaying right after this returns.
    pub fn on_reconnect(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_reconnect = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    /// Returns `true` if any handler is registered.
    pub fn has_any(&self) -> bool {
        self.on_connect.is_some()
            || self.on_disconnect.is_some()
            || self.on_reconnecting.is_some()
            || self.on_reconnect.is_some()
            || self.on_error.is_some()
    }

    // ---------------------------------------------------------------
    // Internal dispatch helpers
    // ---------------------------------------------------------------

    pub(crate) fn emit_connect(&self) {
        if let Some(cb) = &self.on_connect {
            cb();
        }
    }

    pub(crate) fn emit_disconnect(&self) {
        if let Some(cb) = &self.on_disconnect {
            cb();
        }
    }

    pub(crate) fn emit_reconnecting(&self) {
        if let Some(cb) = &self.on_reconnecting {
            cb();
        }
    }

    pub(crate) fn emit_reconnect(&self) {
        if let Some(cb) = &self.on_reconnect {
            cb();
        }
    }

    pub(crate) fn emit_error(&self, message: &str) {
        if let Some(cb) = &self.on_error {
            cb(message);
        }
    }
}
