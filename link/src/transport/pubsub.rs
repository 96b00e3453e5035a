use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Heartbeat, Presence};

/// Connection and message events reported by a [`PubSubTransport`].
///
/// The client does not read these from the transport itself; they are fed
/// in through [`StorageClient::handle_transport_event`](crate::StorageClient::handle_transport_event)
/// or an event channel attached with
/// [`StorageClient::attach_transport_events`](crate::StorageClient::attach_transport_events).
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// First successful connection
    Connected,
    /// The connection was closed
    Disconnected,
    /// The connection dropped and the transport is retrying
    Reconnecting,
    /// The connection was re-established
    Reconnected,
    /// Subscription to a channel is active
    Subscribed(String),
    /// Subscription to a channel was removed
    Unsubscribed(String),
    /// A message arrived on a subscribed channel
    Message { channel: String, payload: String },
    /// Transport-level error
    Exception(String),
}

/// Pub/sub client used to receive change notifications.
///
/// `subscribe` and `unsubscribe` only issue the command; completion is
/// reported back as [`TransportEvent::Subscribed`] /
/// [`TransportEvent::Unsubscribed`].
#[async_trait]
pub trait PubSubTransport: Send + Sync {
    fn is_connected(&self) -> bool;

    fn is_subscribed(&self, channel: &str) -> bool;

    /// Subscribe to `channel`. With `with_notifications` the subscription
    /// also registers for push notifications.
    fn subscribe(&self, channel: &str, with_notifications: bool);

    fn unsubscribe(&self, channel: &str);

    async fn presence(&self, channel: &str) -> Result<Presence>;

    fn set_heartbeat(&self, heartbeat: &Heartbeat) -> Result<()>;

    fn heartbeat(&self) -> Heartbeat;
}
