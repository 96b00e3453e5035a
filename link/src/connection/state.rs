use log::debug;
use std::collections::HashSet;

use super::ConnectionStatus;

/// Pub/sub command decided under the state lock, issued after releasing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PubSubCommand {
    Subscribe { channel: String, push: bool },
    Unsubscribe(String),
}

/// Connection status and the subscription commands in flight per channel.
///
/// A channel never has more than one outstanding command. Channels whose
/// subscribe was sent sit in `subscribing` until acknowledged, channels whose
/// unsubscribe was sent in `unsubscribing`. `pending` holds channels with
/// listeners whose subscribe could not be sent yet, either because the
/// transport is down or because an unsubscribe is still in flight.
///
/// Callers pass in what the listener registry knows (whether a channel still
/// has listeners, whether any of them asked for push) while holding the
/// registry lock, so the registry change and the command decided here form
/// one step.
#[derive(Debug)]
pub struct ConnectionState {
    status: ConnectionStatus,
    offline_buffering: bool,
    pending: HashSet<String>,
    subscribing: HashSet<String>,
    unsubscribing: HashSet<String>,
    resubscribe_without_push: HashSet<String>,
}

impl ConnectionState {
    pub fn new(offline_buffering: bool) -> Self {
        Self {
            status: ConnectionStatus::Initial,
            offline_buffering,
            pending: HashSet::new(),
            subscribing: HashSet::new(),
            unsubscribing: HashSet::new(),
            resubscribe_without_push: HashSet::new(),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn is_offline(&self) -> bool {
        self.status.is_offline()
    }

    pub fn offline_buffering(&self) -> bool {
        self.offline_buffering
    }

    pub fn set_offline_buffering(&mut self, enabled: bool) {
        self.offline_buffering = enabled;
    }

    /// (Re)connected: subscribe every channel waiting for a connection, and
    /// resend subscribes that were never acknowledged. `wants_push` reports
    /// whether a channel's listeners asked for push notifications.
    pub fn connected(&mut self, wants_push: impl Fn(&str) -> bool) -> Vec<PubSubCommand> {
        self.status = ConnectionStatus::Connected;

        let ready: Vec<String> = self
            .pending
            .iter()
            .filter(|channel| !self.unsubscribing.contains(channel.as_str()))
            .cloned()
            .collect();
        for channel in ready {
            self.pending.remove(&channel);
            self.subscribing.insert(channel);
        }

        let mut channels: Vec<&String> = self.subscribing.iter().collect();
        channels.sort();
        channels
            .into_iter()
            .map(|channel| PubSubCommand::Subscribe {
                channel: channel.clone(),
                push: wants_push(channel),
            })
            .collect()
    }

    pub fn reconnecting(&mut self) {
        self.status = ConnectionStatus::Reconnecting;
    }

    /// Subscribe acknowledged. If every listener left while it was in flight,
    /// the deferred unsubscribe goes out now.
    pub fn subscribed(&mut self, channel: &str, has_listeners: bool) -> Option<PubSubCommand> {
        if !self.subscribing.remove(channel) {
            return None;
        }
        debug!("[PUBSUB] Subscription to {} acknowledged", channel);
        if has_listeners {
            None
        } else {
            self.unsubscribe(channel)
        }
    }

    /// Unsubscribe acknowledged. Resubscribes when the channel has listeners
    /// again, or still has them because the unsubscribe only dropped push
    /// notifications.
    pub fn unsubscribed(
        &mut self,
        channel: &str,
        has_listeners: bool,
        wants_push: bool,
        connected: bool,
    ) -> Option<PubSubCommand> {
        if !self.unsubscribing.remove(channel) {
            return None;
        }
        let without_push = self.resubscribe_without_push.remove(channel);
        self.pending.remove(channel);
        if !has_listeners {
            return None;
        }

        let push = wants_push && !without_push;
        self.send_subscribe(channel, push, connected)
    }

    /// First listener on `channel`: subscribe now when possible, otherwise
    /// leave it pending for the next connect or unsubscribe acknowledgement.
    pub fn first_listener(
        &mut self,
        channel: &str,
        push: bool,
        connected: bool,
    ) -> Option<PubSubCommand> {
        if self.subscribing.contains(channel) {
            return None;
        }
        if self.unsubscribing.contains(channel) {
            self.pending.insert(channel.to_string());
            return None;
        }
        self.send_subscribe(channel, push, connected)
    }

    /// Last listener left `channel`.
    pub fn last_listener(&mut self, channel: &str) -> Option<PubSubCommand> {
        self.resubscribe_without_push.remove(channel);
        if self.pending.remove(channel) {
            debug!("[PUBSUB] Dropping never-subscribed channel {}", channel);
            return None;
        }
        if self.subscribing.contains(channel) {
            debug!(
                "[PUBSUB] Unsubscribe from {} deferred until its subscribe is acknowledged",
                channel
            );
            return None;
        }
        self.unsubscribe(channel)
    }

    /// Unsubscribe so the channel can come back without push notifications.
    pub fn drop_push(&mut self, channel: &str) -> Option<PubSubCommand> {
        if self.subscribing.contains(channel) || self.pending.contains(channel) {
            return None;
        }
        self.resubscribe_without_push.insert(channel.to_string());
        self.unsubscribe(channel)
    }

    fn send_subscribe(&mut self, channel: &str, push: bool, connected: bool) -> Option<PubSubCommand> {
        if !connected {
            self.pending.insert(channel.to_string());
            return None;
        }
        self.subscribing.insert(channel.to_string());
        Some(PubSubCommand::Subscribe {
            channel: channel.to_string(),
            push,
        })
    }

    fn unsubscribe(&mut self, channel: &str) -> Option<PubSubCommand> {
        if self.unsubscribing.insert(channel.to_string()) {
            Some(PubSubCommand::Unsubscribe(channel.to_string()))
        } else {
            None
        }
    }
}
