//! Channel → registrations index with per-channel reference counts.

use log::debug;
use std::collections::HashMap;

use super::{channel_belongs_to, Listener, Registration};
use crate::models::{AttributeValue, EventKind};

/// Listeners selected by a dispatch, to be invoked outside the registry.
#[derive(Debug, Default)]
pub struct Dispatch {
    pub listeners: Vec<Listener>,
    /// This dispatch removed the channel's last registration
    pub channel_empty: bool,
}

/// Registered listeners per event kind and channel.
///
/// The registry is plain data; callers serialize access (the client keeps it
/// behind a mutex) and invoke the listeners returned by [`dispatch`] after
/// releasing the lock.
///
/// [`dispatch`]: SubscriptionRegistry::dispatch
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    puts: HashMap<String, Vec<Registration>>,
    updates: HashMap<String, Vec<Registration>>,
    deletes: HashMap<String, Vec<Registration>>,
    counts: HashMap<String, usize>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self, kind: EventKind) -> &HashMap<String, Vec<Registration>> {
        match kind {
            EventKind::Put => &self.puts,
            EventKind::Update => &self.updates,
            EventKind::Delete => &self.deletes,
        }
    }

    fn map_mut(&mut self, kind: EventKind) -> &mut HashMap<String, Vec<Registration>> {
        match kind {
            EventKind::Put => &mut self.puts,
            EventKind::Update => &mut self.updates,
            EventKind::Delete => &mut self.deletes,
        }
    }

    /// Number of registrations on `channel` across all kinds.
    pub fn count(&self, channel: &str) -> usize {
        self.counts.get(channel).copied().unwrap_or(0)
    }

    fn decrement(&mut self, channel: &str, by: usize) -> usize {
        let remaining = self.count(channel).saturating_sub(by);
        if remaining == 0 {
            self.counts.remove(channel);
        } else {
            self.counts.insert(channel.to_string(), remaining);
        }
        remaining
    }

    /// Register on `channel`. Returns `true` when this is the channel's first
    /// registration. An equal registration already present is left alone.
    pub fn add(&mut self, channel: &str, registration: Registration) -> bool {
        let kind = registration.kind;
        let registrations = self.map_mut(kind).entry(channel.to_string()).or_default();
        if registrations.contains(&registration) {
            debug!("[REGISTRY] Duplicate {} listener on {} ignored", kind, channel);
            return false;
        }
        registrations.push(registration);

        let count = self.counts.entry(channel.to_string()).or_insert(0);
        *count += 1;
        debug!("[REGISTRY] {} listener added on {} (count={})", kind, channel, count);
        *count == 1
    }

    /// Remove every `kind` registration of `listener` on `channel` with the
    /// given key scope. Returns `true` when something was removed and the
    /// channel is now empty.
    pub fn remove(
        &mut self,
        kind: EventKind,
        channel: &str,
        listener: &Listener,
        primary: Option<&AttributeValue>,
        secondary: Option<&AttributeValue>,
    ) -> bool {
        let removed = match self.map_mut(kind).get_mut(channel) {
            Some(registrations) => {
                let before = registrations.len();
                registrations.retain(|r| !r.matches_target(listener, primary, secondary));
                before - registrations.len()
            }
            None => 0,
        };
        self.prune(kind, channel);

        if removed == 0 {
            return false;
        }
        let remaining = self.decrement(channel, removed);
        debug!(
            "[REGISTRY] {} {} listener(s) removed from {} (count={})",
            removed, kind, channel, remaining
        );
        remaining == 0
    }

    /// Select the listeners to notify of a `kind` change on `channel`,
    /// dropping one-shot registrations.
    pub fn dispatch(&mut self, channel: &str, kind: EventKind) -> Dispatch {
        let mut listeners = Vec::new();
        let mut fired_once = 0;

        if let Some(registrations) = self.map_mut(kind).get_mut(channel) {
            registrations.retain(|r| {
                listeners.push(r.listener.clone());
                if r.one_shot {
                    fired_once += 1;
                    false
                } else {
                    true
                }
            });
        }
        self.prune(kind, channel);

        let channel_empty = fired_once > 0 && self.decrement(channel, fired_once) == 0;

        Dispatch {
            listeners,
            channel_empty,
        }
    }

    fn prune(&mut self, kind: EventKind, channel: &str) {
        let map = self.map_mut(kind);
        if map.get(channel).map_or(false, Vec::is_empty) {
            map.remove(channel);
        }
    }

    /// Channels of `table` holding at least one registration made through a
    /// table reference (`on_table`) or an item reference (`!on_table`).
    pub fn channel_names(&self, prefix: &str, table: &str, on_table: bool) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for kind in [EventKind::Put, EventKind::Delete, EventKind::Update] {
            for (channel, registrations) in self.map(kind) {
                if names.contains(channel) || !channel_belongs_to(prefix, channel, table) {
                    continue;
                }
                if registrations.iter().any(|r| r.on_table == on_table) {
                    names.push(channel.clone());
                }
            }
        }
        names.sort();
        names
    }

    /// Whether a registration on `channel` asked for push notifications.
    pub fn wants_push(&self, channel: &str) -> bool {
        [EventKind::Put, EventKind::Update, EventKind::Delete]
            .iter()
            .filter_map(|kind| self.map(*kind).get(channel))
            .flatten()
            .any(|r| r.push)
    }
}
