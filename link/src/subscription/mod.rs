//! Change-notification subscriptions: channel naming, listeners and the
//! registry that tracks them.

pub mod registry;

use std::fmt;
use std::sync::Arc;

use crate::models::{AttributeValue, EventKind, ItemSnapshot};

pub use registry::{Dispatch, SubscriptionRegistry};

/// Callback receiving item snapshots.
///
/// Two listeners are the same listener when they wrap the same allocation:
/// clone a `Listener` to register and later remove it.
#[derive(Clone)]
pub struct Listener(Arc<dyn Fn(ItemSnapshot) + Send + Sync>);

impl Listener {
    pub fn new(f: impl Fn(ItemSnapshot) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn call(&self, snapshot: ItemSnapshot) {
        (self.0)(snapshot)
    }

    pub fn same_as(&self, other: &Listener) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for Listener {}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listener({:p})", Arc::as_ptr(&self.0))
    }
}

impl<F> From<F> for Listener
where
    F: Fn(ItemSnapshot) + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Listener::new(f)
    }
}

/// One listener registered for one kind of change on one channel.
#[derive(Debug, Clone)]
pub struct Registration {
    pub kind: EventKind,
    pub table: String,
    pub primary: Option<AttributeValue>,
    pub secondary: Option<AttributeValue>,
    /// Removed after its first delivery
    pub one_shot: bool,
    /// Subscribe with push notifications
    pub push: bool,
    /// Registered through a table reference rather than an item reference
    pub on_table: bool,
    pub listener: Listener,
}

impl Registration {
    pub fn channel(&self, prefix: &str) -> String {
        channel_name(
            prefix,
            &self.table,
            self.primary.as_ref(),
            self.secondary.as_ref(),
        )
    }

    fn matches_target(
        &self,
        listener: &Listener,
        primary: Option<&AttributeValue>,
        secondary: Option<&AttributeValue>,
    ) -> bool {
        self.listener.same_as(listener)
            && self.primary.as_ref() == primary
            && self.secondary.as_ref() == secondary
    }
}

impl PartialEq for Registration {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.table == other.table
            && self.primary == other.primary
            && self.secondary == other.secondary
            && self.push == other.push
            && self.listener.same_as(&other.listener)
    }
}

/// `<prefix>_<table>`, `<prefix>_<table>:<primary>` or
/// `<prefix>_<table>:<primary>_<secondary>`.
pub fn channel_name(
    prefix: &str,
    table: &str,
    primary: Option<&AttributeValue>,
    secondary: Option<&AttributeValue>,
) -> String {
    match (primary, secondary) {
        (Some(primary), Some(secondary)) => {
            format!("{}_{}:{}_{}", prefix, table, primary, secondary)
        }
        (Some(primary), None) => format!("{}_{}:{}", prefix, table, primary),
        _ => format!("{}_{}", prefix, table),
    }
}

/// Table name encoded in a channel name, if the channel uses `prefix`.
pub fn table_from_channel<'a>(prefix: &str, channel: &'a str) -> Option<&'a str> {
    let rest = channel.strip_prefix(prefix)?.strip_prefix('_')?;
    let table = rest.split(':').next().unwrap_or(rest);
    if table.is_empty() {
        None
    } else {
        Some(table)
    }
}

/// Whether `channel` belongs to `table`.
pub fn channel_belongs_to(prefix: &str, channel: &str, table: &str) -> bool {
    table_from_channel(prefix, channel) == Some(table)
}
