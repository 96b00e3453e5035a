//! Reference to one item of a table.

use serde_json::{json, Map, Value as JsonValue};
use std::sync::Arc;

use crate::context::LinkContext;
use crate::models::{AttributeValue, Attributes, EventKind, ItemSnapshot, Presence, TableSchema};
use crate::pending::Pending;
use crate::rest::{PendingRequest, Response, RestOperation};
use crate::subscription::{Listener, Registration};

/// An item addressed by its primary and optional secondary key value.
///
/// Mutations (`set`, `del`) are buffered while the connection is down;
/// everything else fails with `ConnectivityError` until it is back.
#[derive(Clone)]
pub struct ItemRef {
    ctx: Arc<LinkContext>,
    table: String,
    primary: AttributeValue,
    secondary: Option<AttributeValue>,
    push: bool,
}

impl ItemRef {
    pub(crate) fn new(
        ctx: Arc<LinkContext>,
        table: String,
        primary: AttributeValue,
        secondary: Option<AttributeValue>,
        push: bool,
    ) -> Self {
        Self {
            ctx,
            table,
            primary,
            secondary,
            push,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary(&self) -> &AttributeValue {
        &self.primary
    }

    pub fn secondary(&self) -> Option<&AttributeValue> {
        self.secondary.as_ref()
    }

    /// Channel carrying this item's change notifications.
    pub fn channel(&self) -> String {
        self.ctx
            .channel(&self.table, Some(&self.primary), self.secondary.as_ref())
    }

    fn key(&self) -> JsonValue {
        let mut key = Map::new();
        key.insert("primary".to_string(), self.primary.to_json());
        if let Some(secondary) = &self.secondary {
            key.insert("secondary".to_string(), secondary.to_json());
        }
        JsonValue::Object(key)
    }

    fn request(&self, operation: RestOperation) -> PendingRequest {
        PendingRequest::for_table(operation, &self.table).field("key", self.key())
    }

    /// Current state of the item; absent if it does not exist.
    pub fn get(&self) -> Pending<ItemSnapshot> {
        self.ctx
            .submit(self.request(RestOperation::GetItem), Response::into_item)
    }

    /// Update the item's attributes. Key attributes in `item` are ignored.
    ///
    /// The table schema is needed to recognise key attributes; when it is
    /// not cached it is fetched first, which is not possible offline.
    pub fn set(&self, item: &Attributes) -> Pending<ItemSnapshot> {
        if let Some(schema) = self.ctx.schemas().get(&self.table) {
            let request = self
                .request(RestOperation::UpdateItem)
                .field("item", without_keys(item, &schema));
            return self.ctx.submit(request, Response::into_item);
        }

        let item = item.clone();
        let request = self.request(RestOperation::UpdateItem);
        let table = self.table.clone();
        self.ctx
            .spawn_task(RestOperation::DescribeTable, move |ctx| async move {
                let schema = ctx.schema(&table).await?;
                let request = request.field("item", without_keys(&item, &schema));
                ctx.perform(request).await?.into_item()
            })
    }

    /// Delete the item. Resolves to its last state.
    pub fn del(&self) -> Pending<ItemSnapshot> {
        self.ctx
            .submit(self.request(RestOperation::DeleteItem), Response::into_item)
    }

    /// Increment a numeric attribute by `value`, or by one.
    pub fn incr(&self, property: &str, value: Option<i64>) -> Pending<ItemSnapshot> {
        self.counter(RestOperation::Incr, property, value)
    }

    /// Decrement a numeric attribute by `value`, or by one.
    pub fn decr(&self, property: &str, value: Option<i64>) -> Pending<ItemSnapshot> {
        self.counter(RestOperation::Decr, property, value)
    }

    fn counter(
        &self,
        operation: RestOperation,
        property: &str,
        value: Option<i64>,
    ) -> Pending<ItemSnapshot> {
        let mut request = self.request(operation).field("property", json!(property));
        if let Some(value) = value {
            request = request.field("value", json!(value));
        }
        self.ctx.submit(request, Response::into_item)
    }

    /// Listen to `kind` changes of this item. For `Put` the current state is
    /// delivered first, then an absent snapshot.
    pub fn on(&self, kind: EventKind, listener: &Listener) -> Pending<()> {
        self.listen(kind, listener, false)
    }

    pub fn once(&self, kind: EventKind, listener: &Listener) -> Pending<()> {
        self.listen(kind, listener, true)
    }

    pub fn off(&self, kind: EventKind, listener: &Listener) {
        self.ctx.remove_listener(
            kind,
            &self.table,
            Some(&self.primary),
            self.secondary.as_ref(),
            listener,
        );
    }

    fn listen(&self, kind: EventKind, listener: &Listener, one_shot: bool) -> Pending<()> {
        self.ctx.add_listener(Registration {
            kind,
            table: self.table.clone(),
            primary: Some(self.primary.clone()),
            secondary: self.secondary.clone(),
            one_shot,
            push: self.push,
            on_table: false,
            listener: listener.clone(),
        });

        if kind != EventKind::Put {
            return Pending::ready(Ok(()));
        }
        let current = self.ctx.submit(self.request(RestOperation::GetItem), |response| {
            let item = response.into_item()?;
            Ok(if item.is_absent() { Vec::new() } else { vec![item] })
        });
        self.ctx
            .feed_listener(current, self.table.clone(), listener.clone())
    }

    pub fn presence(&self) -> Pending<Presence> {
        self.ctx.presence(self.channel())
    }

    pub fn enable_push_notifications(mut self) -> Self {
        self.push = true;
        self
    }

    /// Stop push notifications on this item's channel if it is subscribed.
    pub fn disable_push_notifications(mut self) -> Self {
        self.push = false;
        self.ctx.disable_push(&[self.channel()]);
        self
    }
}

impl std::fmt::Debug for ItemRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemRef")
            .field("table", &self.table)
            .field("primary", &self.primary)
            .field("secondary", &self.secondary)
            .field("push", &self.push)
            .finish()
    }
}

/// JSON object of `item`'s attributes.
pub(crate) fn attributes_json(item: &Attributes) -> JsonValue {
    JsonValue::Object(
        item.iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect(),
    )
}

fn without_keys(item: &Attributes, schema: &TableSchema) -> JsonValue {
    let secondary = schema.secondary_key().map(|key| key.name.as_str());
    JsonValue::Object(
        item.iter()
            .filter(|(name, _)| {
                name.as_str() != schema.primary_key().name && Some(name.as_str()) != secondary
            })
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect(),
    )
}
