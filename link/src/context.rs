//! Shared state of one storage client.
//!
//! Every [`TableRef`](crate::TableRef) and [`ItemRef`](crate::ItemRef) holds
//! an `Arc<LinkContext>`. The context owns the request engine, connection
//! state, offline buffer, subscription registry and schema cache, and is the
//! single place where pub/sub transport events are applied.

use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tokio::runtime::Handle;

use crate::connection::{
    BufferedOperation, Completion, ConnectionState, ConnectionStatus, OfflineBuffer,
    PubSubCommand,
};
use crate::error::{Result, StorageLinkError};
use crate::event_handlers::EventHandlers;
use crate::models::{AttributeValue, EventKind, ItemSnapshot, Presence, TableSchema};
use crate::pending::Pending;
use crate::rest::{self, PendingRequest, Response, RestEngine, RestOperation};
use crate::subscription::{self, Listener, Registration, SubscriptionRegistry};
use crate::transport::{PubSubTransport, TransportEvent};

/// Table schemas fetched with `describeTable`, kept until invalidated.
#[derive(Debug, Default)]
pub struct SchemaCache {
    schemas: RwLock<HashMap<String, TableSchema>>,
}

impl SchemaCache {
    pub fn get(&self, table: &str) -> Option<TableSchema> {
        self.schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(table)
            .cloned()
    }

    pub fn insert(&self, schema: TableSchema) {
        self.schemas
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(schema.name.clone(), schema);
    }

    pub fn invalidate(&self, table: &str) -> bool {
        self.schemas
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(table)
            .is_some()
    }
}

/// Change notification as published on a table channel.
#[derive(Debug, Deserialize)]
struct Notification {
    #[serde(rename = "type")]
    kind: EventKind,
    #[serde(default)]
    data: JsonValue,
}

pub(crate) fn offline_error() -> StorageLinkError {
    StorageLinkError::ConnectivityError("Can not establish connection with storage!".to_string())
}

pub struct LinkContext {
    runtime: Handle,
    engine: RestEngine,
    pubsub: Arc<dyn PubSubTransport>,
    handlers: EventHandlers,
    channel_prefix: String,
    state: Mutex<ConnectionState>,
    offline: Mutex<OfflineBuffer>,
    registry: Mutex<SubscriptionRegistry>,
    schemas: SchemaCache,
}

impl LinkContext {
    pub(crate) fn new(
        runtime: Handle,
        engine: RestEngine,
        pubsub: Arc<dyn PubSubTransport>,
        handlers: EventHandlers,
        channel_prefix: String,
        offline_buffering: bool,
    ) -> Self {
        Self {
            runtime,
            engine,
            pubsub,
            handlers,
            channel_prefix,
            state: Mutex::new(ConnectionState::new(offline_buffering)),
            offline: Mutex::new(OfflineBuffer::new()),
            registry: Mutex::new(SubscriptionRegistry::new()),
            schemas: SchemaCache::default(),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ConnectionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_offline(&self) -> MutexGuard<'_, OfflineBuffer> {
        self.offline.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_registry(&self) -> MutexGuard<'_, SubscriptionRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn runtime(&self) -> &Handle {
        &self.runtime
    }

    pub(crate) fn engine(&self) -> &RestEngine {
        &self.engine
    }

    pub(crate) fn pubsub(&self) -> &Arc<dyn PubSubTransport> {
        &self.pubsub
    }

    pub(crate) fn schemas(&self) -> &SchemaCache {
        &self.schemas
    }

    pub(crate) fn channel(
        &self,
        table: &str,
        primary: Option<&AttributeValue>,
        secondary: Option<&AttributeValue>,
    ) -> String {
        subscription::channel_name(&self.channel_prefix, table, primary, secondary)
    }

    pub(crate) fn status(&self) -> ConnectionStatus {
        self.lock_state().status()
    }

    pub(crate) fn is_offline(&self) -> bool {
        self.lock_state().is_offline()
    }

    pub(crate) fn set_offline_buffering(&self, enabled: bool) {
        info!(
            "[OFFLINE] Offline buffering {}",
            if enabled { "enabled" } else { "disabled" }
        );
        self.lock_state().set_offline_buffering(enabled);
    }

    pub(crate) fn buffered_operations(&self) -> usize {
        self.lock_offline().len()
    }

    // ---------------------------------------------------------------
    // Operation submission
    // ---------------------------------------------------------------

    /// Execute `request` now, buffer it, or reject it, depending on the
    /// connection state at the time of the call.
    pub(crate) fn submit<T, F>(self: &Arc<Self>, request: PendingRequest, convert: F) -> Pending<T>
    where
        T: Send + 'static,
        F: FnOnce(Response) -> Result<T> + Send + 'static,
    {
        let (tx, pending) = Pending::channel();
        let complete: Completion = Box::new(move |result| {
            let _ = tx.send(result.and_then(convert));
        });

        {
            let state = self.lock_state();
            if state.is_offline() {
                if request.operation.is_bufferable() && state.offline_buffering() {
                    self.lock_offline()
                        .push(BufferedOperation { request, complete });
                } else {
                    debug!(
                        "[STORAGE_REST] Rejecting {} while offline",
                        request.operation
                    );
                    complete(Err(offline_error()));
                }
                return pending;
            }
        }

        let ctx = Arc::clone(self);
        self.runtime.spawn(async move {
            let result = ctx.run(&request).await;
            complete(result);
        });
        pending
    }

    /// Run a multi-step operation on the client runtime.
    ///
    /// `operation` is the first request the task will make; operations that
    /// cannot be buffered are rejected up front while offline.
    pub(crate) fn spawn_task<T, F, Fut>(
        self: &Arc<Self>,
        operation: RestOperation,
        task: F,
    ) -> Pending<T>
    where
        T: Send + 'static,
        F: FnOnce(Arc<LinkContext>) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        if !operation.is_bufferable() && self.is_offline() {
            return Pending::failed(offline_error());
        }

        let (tx, pending) = Pending::channel();
        let fut = task(Arc::clone(self));
        self.runtime.spawn(async move {
            let _ = tx.send(fut.await);
        });
        pending
    }

    /// Execute and handle one request, bypassing the offline buffer.
    async fn run(&self, request: &PendingRequest) -> Result<Response> {
        let raw = self.engine.execute(request).await?;
        let schema = request.table.as_deref().and_then(|t| self.schemas.get(t));
        let response = rest::handle(request, raw, schema.as_ref())?;

        if let Response::Schema(schema) = &response {
            self.schemas.insert(schema.clone());
        }
        Ok(response)
    }

    /// Execute `request` from inside a running task. Fails while offline.
    pub(crate) async fn perform(&self, request: PendingRequest) -> Result<Response> {
        if self.is_offline() {
            return Err(offline_error());
        }
        self.run(&request).await
    }

    /// Schema of `table`, from the cache or fetched with `describeTable`.
    pub(crate) async fn schema(&self, table: &str) -> Result<TableSchema> {
        if let Some(schema) = self.schemas.get(table) {
            return Ok(schema);
        }
        debug!("[STORAGE_REST] Schema of {} not cached, describing", table);
        self.perform(PendingRequest::for_table(RestOperation::DescribeTable, table))
            .await?
            .into_schema()
    }

    /// Subscriber count and metadata of `channel`.
    pub(crate) fn presence(self: &Arc<Self>, channel: String) -> Pending<Presence> {
        let (tx, pending) = Pending::channel();
        let pubsub = Arc::clone(&self.pubsub);
        self.runtime.spawn(async move {
            let result = pubsub.presence(&channel).await.map_err(|e| match e {
                StorageLinkError::NotConnected(_) | StorageLinkError::PresenceError(_) => e,
                other => StorageLinkError::PresenceError(other.to_string()),
            });
            let _ = tx.send(result);
        });
        pending
    }

    /// Deliver the result of an initial read to `listener`, followed by the
    /// absent snapshot that ends the feed.
    pub(crate) fn feed_listener(
        &self,
        items: Pending<Vec<ItemSnapshot>>,
        table: String,
        listener: Listener,
    ) -> Pending<()> {
        let (tx, pending) = Pending::channel();
        self.runtime.spawn(async move {
            let result = items.await.map(|items| {
                debug!("[NOTIFY] Initial read of {} fed {} item(s)", table, items.len());
                for item in items {
                    listener.call(item);
                }
                listener.call(ItemSnapshot::absent(table));
            });
            let _ = tx.send(result);
        });
        pending
    }

    // ---------------------------------------------------------------
    // Listeners
    // ---------------------------------------------------------------

    // Lock order: registry, then state, then offline buffer. Registry
    // changes and the pub/sub command they lead to are decided under both
    // locks; commands are issued after releasing them.

    pub(crate) fn add_listener(&self, registration: Registration) {
        let channel = registration.channel(&self.channel_prefix);
        let push = registration.push;
        let connected = self.pubsub.is_connected();

        let command = {
            let mut registry = self.lock_registry();
            if registry.add(&channel, registration) {
                self.lock_state().first_listener(&channel, push, connected)
            } else {
                None
            }
        };
        self.issue(command);
    }

    pub(crate) fn remove_listener(
        &self,
        kind: EventKind,
        table: &str,
        primary: Option<&AttributeValue>,
        secondary: Option<&AttributeValue>,
        listener: &Listener,
    ) {
        let channel = self.channel(table, primary, secondary);
        let command = {
            let mut registry = self.lock_registry();
            if registry.remove(kind, &channel, listener, primary, secondary) {
                self.lock_state().last_listener(&channel)
            } else {
                None
            }
        };
        self.issue(command);
    }

    /// Resubscribe `channels` without push notifications.
    pub(crate) fn disable_push(&self, channels: &[String]) {
        for channel in channels {
            if self.pubsub.is_subscribed(channel) {
                let command = self.lock_state().drop_push(channel);
                self.issue(command);
            }
        }
    }

    pub(crate) fn table_channels(&self, table: &str, on_table: bool) -> Vec<String> {
        self.lock_registry()
            .channel_names(&self.channel_prefix, table, on_table)
    }

    fn issue(&self, command: Option<PubSubCommand>) {
        match command {
            Some(PubSubCommand::Subscribe { channel, push }) => {
                debug!("[PUBSUB] Subscribing to {} (push={})", channel, push);
                self.pubsub.subscribe(&channel, push);
            }
            Some(PubSubCommand::Unsubscribe(channel)) => {
                debug!("[PUBSUB] Unsubscribing from {}", channel);
                self.pubsub.unsubscribe(&channel);
            }
            None => {}
        }
    }

    // ---------------------------------------------------------------
    // Transport events
    // ---------------------------------------------------------------

    pub(crate) fn handle_transport_event(self: &Arc<Self>, event: TransportEvent) {
        match event {
            TransportEvent::Connected => {
                info!("[PUBSUB] Connected");
                self.resume_subscriptions();
                self.handlers.emit_connect();
            }
            TransportEvent::Reconnected => {
                info!("[PUBSUB] Reconnected");
                self.resume_subscriptions();
                self.handlers.emit_reconnect();
                self.start_replay();
            }
            TransportEvent::Reconnecting => {
                info!("[PUBSUB] Connection lost, reconnecting");
                self.lock_state().reconnecting();
                self.handlers.emit_reconnecting();
            }
            TransportEvent::Disconnected => {
                info!("[PUBSUB] Disconnected");
                self.handlers.emit_disconnect();
            }
            TransportEvent::Subscribed(channel) => {
                let command = {
                    let registry = self.lock_registry();
                    self.lock_state()
                        .subscribed(&channel, registry.count(&channel) > 0)
                };
                self.issue(command);
            }
            TransportEvent::Unsubscribed(channel) => {
                debug!("[PUBSUB] Unsubscribed from {}", channel);
                let connected = self.pubsub.is_connected();
                let command = {
                    let registry = self.lock_registry();
                    self.lock_state().unsubscribed(
                        &channel,
                        registry.count(&channel) > 0,
                        registry.wants_push(&channel),
                        connected,
                    )
                };
                self.issue(command);
            }
            TransportEvent::Message { channel, payload } => {
                self.handle_notification(channel, &payload);
            }
            TransportEvent::Exception(message) => {
                warn!("[PUBSUB] Transport exception: {}", message);
                self.handlers.emit_error(&message);
            }
        }
    }

    fn resume_subscriptions(&self) {
        let commands = {
            let registry = self.lock_registry();
            self.lock_state()
                .connected(|channel| registry.wants_push(channel))
        };
        commands.into_iter().for_each(|c| self.issue(Some(c)));
    }

    fn handle_notification(self: &Arc<Self>, channel: String, payload: &str) {
        let Some(table) = subscription::table_from_channel(&self.channel_prefix, &channel)
            .map(str::to_string)
        else {
            warn!("[NOTIFY] Dropping message on foreign channel {}", channel);
            return;
        };

        let notification: Notification = match serde_json::from_str(payload) {
            Ok(notification) => notification,
            Err(e) => {
                warn!("[NOTIFY] Dropping malformed message on {}: {}", channel, e);
                return;
            }
        };

        if let Some(schema) = self.schemas.get(&table) {
            self.deliver(&channel, &table, notification, &schema);
            return;
        }

        let ctx = Arc::clone(self);
        self.runtime.spawn(async move {
            match ctx.schema(&table).await {
                Ok(schema) => ctx.deliver(&channel, &table, notification, &schema),
                Err(e) => warn!(
                    "[NOTIFY] Dropping message on {}: schema of {} unavailable: {}",
                    channel, table, e
                ),
            }
        });
    }

    fn deliver(&self, channel: &str, table: &str, notification: Notification, schema: &TableSchema) {
        let snapshot = ItemSnapshot::from_data(table, &notification.data, Some(schema));
        let (dispatch, command) = {
            let mut registry = self.lock_registry();
            let dispatch = registry.dispatch(channel, notification.kind);
            let command = if dispatch.channel_empty {
                self.lock_state().last_listener(channel)
            } else {
                None
            };
            (dispatch, command)
        };

        debug!(
            "[NOTIFY] {} on {} delivered to {} listener(s)",
            notification.kind,
            channel,
            dispatch.listeners.len()
        );
        for listener in &dispatch.listeners {
            listener.call(snapshot.clone());
        }
        self.issue(command);
    }

    // ---------------------------------------------------------------
    // Offline replay
    // ---------------------------------------------------------------

    fn start_replay(self: &Arc<Self>) {
        if !self.lock_offline().start_drain() {
            return;
        }
        info!(
            "[OFFLINE] Replaying {} buffered operation(s)",
            self.buffered_operations()
        );
        let ctx = Arc::clone(self);
        self.runtime.spawn(async move { ctx.replay().await });
    }

    async fn replay(&self) {
        loop {
            let next = {
                let state = self.lock_state();
                let mut buffer = self.lock_offline();
                if state.is_offline() {
                    info!("[OFFLINE] Offline again, pausing replay ({} left)", buffer.len());
                    buffer.pause_drain();
                    return;
                }
                buffer.next_for_drain()
            };

            let Some(operation) = next else {
                info!("[OFFLINE] Replay complete");
                return;
            };

            debug!("[OFFLINE] Replaying {}", operation.request.operation);
            let result = self.run(&operation.request).await;
            (operation.complete)(result);
        }
    }
}
