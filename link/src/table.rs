//! Reference to one storage table.

use serde_json::{json, Value as JsonValue};
use std::sync::Arc;

use crate::context::LinkContext;
use crate::error::{Result, StorageLinkError};
use crate::item::{attributes_json, ItemRef};
use crate::models::{
    AttributeValue, Attributes, EventKind, Filter, ItemSnapshot, Presence, ProvisionLoad,
    ProvisionType, TableCreation, TableKey, TableSchema, TableUpdate, Throughput,
};
use crate::pending::Pending;
use crate::query::{self, Query};
use crate::rest::{PendingRequest, Response, RestOperation};
use crate::subscription::{Listener, Registration};

macro_rules! comparison {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        pub fn $name(mut self, attribute: &str, value: impl Into<AttributeValue>) -> Self {
            self.query = self.query.$name(attribute, value);
            self
        }
    };
}

/// A table together with the read query built on it.
///
/// Filter, order and limit methods consume the reference and return a new
/// one; the query only applies to [`get_items`](TableRef::get_items) and to
/// the initial read of a `put` listener.
///
/// ```rust,no_run
/// # async fn example(client: storage_link::StorageClient) -> storage_link::Result<()> {
/// let recent = client
///     .table("messages")
///     .equals("chat", "lobby")
///     .greater_than("ts", 1_700_000_000)
///     .desc()
///     .limit(20)
///     .get_items()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TableRef {
    ctx: Arc<LinkContext>,
    name: String,
    query: Query,
    push: bool,
}

impl TableRef {
    pub(crate) fn new(ctx: Arc<LinkContext>, name: impl Into<String>) -> Self {
        Self {
            ctx,
            name: name.into(),
            query: Query::new(),
            push: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn push_notifications_enabled(&self) -> bool {
        self.push
    }

    // ---------------------------------------------------------------
    // Query building
    // ---------------------------------------------------------------

    pub fn filter(mut self, filter: Filter) -> Self {
        self.query = self.query.filter(filter);
        self
    }

    comparison!(equals);
    comparison!(not_equal);
    comparison!(greater_than);
    comparison!(greater_equal);
    comparison!(less_than);
    comparison!(less_equal);
    comparison!(begins_with);
    comparison!(
        /// Substring match; forces a full scan.
        contains
    );
    comparison!(not_contains);

    pub fn null(mut self, attribute: &str) -> Self {
        self.query = self.query.null(attribute);
        self
    }

    pub fn not_null(mut self, attribute: &str) -> Self {
        self.query = self.query.not_null(attribute);
        self
    }

    pub fn between(
        mut self,
        attribute: &str,
        start: impl Into<AttributeValue>,
        end: impl Into<AttributeValue>,
    ) -> Self {
        self.query = self.query.between(attribute, start, end);
        self
    }

    /// Sort results ascending by the secondary key, or the primary key when
    /// the table has none.
    pub fn asc(mut self) -> Self {
        self.query = self.query.asc();
        self
    }

    pub fn desc(mut self) -> Self {
        self.query = self.query.desc();
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.query = self.query.limit(limit);
        self
    }

    // ---------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------

    /// Run the query. An empty vector means no item matched.
    pub fn get_items(&self) -> Pending<Vec<ItemSnapshot>> {
        read_items(&self.ctx, &self.name, self.query.clone(), None)
    }

    /// Reference to the item with the given key values.
    pub fn item(
        &self,
        primary: impl Into<AttributeValue>,
        secondary: Option<AttributeValue>,
    ) -> ItemRef {
        ItemRef::new(
            Arc::clone(&self.ctx),
            self.name.clone(),
            primary.into(),
            secondary,
            self.push,
        )
    }

    // ---------------------------------------------------------------
    // Table management
    // ---------------------------------------------------------------

    pub fn create(
        &self,
        key: TableKey,
        load: ProvisionLoad,
        kind: ProvisionType,
    ) -> Pending<TableCreation> {
        let key = match key_json(&key) {
            Ok(key) => key,
            Err(e) => return Pending::failed(e),
        };
        let request = PendingRequest::for_table(RestOperation::CreateTable, &self.name)
            .field("provisionLoad", json!(load.value()))
            .field("provisionType", json!(kind.value()))
            .field("key", key);
        self.ctx.submit(request, Response::into_created)
    }

    /// Create the table with custom read/write capacity units.
    pub fn create_with_throughput(
        &self,
        key: TableKey,
        throughput: Throughput,
    ) -> Pending<TableCreation> {
        let key = match key_json(&key) {
            Ok(key) => key,
            Err(e) => return Pending::failed(e),
        };
        let request = PendingRequest::for_table(RestOperation::CreateTable, &self.name)
            .field("provisionType", json!(ProvisionType::Custom.value()))
            .field(
                "throughput",
                json!({ "read": throughput.read, "write": throughput.write }),
            )
            .field("key", key);
        self.ctx.submit(request, Response::into_created)
    }

    /// Delete the table. Resolves to the server's confirmation flag.
    pub fn delete(&self) -> Pending<bool> {
        let ctx = Arc::clone(&self.ctx);
        let table = self.name.clone();
        let request = PendingRequest::for_table(RestOperation::DeleteTable, &self.name);
        self.ctx.submit(request, move |response| {
            ctx.schemas().invalidate(&table);
            response.into_flag()
        })
    }

    /// Fetch the table's schema. The result replaces any cached copy.
    pub fn meta(&self) -> Pending<TableSchema> {
        let request = PendingRequest::for_table(RestOperation::DescribeTable, &self.name);
        self.ctx.submit(request, Response::into_schema)
    }

    /// Change the provisioned capacity.
    ///
    /// The combined move across load and type may be at most one step;
    /// larger changes fail with `ValidationError` before any request is
    /// sent. The schema is fetched first when it is not cached.
    pub fn update(&self, load: ProvisionLoad, kind: ProvisionType) -> Pending<TableUpdate> {
        if let Some(schema) = self.ctx.schemas().get(&self.name) {
            if let Err(e) = schema.validate_provision_change(load, kind) {
                return Pending::failed(e);
            }
            return self
                .ctx
                .submit(update_request(&self.name, load, kind), invalidating(&self.ctx, &self.name));
        }

        let table = self.name.clone();
        self.ctx
            .spawn_task(RestOperation::UpdateTable, move |ctx| async move {
                let schema = ctx.schema(&table).await?;
                schema.validate_provision_change(load, kind)?;
                let response = ctx.perform(update_request(&table, load, kind)).await?;
                invalidating(&ctx, &table)(response)
            })
    }

    /// Store a new item. Buffered while offline.
    pub fn push(&self, item: &Attributes) -> Pending<ItemSnapshot> {
        let request = PendingRequest::for_table(RestOperation::PutItem, &self.name)
            .field("item", attributes_json(item));
        self.ctx.submit(request, Response::into_item)
    }

    // ---------------------------------------------------------------
    // Notifications
    // ---------------------------------------------------------------

    /// Listen to `kind` changes on any item of the table.
    ///
    /// For `Put` the current query result is fed to the listener first,
    /// followed by an absent snapshot; the returned `Pending` resolves once
    /// that feed is done. For other kinds it resolves immediately.
    pub fn on(&self, kind: EventKind, listener: &Listener) -> Pending<()> {
        self.listen(kind, None, listener, false)
    }

    /// Like [`on`](TableRef::on), removed after the first notification.
    pub fn once(&self, kind: EventKind, listener: &Listener) -> Pending<()> {
        self.listen(kind, None, listener, true)
    }

    pub fn off(&self, kind: EventKind, listener: &Listener) {
        self.ctx
            .remove_listener(kind, &self.name, None, None, listener);
    }

    /// Listen to `kind` changes on items sharing one primary key value.
    pub fn on_key(
        &self,
        primary: impl Into<AttributeValue>,
        kind: EventKind,
        listener: &Listener,
    ) -> Pending<()> {
        self.listen(kind, Some(primary.into()), listener, false)
    }

    pub fn once_key(
        &self,
        primary: impl Into<AttributeValue>,
        kind: EventKind,
        listener: &Listener,
    ) -> Pending<()> {
        self.listen(kind, Some(primary.into()), listener, true)
    }

    pub fn off_key(&self, primary: impl Into<AttributeValue>, kind: EventKind, listener: &Listener) {
        let primary = primary.into();
        self.ctx
            .remove_listener(kind, &self.name, Some(&primary), None, listener);
    }

    fn listen(
        &self,
        kind: EventKind,
        primary: Option<AttributeValue>,
        listener: &Listener,
        one_shot: bool,
    ) -> Pending<()> {
        self.ctx.add_listener(Registration {
            kind,
            table: self.name.clone(),
            primary: primary.clone(),
            secondary: None,
            one_shot,
            push: self.push,
            on_table: true,
            listener: listener.clone(),
        });

        if kind != EventKind::Put {
            return Pending::ready(Ok(()));
        }
        let items = read_items(&self.ctx, &self.name, self.query.clone(), primary);
        self.ctx
            .feed_listener(items, self.name.clone(), listener.clone())
    }

    /// Subscriber count and metadata of the table channel.
    pub fn presence(&self) -> Pending<Presence> {
        self.ctx.presence(self.ctx.channel(&self.name, None, None))
    }

    /// Subscribe future listeners with push notifications.
    pub fn enable_push_notifications(mut self) -> Self {
        self.push = true;
        self
    }

    /// Stop push notifications for future listeners and resubscribe the
    /// table's current channels without them.
    pub fn disable_push_notifications(mut self) -> Self {
        self.push = false;
        let channels = self.ctx.table_channels(&self.name, true);
        self.ctx.disable_push(&channels);
        self
    }
}

impl std::fmt::Debug for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableRef")
            .field("name", &self.name)
            .field("query", &self.query)
            .field("push", &self.push)
            .finish()
    }
}

fn key_json(key: &TableKey) -> Result<JsonValue> {
    serde_json::to_value(key).map_err(|e| StorageLinkError::EncodeError(e.to_string()))
}

fn update_request(table: &str, load: ProvisionLoad, kind: ProvisionType) -> PendingRequest {
    PendingRequest::for_table(RestOperation::UpdateTable, table)
        .field("provisionLoad", json!(load.value()))
        .field("provisionType", json!(kind.value()))
}

/// Completion of a table update: the cached schema no longer describes the
/// table's provisioning.
fn invalidating(
    ctx: &Arc<LinkContext>,
    table: &str,
) -> impl FnOnce(Response) -> Result<TableUpdate> + Send + 'static {
    let ctx = Arc::clone(ctx);
    let table = table.to_string();
    move |response| {
        ctx.schemas().invalidate(&table);
        response.into_updated()
    }
}

/// Plan and run `query` on `table`, fetching the schema first if needed.
///
/// `scope` narrows the read to one primary key value unless the query
/// already tests the primary key for equality.
pub(crate) fn read_items(
    ctx: &Arc<LinkContext>,
    table: &str,
    query: Query,
    scope: Option<AttributeValue>,
) -> Pending<Vec<ItemSnapshot>> {
    if let Some(schema) = ctx.schemas().get(table) {
        return ctx.submit(plan_read(&schema, query, scope), items_of);
    }

    let table = table.to_string();
    ctx.spawn_task(RestOperation::ListItems, move |ctx| async move {
        let schema = ctx.schema(&table).await?;
        let response = ctx.perform(plan_read(&schema, query, scope)).await?;
        items_of(response)
    })
}

fn plan_read(schema: &TableSchema, query: Query, scope: Option<AttributeValue>) -> PendingRequest {
    let primary_name = schema.primary_key().name.as_str();
    let query = match scope {
        Some(primary) if !query.has_equality_on(primary_name) => query.equals(primary_name, primary),
        _ => query,
    };
    query::plan(schema, &query).into_request(schema, &query)
}

fn items_of(response: Response) -> Result<Vec<ItemSnapshot>> {
    match response {
        Response::Item(item) if item.is_absent() => Ok(Vec::new()),
        Response::Item(item) => Ok(vec![item]),
        other => other.into_items(),
    }
}
