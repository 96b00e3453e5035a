//! Storage REST operations: request description, execution and typed
//! response handling.

pub mod engine;
pub mod response;

use serde_json::{Map, Value as JsonValue};
use std::fmt;

use crate::models::{ItemSnapshot, RawItem, SortOrder, TableCreation, TableSchema, TableUpdate};

pub use engine::RestEngine;
pub use response::handle;

/// Every operation exposed by the storage REST API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RestOperation {
    IsAuthenticated,
    ListItems,
    QueryItems,
    GetItem,
    PutItem,
    UpdateItem,
    DeleteItem,
    CreateTable,
    UpdateTable,
    DeleteTable,
    ListTables,
    DescribeTable,
    Incr,
    Decr,
}

impl RestOperation {
    /// Path segment of the operation.
    pub fn name(self) -> &'static str {
        match self {
            RestOperation::IsAuthenticated => "isAuthenticated",
            RestOperation::ListItems => "listItems",
            RestOperation::QueryItems => "queryItems",
            RestOperation::GetItem => "getItem",
            RestOperation::PutItem => "putItem",
            RestOperation::UpdateItem => "updateItem",
            RestOperation::DeleteItem => "deleteItem",
            RestOperation::CreateTable => "createTable",
            RestOperation::UpdateTable => "updateTable",
            RestOperation::DeleteTable => "deleteTable",
            RestOperation::ListTables => "listTables",
            RestOperation::DescribeTable => "describeTable",
            RestOperation::Incr => "incr",
            RestOperation::Decr => "decr",
        }
    }

    /// Operations that are queued instead of rejected while offline.
    pub fn is_bufferable(self) -> bool {
        matches!(
            self,
            RestOperation::PutItem | RestOperation::UpdateItem | RestOperation::DeleteItem
        )
    }

    pub(crate) fn pages_items(self) -> bool {
        matches!(self, RestOperation::ListItems | RestOperation::QueryItems)
    }
}

impl fmt::Display for RestOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One logical operation waiting to be executed.
///
/// Credentials are added by the engine when the body is sent; the body only
/// holds operation fields.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    pub operation: RestOperation,
    /// Table the operation targets, used to decode items
    pub table: Option<String>,
    pub body: Map<String, JsonValue>,
    /// Maximum number of items to return
    pub limit: Option<usize>,
    pub order: SortOrder,
}

impl PendingRequest {
    pub fn new(operation: RestOperation) -> Self {
        Self {
            operation,
            table: None,
            body: Map::new(),
            limit: None,
            order: SortOrder::Unordered,
        }
    }

    /// Target `table` and add it to the body.
    pub fn for_table(operation: RestOperation, table: &str) -> Self {
        Self::new(operation)
            .with_table(table)
            .field("table", JsonValue::String(table.to_string()))
    }

    pub fn with_table(mut self, table: &str) -> Self {
        self.table = Some(table.to_string());
        self
    }

    /// Set a body field.
    pub fn field(mut self, name: &str, value: JsonValue) -> Self {
        self.body.insert(name.to_string(), value);
        self
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }
}

/// Result of running a request to completion, before typed handling.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResponse {
    /// Every item of every page, in page order
    Items(Vec<RawItem>),
    /// Every table name of every page
    Tables(Vec<String>),
    /// The `data` member of a single response
    Data(JsonValue),
}

/// Typed result of an operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Items(Vec<ItemSnapshot>),
    Item(ItemSnapshot),
    Tables(Vec<String>),
    Flag(bool),
    Schema(TableSchema),
    Created(TableCreation),
    Updated(TableUpdate),
}

macro_rules! response_accessor {
    ($fn_name:ident, $variant:ident, $ty:ty) => {
        pub fn $fn_name(self) -> crate::error::Result<$ty> {
            match self {
                Response::$variant(value) => Ok(value),
                other => Err(crate::error::StorageLinkError::InternalError(format!(
                    "unexpected response {:?}",
                    other
                ))),
            }
        }
    };
}

impl Response {
    response_accessor!(into_items, Items, Vec<ItemSnapshot>);
    response_accessor!(into_item, Item, ItemSnapshot);
    response_accessor!(into_tables, Tables, Vec<String>);
    response_accessor!(into_flag, Flag, bool);
    response_accessor!(into_schema, Schema, TableSchema);
    response_accessor!(into_created, Created, TableCreation);
    response_accessor!(into_updated, Updated, TableUpdate);
}
