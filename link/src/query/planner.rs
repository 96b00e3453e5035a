//! Chooses between a direct item fetch, a keyed query and a full scan.
//!
//! Planning is a pure function of the table schema and the query.

use serde_json::{json, Value as JsonValue};

use super::Query;
use crate::models::{AttributeValue, Filter, KeyDataType, TableSchema};
use crate::rest::{PendingRequest, RestOperation};

/// Storage operation chosen for a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadPlan {
    /// Fetch one item by primary key; the item may not exist
    GetItem { primary: AttributeValue },
    /// Keyed query on the primary key, optionally narrowed on the secondary key
    QueryItems {
        primary: AttributeValue,
        filter: Option<Filter>,
    },
    /// Full scan with every filter
    ListItems { filters: Vec<Filter> },
}

pub fn plan(schema: &TableSchema, query: &Query) -> ReadPlan {
    let filters = query.filters();
    let scan = || ReadPlan::ListItems {
        filters: filters.to_vec(),
    };

    if filters.iter().any(|f| f.operator().requires_scan()) {
        return scan();
    }

    let primary_name = schema.primary_key().name.as_str();
    let primary_equality = |f: &Filter| f.is_equality_on(primary_name);

    match schema.secondary_key() {
        Some(secondary) => match filters {
            [only] if primary_equality(only) => ReadPlan::QueryItems {
                primary: operand(only),
                filter: None,
            },
            [_, _] => {
                let key = filters.iter().find(|f| primary_equality(*f));
                let range = filters.iter().find(|f| f.attribute() == secondary.name);
                match (key, range) {
                    (Some(key), Some(range)) => ReadPlan::QueryItems {
                        primary: operand(key),
                        filter: Some(range.clone()),
                    },
                    _ => scan(),
                }
            }
            _ => scan(),
        },
        None => match filters {
            [only] if primary_equality(only) => {
                let value = operand(only);
                let primary = match schema.primary_key().data_type {
                    KeyDataType::String => value.to_string_value(),
                    KeyDataType::Number => value,
                };
                ReadPlan::GetItem { primary }
            }
            _ => scan(),
        },
    }
}

fn operand(filter: &Filter) -> AttributeValue {
    filter
        .value()
        .cloned()
        .unwrap_or_else(|| AttributeValue::String(String::new()))
}

impl ReadPlan {
    /// Build the request for this plan against `schema`'s table.
    pub fn into_request(self, schema: &TableSchema, query: &Query) -> PendingRequest {
        let table = schema.name.as_str();
        match self {
            ReadPlan::GetItem { primary } => PendingRequest::for_table(RestOperation::GetItem, table)
                .field("key", json!({ "primary": primary.to_json() })),
            ReadPlan::QueryItems { primary, filter } => {
                let mut request = PendingRequest::for_table(RestOperation::QueryItems, table)
                    .field("key", json!({ "primary": primary.to_json() }))
                    .with_limit(query.max_items())
                    .with_order(query.order());
                if let Some(limit) = query.max_items() {
                    request = request.field("limit", json!(limit));
                }
                if let Some(filter) = filter {
                    request = request.field("filter", filter.to_json());
                }
                request
            }
            ReadPlan::ListItems { filters } => {
                let mut request = PendingRequest::for_table(RestOperation::ListItems, table)
                    .with_limit(query.max_items())
                    .with_order(query.order());
                if !filters.is_empty() {
                    request = request.field(
                        "filter",
                        JsonValue::Array(filters.iter().map(Filter::to_json).collect()),
                    );
                }
                request
            }
        }
    }
}
