//! Typed handling of completed operations.

use serde_json::Value as JsonValue;

use super::{PendingRequest, RawResponse, Response, RestOperation};
use crate::error::{Result, StorageLinkError};
use crate::models::{ItemSnapshot, RawItem, SortOrder, TableCreation, TableSchema, TableUpdate};

/// Convert the raw result of `request` into its typed response.
///
/// `schema` is the cached schema of the target table, when known. Listing
/// and keyed queries need it to sort; item decoding uses it to fill in key
/// values.
pub fn handle(
    request: &PendingRequest,
    raw: RawResponse,
    schema: Option<&TableSchema>,
) -> Result<Response> {
    let table = request.table.as_deref().unwrap_or_default();

    match request.operation {
        RestOperation::ListItems | RestOperation::QueryItems => {
            let items = expect_items(raw)?;
            let items = sort_and_limit(items, request.order, request.limit, schema);
            Ok(Response::Items(
                items
                    .iter()
                    .map(|item| ItemSnapshot::from_raw(table, item, schema))
                    .collect(),
            ))
        }
        RestOperation::GetItem
        | RestOperation::PutItem
        | RestOperation::UpdateItem
        | RestOperation::DeleteItem
        | RestOperation::Incr
        | RestOperation::Decr => {
            let data = expect_data(raw)?;
            Ok(Response::Item(ItemSnapshot::from_data(table, &data, schema)))
        }
        RestOperation::IsAuthenticated | RestOperation::DeleteTable => {
            let data = expect_data(raw)?;
            data.as_bool().map(Response::Flag).ok_or_else(|| {
                StorageLinkError::DecodeError(format!("expected a boolean, got {}", data))
            })
        }
        RestOperation::CreateTable => {
            let created: TableCreation = serde_json::from_value(expect_data(raw)?)?;
            Ok(Response::Created(created))
        }
        RestOperation::UpdateTable => {
            let updated: TableUpdate = serde_json::from_value(expect_data(raw)?)?;
            Ok(Response::Updated(updated))
        }
        RestOperation::ListTables => match raw {
            RawResponse::Tables(tables) => Ok(Response::Tables(tables)),
            other => Err(shape_error(RestOperation::ListTables, &other)),
        },
        RestOperation::DescribeTable => {
            let schema: TableSchema = serde_json::from_value(expect_data(raw)?)?;
            Ok(Response::Schema(schema))
        }
    }
}

fn expect_items(raw: RawResponse) -> Result<Vec<RawItem>> {
    match raw {
        RawResponse::Items(items) => Ok(items),
        other => Err(shape_error(RestOperation::ListItems, &other)),
    }
}

fn expect_data(raw: RawResponse) -> Result<JsonValue> {
    match raw {
        RawResponse::Data(data) => Ok(data),
        other => Err(StorageLinkError::InternalError(format!(
            "expected a single data response, got {:?}",
            other
        ))),
    }
}

fn shape_error(operation: RestOperation, raw: &RawResponse) -> StorageLinkError {
    StorageLinkError::InternalError(format!("unexpected raw response for {}: {:?}", operation, raw))
}

/// Sort by the table's sort key in the requested order, then truncate.
fn sort_and_limit(
    mut items: Vec<RawItem>,
    order: SortOrder,
    limit: Option<usize>,
    schema: Option<&TableSchema>,
) -> Vec<RawItem> {
    if let (Some(schema), true) = (schema, order != SortOrder::Unordered) {
        let key = schema.sort_key_name();
        // missing or non-scalar sort values sort first
        items.sort_by(|a, b| {
            let a = a.get(key).and_then(crate::models::AttributeValue::from_json);
            let b = b.get(key).and_then(crate::models::AttributeValue::from_json);
            match order {
                SortOrder::Descending => b.cmp(&a),
                _ => a.cmp(&b),
            }
        });
    }

    if let Some(limit) = limit {
        items.truncate(limit);
    }
    items
}
