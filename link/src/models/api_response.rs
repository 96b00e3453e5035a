use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::item_snapshot::RawItem;

/// Envelope of every storage response: either `error` or `data`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,

    #[serde(default)]
    pub data: JsonValue,
}

/// Error object returned by the storage service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Error code
    #[serde(default)]
    pub code: i64,

    /// Human-readable error message
    #[serde(default)]
    pub message: String,
}

/// One page of `listItems` / `queryItems`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemsPage {
    #[serde(default)]
    pub items: Vec<RawItem>,

    /// Continuation token; absent on the last page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_key: Option<JsonValue>,
}

/// One page of `listTables`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TablesPage {
    #[serde(default)]
    pub tables: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_table: Option<String>,
}

impl TablesPage {
    /// The token to send as `startTable`, if another page exists.
    pub fn next_token(&self) -> Option<&str> {
        self.stop_table.as_deref().filter(|token| !token.is_empty())
    }
}

impl ItemsPage {
    pub fn next_token(&self) -> Option<&JsonValue> {
        self.stop_key.as_ref().filter(|token| !token.is_null())
    }
}
