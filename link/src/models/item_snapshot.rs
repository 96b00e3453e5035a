use std::collections::BTreeMap;

use serde_json::{Map, Value as JsonValue};

use super::attribute_value::AttributeValue;
use super::table_schema::TableSchema;

/// Attribute name → value mapping of one item.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// Raw item object as decoded from a response page.
pub type RawItem = Map<String, JsonValue>;

/// The state of one item at a point in time.
///
/// A snapshot either carries the item's attributes or is the explicit
/// "absent" marker: a confirmed non-existent item, or the terminal
/// "no more data" signal delivered to listeners after an initial read.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemSnapshot {
    table: String,
    primary: Option<AttributeValue>,
    secondary: Option<AttributeValue>,
    attributes: Option<Attributes>,
}

impl ItemSnapshot {
    /// Build a snapshot, extracting key values when the schema is known.
    pub fn new(table: impl Into<String>, attributes: Attributes, schema: Option<&TableSchema>) -> Self {
        let (primary, secondary) = match schema {
            Some(schema) => (
                attributes.get(&schema.primary_key().name).cloned(),
                schema
                    .secondary_key()
                    .and_then(|key| attributes.get(&key.name).cloned()),
            ),
            None => (None, None),
        };

        Self {
            table: table.into(),
            primary,
            secondary,
            attributes: Some(attributes),
        }
    }

    /// The absent marker for a table.
    pub fn absent(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            primary: None,
            secondary: None,
            attributes: None,
        }
    }

    /// Decode a raw item. Attributes that are neither strings nor numbers are
    /// skipped.
    pub fn from_raw(table: &str, raw: &RawItem, schema: Option<&TableSchema>) -> Self {
        let mut attributes = Attributes::new();
        for (name, value) in raw {
            match AttributeValue::from_json(value) {
                Some(value) => {
                    attributes.insert(name.clone(), value);
                }
                None => {
                    log::debug!("[SNAPSHOT] Skipping non-scalar attribute '{}' on {}", name, table);
                }
            }
        }
        Self::new(table, attributes, schema)
    }

    /// Decode the `data` of a single-item response. `null` or `{}` is absent.
    pub fn from_data(table: &str, data: &JsonValue, schema: Option<&TableSchema>) -> Self {
        match data {
            JsonValue::Object(map) if !map.is_empty() => Self::from_raw(table, map, schema),
            _ => Self::absent(table),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary(&self) -> Option<&AttributeValue> {
        self.primary.as_ref()
    }

    pub fn secondary(&self) -> Option<&AttributeValue> {
        self.secondary.as_ref()
    }

    /// Item attributes, `None` for the absent marker.
    pub fn attributes(&self) -> Option<&Attributes> {
        self.attributes.as_ref()
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.as_ref().and_then(|attrs| attrs.get(name))
    }

    pub fn is_absent(&self) -> bool {
        self.attributes.is_none()
    }

    pub fn into_attributes(self) -> Option<Attributes> {
        self.attributes
    }
}
