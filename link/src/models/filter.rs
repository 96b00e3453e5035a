use serde_json::{json, Value as JsonValue};
use std::fmt;

use super::attribute_value::AttributeValue;

/// Comparison operator of a [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    Equals,
    NotEqual,
    GreaterThan,
    GreaterEqual,
    LessThan,
    LessEqual,
    BeginsWith,
    Contains,
    NotContains,
    Null,
    NotNull,
    Between,
}

impl FilterOperator {
    /// Operator name on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            FilterOperator::Equals => "equals",
            FilterOperator::NotEqual => "notEqual",
            FilterOperator::GreaterThan => "greaterThan",
            FilterOperator::GreaterEqual => "greaterEqual",
            FilterOperator::LessThan => "lessThan",
            FilterOperator::LessEqual => "lessEqual",
            FilterOperator::BeginsWith => "beginsWith",
            FilterOperator::Contains => "contains",
            FilterOperator::NotContains => "notContains",
            FilterOperator::Null => "null",
            FilterOperator::NotNull => "notNull",
            FilterOperator::Between => "between",
        }
    }

    /// Keyed queries cannot evaluate these operators; any of them forces a
    /// full scan.
    pub fn requires_scan(self) -> bool {
        matches!(
            self,
            FilterOperator::NotEqual
                | FilterOperator::Null
                | FilterOperator::NotNull
                | FilterOperator::Contains
                | FilterOperator::NotContains
        )
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One condition over an item attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Filter {
    operator: FilterOperator,
    attribute: String,
    value: Option<AttributeValue>,
    upper: Option<AttributeValue>,
}

impl Filter {
    fn unary(operator: FilterOperator, attribute: impl Into<String>) -> Self {
        Self {
            operator,
            attribute: attribute.into(),
            value: None,
            upper: None,
        }
    }

    /// A filter with a single operand. `Null`, `NotNull` and `Between` have
    /// their own constructors.
    pub fn new(
        operator: FilterOperator,
        attribute: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        Self {
            operator,
            attribute: attribute.into(),
            value: Some(value.into()),
            upper: None,
        }
    }

    pub fn null(attribute: impl Into<String>) -> Self {
        Self::unary(FilterOperator::Null, attribute)
    }

    pub fn not_null(attribute: impl Into<String>) -> Self {
        Self::unary(FilterOperator::NotNull, attribute)
    }

    pub fn between(
        attribute: impl Into<String>,
        start: impl Into<AttributeValue>,
        end: impl Into<AttributeValue>,
    ) -> Self {
        Self {
            operator: FilterOperator::Between,
            attribute: attribute.into(),
            value: Some(start.into()),
            upper: Some(end.into()),
        }
    }

    pub fn operator(&self) -> FilterOperator {
        self.operator
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn value(&self) -> Option<&AttributeValue> {
        self.value.as_ref()
    }

    /// Whether this is an equality test on `attribute`.
    pub fn is_equality_on(&self, attribute: &str) -> bool {
        self.operator == FilterOperator::Equals && self.attribute == attribute
    }

    /// Wire representation: `{"operator", "item", "value"?}`; `between`
    /// carries its bounds as a two element `value` array.
    pub fn to_json(&self) -> JsonValue {
        let mut obj = json!({
            "operator": self.operator.as_str(),
            "item": self.attribute,
        });
        let value = match (&self.value, &self.upper) {
            (Some(start), Some(end)) => Some(json!([start.to_json(), end.to_json()])),
            (Some(value), None) => Some(value.to_json()),
            _ => None,
        };
        if let (Some(value), JsonValue::Object(map)) = (value, &mut obj) {
            map.insert("value".to_string(), value);
        }
        obj
    }
}
