use serde::{Deserialize, Serialize};
use serde_json::{Number, Value as JsonValue};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A single attribute value stored in an item: a string or a number.
///
/// Values are totally ordered so they can be used as sort keys. Numbers
/// compare numerically, strings lexicographically, and any number sorts
/// before any string.
///
/// # Example
///
/// ```rust
/// use storage_link::AttributeValue;
///
/// let a = AttributeValue::from(10);
/// let b = AttributeValue::from(9.5);
/// assert!(b < a);
/// assert!(a < AttributeValue::from("10"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Number(Number),
    String(String),
}

impl AttributeValue {
    /// Convert a decoded JSON value. Only strings and numbers are attributes.
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::String(s) => Some(AttributeValue::String(s.clone())),
            JsonValue::Number(n) => Some(AttributeValue::Number(n.clone())),
            _ => None,
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            AttributeValue::String(s) => JsonValue::String(s.clone()),
            AttributeValue::Number(n) => JsonValue::Number(n.clone()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            AttributeValue::Number(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => n.as_f64(),
            AttributeValue::String(_) => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, AttributeValue::Number(_))
    }

    /// Re-type the value as a string (numbers use their JSON rendering).
    pub fn to_string_value(&self) -> AttributeValue {
        match self {
            AttributeValue::String(_) => self.clone(),
            AttributeValue::Number(n) => AttributeValue::String(n.to_string()),
        }
    }

    fn numeric_key(n: &Number) -> f64 {
        let v = n.as_f64().unwrap_or(0.0);
        // -0.0 and 0.0 must hash alike
        if v == 0.0 {
            0.0
        } else {
            v
        }
    }
}

impl PartialEq for AttributeValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for AttributeValue {}

impl PartialOrd for AttributeValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AttributeValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (AttributeValue::Number(a), AttributeValue::Number(b)) => {
                Self::numeric_key(a).total_cmp(&Self::numeric_key(b))
            }
            (AttributeValue::String(a), AttributeValue::String(b)) => a.cmp(b),
            (AttributeValue::Number(_), AttributeValue::String(_)) => Ordering::Less,
            (AttributeValue::String(_), AttributeValue::Number(_)) => Ordering::Greater,
        }
    }
}

impl Hash for AttributeValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            AttributeValue::Number(n) => {
                0u8.hash(state);
                Self::numeric_key(n).to_bits().hash(state);
            }
            AttributeValue::String(s) => {
                1u8.hash(state);
                s.hash(state);
            }
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::String(s) => write!(f, "{}", s),
            AttributeValue::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Number(Number::from(value))
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        AttributeValue::Number(Number::from(value))
    }
}

impl From<u64> for AttributeValue {
    fn from(value: u64) -> Self {
        AttributeValue::Number(Number::from(value))
    }
}

impl From<f64> for AttributeValue {
    /// Non-finite floats have no JSON representation and become `0`.
    fn from(value: f64) -> Self {
        AttributeValue::Number(Number::from_f64(value).unwrap_or_else(|| Number::from(0)))
    }
}
