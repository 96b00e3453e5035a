use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::StorageLinkError;

/// Kind of change carried by a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Put,
    Update,
    Delete,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Put => "put",
            EventKind::Update => "update",
            EventKind::Delete => "delete",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = StorageLinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "put" => Ok(EventKind::Put),
            "update" => Ok(EventKind::Update),
            "delete" => Ok(EventKind::Delete),
            other => Err(StorageLinkError::DecodeError(format!(
                "unknown event type '{}'",
                other
            ))),
        }
    }
}

/// Sort direction requested for a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    /// Server order, no client-side sorting
    #[default]
    Unordered,
    Ascending,
    Descending,
}
