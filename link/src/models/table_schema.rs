use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::StorageLinkError;

/// Data type of a key attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyDataType {
    String,
    Number,
}

impl fmt::Display for KeyDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyDataType::String => write!(f, "string"),
            KeyDataType::Number => write!(f, "number"),
        }
    }
}

/// Name and type of one key attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeySchema {
    pub name: String,
    pub data_type: KeyDataType,
}

impl KeySchema {
    pub fn new(name: impl Into<String>, data_type: KeyDataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Primary and optional secondary key declaration of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableKey {
    pub primary: KeySchema,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<KeySchema>,
}

impl TableKey {
    pub fn primary(name: impl Into<String>, data_type: KeyDataType) -> Self {
        Self {
            primary: KeySchema::new(name, data_type),
            secondary: None,
        }
    }

    pub fn with_secondary(mut self, name: impl Into<String>, data_type: KeyDataType) -> Self {
        self.secondary = Some(KeySchema::new(name, data_type));
        self
    }
}

/// Read/write balance of a table's provisioned capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ProvisionLoad {
    Read,
    Write,
    Balanced,
    Custom,
}

impl ProvisionLoad {
    pub fn value(self) -> u8 {
        match self {
            ProvisionLoad::Read => 1,
            ProvisionLoad::Write => 2,
            ProvisionLoad::Balanced => 3,
            ProvisionLoad::Custom => 4,
        }
    }
}

impl From<ProvisionLoad> for u8 {
    fn from(load: ProvisionLoad) -> Self {
        load.value()
    }
}

impl TryFrom<u8> for ProvisionLoad {
    type Error = StorageLinkError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ProvisionLoad::Read),
            2 => Ok(ProvisionLoad::Write),
            3 => Ok(ProvisionLoad::Balanced),
            4 => Ok(ProvisionLoad::Custom),
            other => Err(StorageLinkError::DecodeError(format!(
                "unknown provision load {}",
                other
            ))),
        }
    }
}

/// Size class of a table's provisioned capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ProvisionType {
    Light,
    Medium,
    Intermediate,
    Heavy,
    Custom,
}

impl ProvisionType {
    pub fn value(self) -> u8 {
        match self {
            ProvisionType::Light => 1,
            ProvisionType::Medium => 2,
            ProvisionType::Intermediate => 3,
            ProvisionType::Heavy => 4,
            ProvisionType::Custom => 5,
        }
    }
}

impl From<ProvisionType> for u8 {
    fn from(kind: ProvisionType) -> Self {
        kind.value()
    }
}

impl TryFrom<u8> for ProvisionType {
    type Error = StorageLinkError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ProvisionType::Light),
            2 => Ok(ProvisionType::Medium),
            3 => Ok(ProvisionType::Intermediate),
            4 => Ok(ProvisionType::Heavy),
            5 => Ok(ProvisionType::Custom),
            other => Err(StorageLinkError::DecodeError(format!(
                "unknown provision type {}",
                other
            ))),
        }
    }
}

/// Custom read/write capacity units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Throughput {
    pub read: u32,
    pub write: u32,
}

impl Throughput {
    pub fn new(read: u32, write: u32) -> Self {
        Self { read, write }
    }
}

/// Table metadata as returned by `describeTable`.
///
/// Once fetched, a schema is cached for the lifetime of the client (see
/// [`StorageClient::invalidate_schema`](crate::StorageClient::invalidate_schema)).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSchema {
    #[serde(alias = "table")]
    pub name: String,
    pub key: TableKey,
    pub provision_load: ProvisionLoad,
    pub provision_type: ProvisionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throughput: Option<Throughput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_count: Option<u64>,
}

impl TableSchema {
    pub fn new(
        name: impl Into<String>,
        key: TableKey,
        provision_load: ProvisionLoad,
        provision_type: ProvisionType,
    ) -> Self {
        Self {
            name: name.into(),
            key,
            provision_load,
            provision_type,
            throughput: None,
            status: None,
            creation_date: None,
            size: None,
            item_count: None,
        }
    }

    pub fn primary_key(&self) -> &KeySchema {
        &self.key.primary
    }

    pub fn secondary_key(&self) -> Option<&KeySchema> {
        self.key.secondary.as_ref()
    }

    /// Name of the attribute used to sort unordered listings: the secondary
    /// key when declared, otherwise the primary key.
    pub fn sort_key_name(&self) -> &str {
        self.key
            .secondary
            .as_ref()
            .map(|key| key.name.as_str())
            .unwrap_or(self.key.primary.name.as_str())
    }

    /// Reject provisioning changes that move more than one step in total
    /// across load and type.
    pub fn validate_provision_change(
        &self,
        load: ProvisionLoad,
        kind: ProvisionType,
    ) -> crate::error::Result<()> {
        let distance = (self.provision_load.value() as i32 - load.value() as i32).abs()
            + (self.provision_type.value() as i32 - kind.value() as i32).abs();
        if distance > 1 {
            return Err(StorageLinkError::ValidationError(
                "You can not make such a radical change to throughput".to_string(),
            ));
        }
        Ok(())
    }
}

/// Result of `createTable`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCreation {
    pub table: String,
    #[serde(default)]
    pub creation_date: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Result of `updateTable`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableUpdate {
    pub table: String,
    #[serde(default)]
    pub status: Option<String>,
}
