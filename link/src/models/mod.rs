//! Data models for storage-link.
//!
//! Table metadata, item snapshots, filters and the request/response
//! envelopes exchanged with the storage service.

pub mod api_response;
pub mod attribute_value;
pub mod connection_options;
pub mod event_kind;
pub mod filter;
pub mod heartbeat;
pub mod item_snapshot;
pub mod presence;
pub mod table_schema;


pub use api_response::{ApiResponse, ErrorDetail, ItemsPage, TablesPage};
pub use attribute_value::AttributeValue;
pub use connection_options::ConnectionOptions;
pub use event_kind::{EventKind, SortOrder};
pub use filter::{Filter, FilterOperator};
pub use heartbeat::Heartbeat;
pub use item_snapshot::{Attributes, ItemSnapshot, RawItem};
pub use presence::Presence;
pub use table_schema::{
    KeyDataType, KeySchema, ProvisionLoad, ProvisionType, TableCreation, TableKey, TableSchema,
    TableUpdate, Throughput,
};
