//! # storage-link
//!
//! Client access layer for a load-balanced key/value table storage service
//! with live change notifications over pub/sub.
//!
//! ## Architecture
//!
//! ```text
//! StorageClient / TableRef / ItemRef   (caller-facing references)
//!     ↓
//! LinkContext                          (state, offline buffer, listeners, schemas)
//!     ↓                    ↓
//! RestEngine + Balancer    PubSubTransport
//!     ↓
//! HttpTransport (reqwest)
//! ```
//!
//! Every operation returns a [`Pending`] that resolves once, with either its
//! result or a [`StorageLinkError`]. Reads are planned from the table schema
//! into a direct fetch, a keyed query or a full scan, and paginated results
//! are assembled before they are delivered.
//!
//! The pub/sub connection itself is driven by the application: feed its
//! events to [`StorageClient::handle_transport_event`] or
//! [`StorageClient::attach_transport_events`].

pub mod balancer;
pub mod client;
pub mod connection;
mod context;
pub mod error;
pub mod event_handlers;
pub mod item;
pub mod models;
pub mod pending;
pub mod query;
pub mod rest;
pub mod subscription;
pub mod table;
pub mod timeouts;
pub mod transport;

pub use balancer::{Balancer, ResolvedEndpoint};
pub use client::{StorageClient, StorageClientBuilder, DEFAULT_URL};
pub use connection::ConnectionStatus;
pub use error::{Result, StorageLinkError};
pub use event_handlers::EventHandlers;
pub use item::ItemRef;
pub use models::{
    AttributeValue, Attributes, ConnectionOptions, EventKind, Filter, FilterOperator, Heartbeat,
    ItemSnapshot, KeyDataType, KeySchema, Presence, ProvisionLoad, ProvisionType, SortOrder,
    TableCreation, TableKey, TableSchema, TableUpdate, Throughput,
};
pub use pending::Pending;
pub use query::{Query, ReadPlan};
pub use subscription::Listener;
pub use table::TableRef;
pub use timeouts::{StorageTimeouts, StorageTimeoutsBuilder};
pub use transport::{HttpTransport, PubSubTransport, ReqwestTransport, TransportEvent};
