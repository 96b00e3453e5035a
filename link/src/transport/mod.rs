//! Seams to the two external transports: HTTP for storage requests and the
//! pub/sub client carrying change notifications.

pub mod http;
pub mod pubsub;

pub use http::{HttpTransport, ReqwestTransport};
pub use pubsub::{PubSubTransport, TransportEvent};
