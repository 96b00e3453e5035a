use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Subscriber presence on a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presence {
    /// Number of active subscriptions on the channel
    pub subscriptions: u64,

    /// Subscriber metadata → number of subscribers announcing it
    #[serde(default)]
    pub metadata: BTreeMap<String, u64>,
}
