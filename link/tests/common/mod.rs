#![allow(dead_code)]
//! Scripted transports and helpers shared by the integration tests.
//!
//! `ScriptedHttp` answers POSTs by operation name (the last URL segment) and
//! balancer GETs under the `"balancer"` route. Every call is recorded so tests
//! can assert on request bodies and ordering. `MockPubSub` records the
//! subscribe/unsubscribe commands the client issues.

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use storage_link::{
    Heartbeat, HttpTransport, ItemSnapshot, Listener, Presence, PubSubTransport, Result,
    StorageClient, StorageLinkError,
};
use tokio::time::{sleep, timeout};

pub const STORAGE_URL: &str = "http://storage.test/api";
pub const BALANCER_URL: &str = "http://balancer.test/server";

/// One scripted answer.
#[derive(Debug, Clone)]
pub enum Reply {
    /// `{"data": <value>}`
    Data(JsonValue),
    /// `{"error": {"code", "message"}}`
    Error(i64, String),
    /// Transport failure
    Fail(String),
    /// Raw body, sent as-is
    Raw(String),
}

impl Reply {
    fn render(&self) -> Result<String> {
        match self {
            Reply::Data(data) => Ok(json!({ "data": data }).to_string()),
            Reply::Error(code, message) => {
                Ok(json!({ "error": { "code": code, "message": message } }).to_string())
            }
            Reply::Fail(message) => Err(StorageLinkError::TransportError(message.clone())),
            Reply::Raw(body) => Ok(body.clone()),
        }
    }
}

/// A recorded HTTP call.
#[derive(Debug, Clone)]
pub struct Call {
    pub url: String,
    pub route: String,
    pub body: JsonValue,
}

#[derive(Default)]
pub struct ScriptedHttp {
    queued: Mutex<HashMap<String, VecDeque<Reply>>>,
    fallback: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<Call>>,
    delay: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedHttp {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer the next call of `route` with `reply`. Queued replies are used
    /// in order, before any fallback.
    pub fn reply(&self, route: &str, reply: Reply) {
        self.queued
            .lock()
            .unwrap()
            .entry(route.to_string())
            .or_default()
            .push_back(reply);
    }

    /// Answer every call of `route` without a queued reply with `reply`.
    pub fn always(&self, route: &str, reply: Reply) {
        self.fallback
            .lock()
            .unwrap()
            .insert(route.to_string(), reply);
    }

    /// Hold every request for `delay` before answering.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, route: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.route == route)
            .collect()
    }

    pub fn routes(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.route).collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn answer(&self, url: &str, route: String, body: JsonValue) -> Result<String> {
        self.calls.lock().unwrap().push(Call {
            url: url.to_string(),
            route: route.clone(),
            body,
        });

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let queued = self
            .queued
            .lock()
            .unwrap()
            .get_mut(&route)
            .and_then(VecDeque::pop_front);
        let reply = queued.or_else(|| self.fallback.lock().unwrap().get(&route).cloned());
        match reply {
            Some(reply) => reply.render(),
            None => Err(StorageLinkError::TransportError(format!(
                "no scripted reply for {}",
                route
            ))),
        }
    }
}

#[async_trait]
impl HttpTransport for ScriptedHttp {
    async fn get(&self, url: &str) -> Result<String> {
        self.answer(url, "balancer".to_string(), JsonValue::Null)
            .await
    }

    async fn post(&self, url: &str, body: String) -> Result<String> {
        let route = url.rsplit('/').next().unwrap_or_default().to_string();
        let body: JsonValue = serde_json::from_str(&body).unwrap();
        self.answer(url, route, body).await
    }
}

/// A pub/sub command issued by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Subscribe(String, bool),
    Unsubscribe(String),
}

#[derive(Default)]
pub struct MockPubSub {
    connected: AtomicBool,
    subscribed: Mutex<HashSet<String>>,
    commands: Mutex<Vec<Command>>,
    heartbeat: Mutex<Heartbeat>,
    presence: Mutex<Option<Presence>>,
}

impl MockPubSub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Mark `channel` as subscribed at the transport, as a confirmed
    /// subscription would.
    pub fn mark_subscribed(&self, channel: &str) {
        self.subscribed.lock().unwrap().insert(channel.to_string());
    }

    pub fn mark_unsubscribed(&self, channel: &str) {
        self.subscribed.lock().unwrap().remove(channel);
    }

    pub fn set_presence(&self, presence: Presence) {
        *self.presence.lock().unwrap() = Some(presence);
    }

    pub fn commands(&self) -> Vec<Command> {
        self.commands.lock().unwrap().clone()
    }

    pub fn clear_commands(&self) {
        self.commands.lock().unwrap().clear();
    }
}

#[async_trait]
impl PubSubTransport for MockPubSub {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn is_subscribed(&self, channel: &str) -> bool {
        self.subscribed.lock().unwrap().contains(channel)
    }

    fn subscribe(&self, channel: &str, with_notifications: bool) {
        self.commands
            .lock()
            .unwrap()
            .push(Command::Subscribe(channel.to_string(), with_notifications));
    }

    fn unsubscribe(&self, channel: &str) {
        self.commands
            .lock()
            .unwrap()
            .push(Command::Unsubscribe(channel.to_string()));
    }

    async fn presence(&self, _channel: &str) -> Result<Presence> {
        if !self.is_connected() {
            return Err(StorageLinkError::NotConnected(
                "pub/sub transport is not connected".to_string(),
            ));
        }
        self.presence
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| StorageLinkError::TransportError("presence unavailable".to_string()))
    }

    fn set_heartbeat(&self, heartbeat: &Heartbeat) -> Result<()> {
        *self.heartbeat.lock().unwrap() = *heartbeat;
        Ok(())
    }

    fn heartbeat(&self) -> Heartbeat {
        *self.heartbeat.lock().unwrap()
    }
}

/// Client talking straight to `STORAGE_URL`, without the balancer.
pub fn direct_client(http: &Arc<ScriptedHttp>, pubsub: &Arc<MockPubSub>) -> StorageClient {
    StorageClient::builder()
        .application_key("app-key")
        .authentication_token("token")
        .url(STORAGE_URL)
        .cluster(false)
        .http_transport(http.clone())
        .pubsub_transport(pubsub.clone())
        .build()
        .unwrap()
}

/// Client resolving its endpoint through `BALANCER_URL`.
pub fn balanced_client(http: &Arc<ScriptedHttp>, pubsub: &Arc<MockPubSub>) -> StorageClient {
    StorageClient::builder()
        .application_key("app-key")
        .authentication_token("token")
        .url(BALANCER_URL)
        .http_transport(http.clone())
        .pubsub_transport(pubsub.clone())
        .build()
        .unwrap()
}

/// `messages`: primary `chat` (string), secondary `ts` (number).
pub fn messages_schema() -> JsonValue {
    json!({
        "name": "messages",
        "key": {
            "primary": {"name": "chat", "dataType": "string"},
            "secondary": {"name": "ts", "dataType": "number"}
        },
        "provisionLoad": 3,
        "provisionType": 1
    })
}

/// `users`: primary `id` (string) only.
pub fn users_schema() -> JsonValue {
    json!({
        "name": "users",
        "key": {"primary": {"name": "id", "dataType": "string"}},
        "provisionLoad": 3,
        "provisionType": 1
    })
}

pub fn message(chat: &str, ts: i64) -> JsonValue {
    json!({"chat": chat, "ts": ts, "text": format!("message {}", ts)})
}

/// One items page; `stop_key` continues the listing when present.
pub fn items_page(items: Vec<JsonValue>, stop_key: Option<JsonValue>) -> JsonValue {
    match stop_key {
        Some(stop_key) => json!({"items": items, "stopKey": stop_key}),
        None => json!({"items": items}),
    }
}

/// Listener collecting every snapshot it receives.
pub fn collector() -> (Listener, Arc<Mutex<Vec<ItemSnapshot>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let listener = Listener::new(move |snapshot| sink.lock().unwrap().push(snapshot));
    (listener, seen)
}

/// Poll `condition` until it holds, failing the test after two seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let polled = timeout(Duration::from_secs(2), async {
        while !condition() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(polled.is_ok(), "condition not reached in time");
}

/// Give spawned tasks a chance to run.
pub async fn settle() {
    sleep(Duration::from_millis(30)).await;
}
