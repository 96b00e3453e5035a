//! Storage client with builder pattern.
//!
//! Provides the entry point for table access, authentication checks and
//! connection management.

use crate::{
    balancer::Balancer,
    connection::ConnectionStatus,
    context::LinkContext,
    error::{Result, StorageLinkError},
    event_handlers::EventHandlers,
    models::{ConnectionOptions, Heartbeat},
    pending::Pending,
    rest::{PendingRequest, Response, RestEngine, RestOperation},
    table::TableRef,
    timeouts::StorageTimeouts,
    transport::{HttpTransport, PubSubTransport, ReqwestTransport, TransportEvent},
};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tokio::{runtime::Handle, sync::mpsc, task::JoinHandle};

/// Balancer used when no URL is configured.
pub const DEFAULT_URL: &str = "http://storage-balancer.realtime.co/server/1.0";

/// Storage client.
///
/// Use [`StorageClientBuilder`] to construct instances. Clones share the same
/// connection state, offline buffer, listeners and schema cache.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use storage_link::{EventKind, Listener, PubSubTransport, StorageClient};
///
/// # async fn example(pubsub: Arc<dyn PubSubTransport>) -> storage_link::Result<()> {
/// let client = StorageClient::builder()
///     .application_key("app-key")
///     .authentication_token("token")
///     .pubsub_transport(pubsub)
///     .build()?;
///
/// let listener = Listener::new(|item| println!("new message: {:?}", item.attributes()));
/// client.table("messages").on(EventKind::Put, &listener).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct StorageClient {
    ctx: Arc<LinkContext>,
}

impl StorageClient {
    /// Create a new builder for configuring the client
    pub fn builder() -> StorageClientBuilder {
        StorageClientBuilder::new()
    }

    /// Reference to a table. No request is made until an operation runs.
    pub fn table(&self, name: &str) -> TableRef {
        TableRef::new(Arc::clone(&self.ctx), name)
    }

    /// Names of every table of the application, across all pages.
    pub fn list_tables(&self) -> Pending<Vec<String>> {
        self.ctx.submit(
            PendingRequest::new(RestOperation::ListTables),
            Response::into_tables,
        )
    }

    /// Whether `token` is authenticated for this application.
    pub fn is_authenticated(&self, token: &str) -> Pending<bool> {
        let request = PendingRequest::new(RestOperation::IsAuthenticated)
            .field("authenticationToken", JsonValue::String(token.to_string()));
        self.ctx.submit(request, Response::into_flag)
    }

    /// Queue item mutations made while offline and replay them on reconnect.
    pub fn activate_offline_buffering(&self) {
        self.ctx.set_offline_buffering(true);
    }

    /// Reject item mutations made while offline. Already queued operations
    /// are still replayed.
    pub fn deactivate_offline_buffering(&self) {
        self.ctx.set_offline_buffering(false);
    }

    /// Number of operations waiting for the connection to come back.
    pub fn buffered_operations(&self) -> usize {
        self.ctx.buffered_operations()
    }

    pub fn set_heartbeat(&self, heartbeat: &Heartbeat) -> Result<()> {
        self.ctx.pubsub().set_heartbeat(heartbeat)
    }

    pub fn heartbeat(&self) -> Heartbeat {
        self.ctx.pubsub().heartbeat()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.ctx.status()
    }

    /// Apply one event reported by the pub/sub transport.
    pub fn handle_transport_event(&self, event: TransportEvent) {
        self.ctx.handle_transport_event(event);
    }

    /// Apply every event received on `events` until the sender is dropped.
    pub fn attach_transport_events(
        &self,
        mut events: mpsc::Receiver<TransportEvent>,
    ) -> JoinHandle<()> {
        let ctx = Arc::clone(&self.ctx);
        self.ctx.runtime().spawn(async move {
            while let Some(event) = events.recv().await {
                ctx.handle_transport_event(event);
            }
            log::debug!("[PUBSUB] Transport event stream closed");
        })
    }

    /// Drop the cached schema of `table` so the next use fetches it again.
    pub fn invalidate_schema(&self, table: &str) -> bool {
        self.ctx.schemas().invalidate(table)
    }

    /// Storage endpoint currently cached from the balancer, if any.
    pub fn resolved_url(&self) -> Option<String> {
        self.ctx.engine().balancer().cached()
    }
}

impl std::fmt::Debug for StorageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageClient")
            .field("application_key", &self.ctx.engine().application_key())
            .field("status", &self.ctx.status())
            .finish()
    }
}

/// Builder for configuring [`StorageClient`] instances.
pub struct StorageClientBuilder {
    application_key: Option<String>,
    authentication_token: Option<String>,
    url: String,
    cluster: bool,
    secure: bool,
    timeouts: StorageTimeouts,
    connection_options: ConnectionOptions,
    event_handlers: EventHandlers,
    http_transport: Option<Arc<dyn HttpTransport>>,
    pubsub_transport: Option<Arc<dyn PubSubTransport>>,
    heartbeat: Option<Heartbeat>,
    runtime: Option<Handle>,
}

impl StorageClientBuilder {
    fn new() -> Self {
        Self {
            application_key: None,
            authentication_token: None,
            url: DEFAULT_URL.to_string(),
            cluster: true,
            secure: false,
            timeouts: StorageTimeouts::default(),
            connection_options: ConnectionOptions::default(),
            event_handlers: EventHandlers::default(),
            http_transport: None,
            pubsub_transport: None,
            heartbeat: None,
            runtime: None,
        }
    }

    /// Set the application key (required)
    pub fn application_key(mut self, key: impl Into<String>) -> Self {
        self.application_key = Some(key.into());
        self
    }

    /// Set the token sent with every request
    pub fn authentication_token(mut self, token: impl Into<String>) -> Self {
        self.authentication_token = Some(token.into());
        self
    }

    /// Set the balancer URL, or the storage URL when `cluster` is off
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Resolve the storage endpoint through the balancer (default: true)
    pub fn cluster(mut self, cluster: bool) -> Self {
        self.cluster = cluster;
        self
    }

    /// Use `https://` for a URL given without a scheme
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Set timeouts of the default HTTP transport
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use std::sync::Arc;
    /// use storage_link::{PubSubTransport, StorageClient, StorageTimeouts};
    ///
    /// # fn example(pubsub: Arc<dyn PubSubTransport>) -> storage_link::Result<()> {
    /// let client = StorageClient::builder()
    ///     .application_key("app-key")
    ///     .pubsub_transport(pubsub)
    ///     .timeouts(StorageTimeouts::fast())
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn timeouts(mut self, timeouts: StorageTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn connection_options(mut self, options: ConnectionOptions) -> Self {
        self.connection_options = options;
        self
    }

    pub fn event_handlers(mut self, handlers: EventHandlers) -> Self {
        self.event_handlers = handlers;
        self
    }

    /// Replace the reqwest-based HTTP transport
    pub fn http_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.http_transport = Some(transport);
        self
    }

    /// Set the pub/sub transport (required)
    pub fn pubsub_transport(mut self, transport: Arc<dyn PubSubTransport>) -> Self {
        self.pubsub_transport = Some(transport);
        self
    }

    /// Heartbeat applied to the pub/sub transport when the client is built
    pub fn heartbeat(mut self, heartbeat: Heartbeat) -> Self {
        self.heartbeat = Some(heartbeat);
        self
    }

    /// Runtime that runs operations. Defaults to the runtime `build` is
    /// called from.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<StorageClient> {
        let application_key = self
            .application_key
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                StorageLinkError::ConfigurationError("application_key is required".into())
            })?;
        let pubsub = self.pubsub_transport.ok_or_else(|| {
            StorageLinkError::ConfigurationError("pubsub_transport is required".into())
        })?;
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|e| {
                StorageLinkError::ConfigurationError(format!(
                    "no tokio runtime available: {}",
                    e
                ))
            })?,
        };

        let http: Arc<dyn HttpTransport> = match self.http_transport {
            Some(http) => http,
            None => Arc::new(ReqwestTransport::new(&self.timeouts)?),
        };

        if let Some(heartbeat) = &self.heartbeat {
            pubsub.set_heartbeat(heartbeat)?;
        }

        log::debug!(
            "[STORAGE_REST] Building client url={} cluster={} buffering={}",
            self.url,
            self.cluster,
            self.connection_options.offline_buffering
        );

        let balancer = Balancer::new(
            Arc::clone(&http),
            &self.url,
            self.cluster,
            self.secure,
            application_key.clone(),
        );
        let engine = RestEngine::new(http, balancer, application_key, self.authentication_token);
        let ctx = LinkContext::new(
            runtime,
            engine,
            pubsub,
            self.event_handlers,
            self.connection_options.channel_prefix,
            self.connection_options.offline_buffering,
        );

        Ok(StorageClient { ctx: Arc::new(ctx) })
    }
}
