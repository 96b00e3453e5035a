use async_trait::async_trait;
use log::{debug, warn};
use std::time::Instant;

use crate::error::{Result, StorageLinkError};
use crate::timeouts::StorageTimeouts;

/// Minimal HTTP surface the client needs.
///
/// Implementations return the response body as text. Connection failures,
/// timeouts and non-success statuses without a storage error body are
/// reported as [`StorageLinkError::TransportError`].
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str) -> Result<String>;

    async fn post(&self, url: &str, body: String) -> Result<String>;
}

/// Default transport backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http_client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeouts: &StorageTimeouts) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(timeouts.connection_timeout)
            // keep-alive pool, the balancer hands out a single node per client
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(timeouts.pool_idle_timeout);

        if !StorageTimeouts::is_no_timeout(timeouts.request_timeout) {
            builder = builder.timeout(timeouts.request_timeout);
        }

        let http_client = builder
            .build()
            .map_err(|e| StorageLinkError::ConfigurationError(e.to_string()))?;

        Ok(Self { http_client })
    }

    /// Wrap an already configured client.
    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    async fn read_body(response: reqwest::Response, started: Instant) -> Result<String> {
        let status = response.status();
        let text = response.text().await?;
        debug!(
            "[STORAGE_HTTP] Response received: status={} duration_ms={}",
            status,
            started.elapsed().as_millis()
        );

        if status.is_success() {
            return Ok(text);
        }

        // The service reports most failures as an error envelope; let the
        // engine decode those into server errors.
        let has_error_envelope = serde_json::from_str::<serde_json::Value>(&text)
            .map(|value| value.get("error").is_some())
            .unwrap_or(false);
        if has_error_envelope {
            return Ok(text);
        }

        warn!("[STORAGE_HTTP] HTTP error: status={} body=\"{}\"", status, text);
        Err(StorageLinkError::TransportError(format!(
            "HTTP {}: {}",
            status, text
        )))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<String> {
        debug!("[STORAGE_HTTP] Sending GET to {}", url);
        let started = Instant::now();
        let response = self.http_client.get(url).send().await?;
        Self::read_body(response, started).await
    }

    async fn post(&self, url: &str, body: String) -> Result<String> {
        debug!("[STORAGE_HTTP] Sending POST to {} (bytes={})", url, body.len());
        let started = Instant::now();
        let response = self
            .http_client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        Self::read_body(response, started).await
    }
}
