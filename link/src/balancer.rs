//! Storage endpoint resolution through the cluster load balancer.

use log::{debug, info, warn};
use serde::Deserialize;
use std::sync::{Arc, Mutex};

use crate::error::{Result, StorageLinkError};
use crate::transport::HttpTransport;

/// Endpoint chosen for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoint {
    pub url: String,
    /// Whether the URL came from the balancer cache. Only cached endpoints
    /// are eligible for the failover retry.
    pub from_cache: bool,
}

#[derive(Debug, Deserialize)]
struct BalancerAnswer {
    url: Option<String>,
}

/// Resolves (and in clustered mode caches) the storage endpoint.
pub struct Balancer {
    http: Arc<dyn HttpTransport>,
    url: String,
    cluster: bool,
    application_key: String,
    cached: Mutex<Option<String>>,
}

impl Balancer {
    pub fn new(
        http: Arc<dyn HttpTransport>,
        url: &str,
        cluster: bool,
        secure: bool,
        application_key: impl Into<String>,
    ) -> Self {
        Self {
            http,
            url: with_scheme(url, secure),
            cluster,
            application_key: application_key.into(),
            cached: Mutex::new(None),
        }
    }

    pub async fn resolve(&self) -> Result<ResolvedEndpoint> {
        if !self.cluster {
            return Ok(ResolvedEndpoint {
                url: self.url.clone(),
                from_cache: false,
            });
        }

        if let Some(url) = self.cached() {
            return Ok(ResolvedEndpoint {
                url,
                from_cache: true,
            });
        }

        let request_url = format!("{}?appkey={}", self.url, self.application_key);
        debug!("[BALANCER] Resolving storage endpoint via {}", request_url);

        let body = self.http.get(&request_url).await.map_err(|e| {
            warn!("[BALANCER] Balancer request failed: {}", e);
            StorageLinkError::ResolutionError(e.to_string())
        })?;

        let answer: BalancerAnswer = serde_json::from_str(&body)
            .map_err(|e| StorageLinkError::ResolutionError(format!("malformed balancer answer: {}", e)))?;

        let url = answer
            .url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                StorageLinkError::ResolutionError("Cannot get response from balancer!".to_string())
            })?;

        info!("[BALANCER] Storage endpoint resolved: {}", url);
        if let Ok(mut cached) = self.cached.lock() {
            *cached = Some(url.clone());
        }

        Ok(ResolvedEndpoint {
            url,
            from_cache: false,
        })
    }

    /// Forget the cached endpoint so the next request asks the balancer again.
    pub fn invalidate(&self) {
        if let Ok(mut cached) = self.cached.lock() {
            if cached.take().is_some() {
                debug!("[BALANCER] Cached endpoint invalidated");
            }
        }
    }

    pub fn cached(&self) -> Option<String> {
        self.cached.lock().ok().and_then(|cached| cached.clone())
    }
}

/// `<base>/<operation>` with exactly one separator.
pub fn operation_url(base: &str, operation: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), operation)
}

fn with_scheme(url: &str, secure: bool) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else if secure {
        format!("https://{}", url)
    } else {
        format!("http://{}", url)
    }
}
