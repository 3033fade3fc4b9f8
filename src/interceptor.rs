//! Request interceptor
//!
//! Entry point for every outbound request. Classifies the request with the
//! [`PartitionPolicy`] and runs the matching strategy. Every intercepted
//! request resolves to exactly one response; fetch failures are turned
//! into degraded responses and never surface as errors. Offline failures
//! get the offline fallbacks, anything else a 502.
//!
//! Cache writes are awaited before the response is handed back, so a read
//! issued after a request completes always observes that request's write.

use crate::cache::{CacheStore, PartitionNames};
use crate::config::Config;
use crate::error::{AgentError, AgentResult};
use crate::fetch::Fetcher;
use crate::policy::{PartitionPolicy, Strategy};
use crate::request::{Request, RequestKey, Response};
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of intercepting a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interception {
    /// Answer the page with this response
    Respond(Response),
    /// Let the request continue on the default network path
    Passthrough,
}

/// Applies the partition policy to outbound requests
pub struct RequestInterceptor {
    store: Arc<dyn CacheStore>,
    fetcher: Arc<dyn Fetcher>,
    policy: PartitionPolicy,
    names: PartitionNames,
    root_document: RequestKey,
}

impl RequestInterceptor {
    /// Create an interceptor
    pub fn new(
        store: Arc<dyn CacheStore>,
        fetcher: Arc<dyn Fetcher>,
        policy: PartitionPolicy,
        names: PartitionNames,
        root_document: RequestKey,
    ) -> Self {
        Self {
            store,
            fetcher,
            policy,
            names,
            root_document,
        }
    }

    /// Create from configuration
    pub fn from_config(
        config: &Config,
        store: Arc<dyn CacheStore>,
        fetcher: Arc<dyn Fetcher>,
    ) -> AgentResult<Self> {
        let scope = config.scope_url()?;
        let root = scope
            .join(&config.policy.root_document)
            .map_err(|e| AgentError::InvalidUrl {
                url: config.policy.root_document.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self::new(
            store,
            fetcher,
            PartitionPolicy::from_config(config)?,
            PartitionNames::from_config(&config.cache),
            RequestKey::get(&root),
        ))
    }

    /// Handle one outbound request
    pub async fn intercept(&self, request: &Request) -> Interception {
        match self.policy.classify(request) {
            Strategy::Bypass => Interception::Passthrough,
            Strategy::MediaOnDemand => Interception::Respond(self.serve_media(request).await),
            Strategy::PrimaryCacheFirst => {
                Interception::Respond(self.serve_cache_first(request).await)
            }
        }
    }

    async fn serve_cache_first(&self, request: &Request) -> Response {
        let key = RequestKey::get(&request.url);

        match self.store.match_any(&key).await {
            Ok(Some(cached)) => {
                debug!("Serving from cache: {}", request.url.path());
                return cached;
            }
            Ok(None) => {}
            Err(e) => warn!("Cache lookup failed for {}: {}", key, e),
        }

        debug!("Fetching from network: {}", request.url.path());
        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.status == 200 {
                    self.persist(self.names.primary(), key, &response).await;
                }
                response
            }
            Err(e) if !e.is_offline() => {
                warn!("Fetch failed: {}", e);
                Response::bad_gateway()
            }
            Err(e) => {
                warn!("Fetch failed: {}", e);
                if request.is_navigation() {
                    self.root_document_or_offline().await
                } else {
                    Response::offline()
                }
            }
        }
    }

    async fn serve_media(&self, request: &Request) -> Response {
        let key = RequestKey::get(&request.url);
        let media = self.names.media();

        match self.store.match_in(media, &key).await {
            Ok(Some(cached)) => {
                debug!("Serving audio from cache: {}", request.url.path());
                return cached;
            }
            Ok(None) => {}
            Err(e) => warn!("Media cache lookup failed for {}: {}", key, e),
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.status == 200 {
                    self.persist(media, key, &response).await;
                }
                response
            }
            Err(e) if !e.is_offline() => {
                warn!("Media fetch failed: {}", e);
                Response::bad_gateway()
            }
            Err(e) => {
                debug!("Audio unavailable offline: {}", e);
                Response::audio_unavailable()
            }
        }
    }

    async fn root_document_or_offline(&self) -> Response {
        match self.store.match_any(&self.root_document).await {
            Ok(Some(document)) => document,
            Ok(None) => {
                warn!("Root document {} is not cached", self.root_document);
                Response::offline()
            }
            Err(e) => {
                warn!("Root document lookup failed: {}", e);
                Response::offline()
            }
        }
    }

    /// Store a copy of `response`; the original goes back to the caller
    async fn persist(&self, partition: &str, key: RequestKey, response: &Response) {
        if let Err(e) = self.store.put(partition, key, response.clone()).await {
            warn!("Failed to cache response in {}: {}", partition, e);
        }
    }
}
