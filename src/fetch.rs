//! Network access
//!
//! The interceptor and the lifecycle manager only see the [`Fetcher`]
//! trait. `Err` from a fetch means the transport failed or the body went
//! over `max_body_bytes`; HTTP error statuses come back as ordinary
//! responses. Only transport failures count as offline.

use crate::config::schema::NetworkConfig;
use crate::error::{AgentError, AgentResult};
use crate::request::{Method, Request, Response};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Network fetch interface
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Perform the request once
    async fn fetch(&self, request: &Request) -> AgentResult<Response>;
}

/// Blocking HTTP client run on the tokio blocking pool
pub struct HttpFetcher {
    agent: ureq::Agent,
    max_body_bytes: u64,
}

impl HttpFetcher {
    /// Create a fetcher from the `[network]` config section
    pub fn new(config: &NetworkConfig) -> Self {
        let timeout = match config.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        let agent_config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build();

        Self {
            agent: ureq::Agent::new_with_config(agent_config),
            max_body_bytes: config.max_body_bytes,
        }
    }

    fn fetch_blocking(
        agent: &ureq::Agent,
        request: &Request,
        max_body_bytes: u64,
    ) -> AgentResult<Response> {
        let url = request.url.as_str();
        let transport = |e: ureq::Error| AgentError::network(url, e.to_string());

        let mut response = match request.method {
            Method::Get => agent.get(url).call(),
            Method::Head => agent.head(url).call(),
            Method::Delete => agent.delete(url).call(),
            Method::Options => agent.options(url).call(),
            Method::Post => agent.post(url).send_empty(),
            Method::Put => agent.put(url).send_empty(),
            Method::Patch => agent.patch(url).send_empty(),
        }
        .map_err(transport)?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = response
            .body_mut()
            .with_config()
            .limit(max_body_bytes)
            .read_to_vec()
            .map_err(|e| body_error(url, e))?;

        Ok(Response {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body: body.into(),
        })
    }
}

/// Map a body read failure; hitting the size cap is not a network outage
fn body_error(url: &str, err: ureq::Error) -> AgentError {
    match err {
        ureq::Error::BodyExceedsLimit(limit) => AgentError::BodyTooLarge {
            url: url.to_string(),
            limit,
        },
        other => AgentError::network(url, other.to_string()),
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> AgentResult<Response> {
        debug!("{} {}", request.method, request.url);

        let agent = self.agent.clone();
        let request = request.clone();
        let max_body_bytes = self.max_body_bytes;

        tokio::task::spawn_blocking(move || Self::fetch_blocking(&agent, &request, max_body_bytes))
            .await
            .map_err(|e| AgentError::Internal(format!("fetch task failed: {}", e)))?
    }
}
