//! Partition policy: decides how each intercepted request is served
//!
//! Classification is a fixed priority chain. The bypass checks run first so
//! that a non-allow-listed cross-origin audio URL still bypasses, then media
//! detection, then everything left is served cache-first.

use crate::config::Config;
use crate::error::AgentResult;
use crate::request::{Method, Request};
use std::fmt;
use url::{Origin, Url};

/// Fetch strategy chosen for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Serve from any partition, fall back to network, store into primary
    PrimaryCacheFirst,
    /// Serve from the media partition, fill it lazily from the network
    MediaOnDemand,
    /// Not intercepted
    Bypass,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrimaryCacheFirst => write!(f, "primary-cache-first"),
            Self::MediaOnDemand => write!(f, "media-on-demand"),
            Self::Bypass => write!(f, "bypass"),
        }
    }
}

/// Request classifier
#[derive(Debug, Clone)]
pub struct PartitionPolicy {
    origin: Origin,
    allowed_hosts: Vec<String>,
    media_patterns: Vec<String>,
}

impl PartitionPolicy {
    /// Create a policy for the given scope
    pub fn new(scope: &Url, allowed_hosts: Vec<String>, media_patterns: Vec<String>) -> Self {
        Self {
            origin: scope.origin(),
            allowed_hosts: allowed_hosts
                .into_iter()
                .map(|h| h.to_ascii_lowercase())
                .collect(),
            media_patterns,
        }
    }

    /// Create from the `[scope]` and `[policy]` config sections
    pub fn from_config(config: &Config) -> AgentResult<Self> {
        Ok(Self::new(
            &config.scope_url()?,
            config.policy.allowed_hosts.clone(),
            config.policy.media_patterns.clone(),
        ))
    }

    /// Pick the strategy for `request`
    pub fn classify(&self, request: &Request) -> Strategy {
        if request.method != Method::Get {
            return Strategy::Bypass;
        }

        if !self.is_same_origin(&request.url) && !self.is_allowed_host(&request.url) {
            return Strategy::Bypass;
        }

        if self.is_media(&request.url) {
            return Strategy::MediaOnDemand;
        }

        Strategy::PrimaryCacheFirst
    }

    fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.origin
    }

    fn is_allowed_host(&self, url: &Url) -> bool {
        url.host_str()
            .is_some_and(|host| self.allowed_hosts.iter().any(|h| h == host))
    }

    fn is_media(&self, url: &Url) -> bool {
        let path = url.path();
        self.media_patterns
            .iter()
            .any(|pattern| path.contains(pattern.as_str()))
    }
}
