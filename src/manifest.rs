//! Install manifest
//!
//! The ordered list of static assets fetched as one batch at install.
//! Entries may be absolute or relative to the agent scope.

use crate::config::Config;
use crate::error::{AgentError, AgentResult};
use url::Url;

/// Resolved install manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    assets: Vec<Url>,
}

impl Manifest {
    /// Resolve `entries` against `scope`, dropping repeated URLs
    pub fn resolve<S: AsRef<str>>(scope: &Url, entries: &[S]) -> AgentResult<Self> {
        let mut assets: Vec<Url> = Vec::with_capacity(entries.len());

        for entry in entries {
            let entry = entry.as_ref();
            let url = scope.join(entry).map_err(|e| AgentError::InvalidUrl {
                url: entry.to_string(),
                reason: e.to_string(),
            })?;
            if !assets.contains(&url) {
                assets.push(url);
            }
        }

        Ok(Self { assets })
    }

    /// Resolve the `[manifest]` section against the configured scope
    pub fn from_config(config: &Config) -> AgentResult<Self> {
        Self::resolve(&config.scope_url()?, &config.manifest.assets)
    }

    pub fn assets(&self) -> &[Url] {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}
