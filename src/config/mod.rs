//! Configuration management for the offline agent

pub mod schema;

pub use schema::Config;

use crate::error::{AgentError, AgentResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};
use url::Url;

impl Config {
    /// Parse configuration from a TOML string
    pub fn parse(content: &str) -> AgentResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| AgentError::ConfigInvalid {
            path: "<inline>".into(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants the rest of the agent relies on
    pub fn validate(&self) -> AgentResult<()> {
        let invalid = |reason: String| AgentError::ConfigInvalid {
            path: "<config>".into(),
            reason,
        };

        if self.cache.version.trim().is_empty() {
            return Err(invalid("cache.version must not be empty".to_string()));
        }
        if self.cache.family_prefix.is_empty() {
            return Err(invalid("cache.family_prefix must not be empty".to_string()));
        }
        // The media partition must never be swept up by version cleanup
        if self
            .cache
            .media_partition
            .starts_with(&self.cache.family_prefix)
        {
            return Err(invalid(format!(
                "cache.media_partition '{}' must not start with family prefix '{}'",
                self.cache.media_partition, self.cache.family_prefix
            )));
        }
        self.scope_url()?;
        Ok(())
    }

    /// Parsed scope URL
    pub fn scope_url(&self) -> AgentResult<Url> {
        Url::parse(&self.scope.url).map_err(|e| AgentError::InvalidUrl {
            url: self.scope.url.clone(),
            reason: e.to_string(),
        })
    }
}

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a config manager for the given path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Load configuration, falling back to defaults if the file is missing
    pub async fn load(&self) -> AgentResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> AgentResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| AgentError::io(format!("reading config from {}", path.display()), e))?;

        let config: Config = toml::from_str(&content).map_err(|e| AgentError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate().map_err(|e| match e {
            AgentError::ConfigInvalid { reason, .. } => AgentError::ConfigInvalid {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })?;

        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> AgentResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AgentError::io(format!("creating config directory {}", parent.display()), e)
            })?;
        }

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            AgentError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}
