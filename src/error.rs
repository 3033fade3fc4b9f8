//! Error types for the offline agent
//!
//! All modules use `AgentResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for agent operations
pub type AgentResult<T> = Result<T, AgentError>;

/// All errors that can occur in the agent
#[derive(Error, Debug)]
pub enum AgentError {
    // Lifecycle errors
    #[error("Install failed for {url}: {reason}")]
    InstallBatchFailure { url: String, reason: String },

    #[error("Cannot {operation} while {state}")]
    InvalidTransition {
        state: String,
        operation: &'static str,
    },

    #[error("Failed to claim clients: {0}")]
    ClientClaim(String),

    // Network errors
    #[error("Network request to {url} failed: {reason}")]
    Network { url: String, reason: String },

    #[error("Request to {url} returned status {status}")]
    NetworkStatus { url: String, status: u16 },

    #[error("Response body from {url} exceeds {limit} bytes")]
    BodyTooLarge { url: String, limit: u64 },

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    // Cache store errors
    #[error("Failed to delete partition {name}: {reason}")]
    PartitionDelete { name: String, reason: String },

    #[error("Cache store error: {0}")]
    Store(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AgentError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a network transport error
    pub fn network(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error means the network could not be reached at all
    pub fn is_offline(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::InstallBatchFailure { .. } => {
                Some("The previous version keeps serving; fix the manifest and redeploy")
            }
            Self::InvalidTransition { .. } => Some("Run install before activate"),
            Self::ConfigInvalid { .. } => Some("Check the [cache] and [scope] sections"),
            Self::BodyTooLarge { .. } => Some("Raise [network] max_body_bytes"),
            _ => None,
        }
    }
}
