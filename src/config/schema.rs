//! Configuration schema for the offline agent
//!
//! Configuration is read from a TOML file handed over by the host.

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Cache partition naming
    pub cache: CacheConfig,

    /// Scope the agent controls
    pub scope: ScopeConfig,

    /// Static assets fetched at install
    pub manifest: ManifestConfig,

    /// Request classification
    pub policy: PolicyConfig,

    /// Push notification defaults
    pub notifications: NotificationConfig,

    /// Bundled HTTP fetcher settings
    pub network: NetworkConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Verbosity: 0 = warn, 1 = info, 2+ = debug
    pub verbose: u8,

    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: 0,
            log_format: "text".to_string(),
        }
    }
}

/// Cache partition configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Version tag embedded in the primary partition name
    pub version: String,

    /// Prefix shared by every primary partition
    pub family_prefix: String,

    /// Name of the unversioned media partition
    pub media_partition: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            version: "v2.0.0".to_string(),
            family_prefix: "369-portal-".to_string(),
            media_partition: "369-audio-cache".to_string(),
        }
    }
}

/// Scope configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    /// Absolute URL of the agent scope; its origin is the "same origin"
    pub url: String,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080/".to_string(),
        }
    }
}

/// Install manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    /// Asset URLs, absolute or relative to the scope
    pub assets: Vec<String>,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            assets: vec![
                "./".to_string(),
                "./WEBSiTE v2 - 613-portal-v2.html".to_string(),
                "./manifest.json".to_string(),
                "https://cdn.jsdelivr.net/npm/three@0.128.0/build/three.min.js".to_string(),
                "https://cdn.jsdelivr.net/npm/three@0.128.0/examples/js/controls/OrbitControls.js"
                    .to_string(),
            ],
        }
    }
}

/// Partition policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Cross-origin hosts that are still intercepted
    pub allowed_hosts: Vec<String>,

    /// Path fragments that mark a request as media
    pub media_patterns: Vec<String>,

    /// Document served to navigations when offline
    pub root_document: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            allowed_hosts: vec!["cdn.jsdelivr.net".to_string()],
            media_patterns: vec![".mp3".to_string(), "audio.".to_string()],
            root_document: "./".to_string(),
        }
    }
}

/// Push notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Notification title
    pub title: String,

    /// Body used when the push carries no payload
    pub default_body: String,

    /// Icon URL
    pub icon: String,

    /// Badge URL
    pub badge: String,

    /// Vibration pattern in milliseconds
    pub vibrate: Vec<u32>,

    /// Identifier attached to notification metadata
    pub id: u64,

    /// Window opened when the notification is activated
    pub click_url: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            title: "613 Portal".to_string(),
            default_body: "613 Portal Update".to_string(),
            icon: "./icon-192.png".to_string(),
            badge: "./badge-72.png".to_string(),
            vibrate: vec![100, 50, 100],
            id: 1,
            click_url: "./".to_string(),
        }
    }
}

/// HTTP fetcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Transport timeout for a whole request (0 = no timeout)
    pub timeout_secs: u64,

    /// Largest response body read from the network.
    ///
    /// A larger body fails the request with `BodyTooLarge`. That is not an
    /// offline condition: the page gets a 502 instead of the offline
    /// fallback, and a manifest asset over the cap fails install.
    pub max_body_bytes: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_body_bytes: 64 * 1024 * 1024,
        }
    }
}
