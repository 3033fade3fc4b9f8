//! Partition naming and version bookkeeping

use crate::config::schema::CacheConfig;

/// Resolved partition names for one agent version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionNames {
    family_prefix: String,
    version: String,
    primary: String,
    media: String,
}

impl PartitionNames {
    /// Create names for `version` within the primary family
    pub fn new(
        family_prefix: impl Into<String>,
        version: impl Into<String>,
        media: impl Into<String>,
    ) -> Self {
        let family_prefix = family_prefix.into();
        let version = version.into();
        Self {
            primary: format!("{}{}", family_prefix, version),
            family_prefix,
            version,
            media: media.into(),
        }
    }

    /// Create from the `[cache]` config section
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(
            config.family_prefix.clone(),
            config.version.clone(),
            config.media_partition.clone(),
        )
    }

    /// Primary partition name for the current version
    pub fn primary(&self) -> &str {
        &self.primary
    }

    /// Media partition name
    pub fn media(&self) -> &str {
        &self.media
    }

    /// Current version tag
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Whether `name` belongs to the primary family (any version)
    pub fn in_family(&self, name: &str) -> bool {
        name.starts_with(&self.family_prefix)
    }

    /// Whether `name` is a primary partition left over from another version
    pub fn is_stale(&self, name: &str) -> bool {
        self.in_family(name) && name != self.primary && name != self.media
    }

    /// Filter `names` down to the stale ones, preserving order
    pub fn stale<'a>(&self, names: &'a [String]) -> Vec<&'a str> {
        names
            .iter()
            .map(String::as_str)
            .filter(|name| self.is_stale(name))
            .collect()
    }
}
