//! Out-of-band control messages posted by the host page

use serde::Deserialize;

/// A control message, discriminated by its `type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    /// Activate the installed version without waiting for pages to close
    #[serde(rename = "SKIP_WAITING")]
    SkipWaiting,

    /// Any other type; ignored so newer pages can talk to older agents
    #[serde(other)]
    Unknown,
}

impl ControlMessage {
    /// Parse a posted message. Malformed messages yield `None`.
    pub fn parse(value: &serde_json::Value) -> Option<Self> {
        Self::deserialize(value).ok()
    }
}
