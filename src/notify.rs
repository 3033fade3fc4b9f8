//! Push notification hand-off
//!
//! Builds the display request for an incoming push and hands it to the
//! host. Payload semantics beyond "text or default" are up to the host.

use crate::config::schema::NotificationConfig;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Display request passed to [`ClientHost::show_notification`]
///
/// [`ClientHost::show_notification`]: crate::host::ClientHost::show_notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
}

/// Metadata attached to a notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationData {
    /// Arrival time of the push, serialized as epoch milliseconds
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub id: u64,
}

/// Builds notifications from push payloads
#[derive(Debug, Clone)]
pub struct NotificationBuilder {
    config: NotificationConfig,
}

impl NotificationBuilder {
    pub fn new(config: NotificationConfig) -> Self {
        Self { config }
    }

    /// Build the display request for a push that arrived at `arrived_at`
    pub fn build(&self, payload: Option<&str>, arrived_at: DateTime<Utc>) -> Notification {
        let body = payload.map_or_else(|| self.config.default_body.clone(), str::to_string);

        Notification {
            title: self.config.title.clone(),
            body,
            icon: self.config.icon.clone(),
            badge: self.config.badge.clone(),
            vibrate: self.config.vibrate.clone(),
            data: NotificationData {
                timestamp: arrived_at,
                id: self.config.id,
            },
        }
    }

    /// Window to open when a notification is activated, relative to the scope
    pub fn click_url(&self) -> &str {
        &self.config.click_url
    }
}
