//! Host runtime surfaces the agent hands work to
//!
//! The host owns client pages, the notification tray and the analytics
//! backend. The agent only talks to them through these traits.

use crate::error::AgentResult;
use crate::notify::Notification;
use async_trait::async_trait;
use tracing::info;
use url::Url;

/// Client pages and notification surface provided by the host
#[async_trait]
pub trait ClientHost: Send + Sync {
    /// Take control of every open client page without a reload
    async fn claim_clients(&self) -> AgentResult<()>;

    /// Open or focus a client window at `url`
    async fn open_window(&self, url: &Url) -> AgentResult<()>;

    /// Display a notification
    async fn show_notification(&self, notification: &Notification) -> AgentResult<()>;

    /// Dismiss a displayed notification
    async fn close_notification(&self, id: u64) -> AgentResult<()>;
}

/// Collaborator flushed by the `sync-analytics` background sync
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn flush(&self) -> AgentResult<()>;
}

/// Analytics sink that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAnalytics;

#[async_trait]
impl AnalyticsSink for NoopAnalytics {
    async fn flush(&self) -> AgentResult<()> {
        info!("Syncing analytics data");
        Ok(())
    }
}
