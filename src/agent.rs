//! Event dispatch
//!
//! The host delivers platform events to [`Agent::dispatch`] and awaits the
//! returned future before treating the event as handled.

use crate::cache::{CacheStore, PartitionNames};
use crate::config::Config;
use crate::control::ControlMessage;
use crate::error::{AgentError, AgentResult};
use crate::fetch::Fetcher;
use crate::host::{AnalyticsSink, ClientHost};
use crate::interceptor::{Interception, RequestInterceptor};
use crate::lifecycle::LifecycleManager;
use crate::manifest::Manifest;
use crate::notify::NotificationBuilder;
use crate::request::{Request, Response};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Background sync tag that flushes analytics
pub const SYNC_ANALYTICS_TAG: &str = "sync-analytics";

/// Platform event delivered by the host
#[derive(Debug, Clone)]
pub enum Event {
    Install,
    Activate,
    Fetch(Request),
    Message(serde_json::Value),
    Sync { tag: String },
    Push { data: Option<String> },
    NotificationClick { id: u64 },
}

/// What the host should do once an event has been handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// Work finished
    Handled,
    /// Answer the intercepted request with this response
    Respond(Response),
    /// Let the request continue unintercepted
    Passthrough,
    /// Event not meant for this agent
    Ignored,
}

/// The offline caching agent for one version
pub struct Agent {
    lifecycle: LifecycleManager,
    interceptor: RequestInterceptor,
    notifications: NotificationBuilder,
    host: Arc<dyn ClientHost>,
    analytics: Arc<dyn AnalyticsSink>,
    scope: Url,
}

impl Agent {
    /// Wire an agent from configuration and host-provided collaborators
    pub fn new(
        config: &Config,
        store: Arc<dyn CacheStore>,
        fetcher: Arc<dyn Fetcher>,
        host: Arc<dyn ClientHost>,
        analytics: Arc<dyn AnalyticsSink>,
    ) -> AgentResult<Self> {
        config.validate()?;

        let lifecycle = LifecycleManager::new(
            Arc::clone(&store),
            Arc::clone(&fetcher),
            Arc::clone(&host),
            PartitionNames::from_config(&config.cache),
            Manifest::from_config(config)?,
        );
        let interceptor = RequestInterceptor::from_config(config, store, fetcher)?;

        info!("Agent {} loaded", config.cache.version);
        Ok(Self {
            lifecycle,
            interceptor,
            notifications: NotificationBuilder::new(config.notifications.clone()),
            host,
            analytics,
            scope: config.scope_url()?,
        })
    }

    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    pub fn interceptor(&self) -> &RequestInterceptor {
        &self.interceptor
    }

    /// Handle one platform event
    pub async fn dispatch(&self, event: Event) -> AgentResult<EventOutcome> {
        match event {
            Event::Install => {
                self.lifecycle.install().await?;
                Ok(EventOutcome::Handled)
            }
            Event::Activate => {
                self.lifecycle.activate().await?;
                Ok(EventOutcome::Handled)
            }
            Event::Fetch(request) => Ok(match self.interceptor.intercept(&request).await {
                Interception::Respond(response) => EventOutcome::Respond(response),
                Interception::Passthrough => EventOutcome::Passthrough,
            }),
            Event::Message(value) => Ok(self.on_message(&value)),
            Event::Sync { tag } => self.on_sync(&tag).await,
            Event::Push { data } => self.on_push(data.as_deref()).await,
            Event::NotificationClick { id } => self.on_notification_click(id).await,
        }
    }

    fn on_message(&self, value: &serde_json::Value) -> EventOutcome {
        match ControlMessage::parse(value) {
            Some(ControlMessage::SkipWaiting) => {
                info!("Skipping waiting");
                self.lifecycle.skip_waiting();
                EventOutcome::Handled
            }
            Some(ControlMessage::Unknown) | None => {
                debug!("Ignoring control message: {}", value);
                EventOutcome::Ignored
            }
        }
    }

    async fn on_sync(&self, tag: &str) -> AgentResult<EventOutcome> {
        if tag != SYNC_ANALYTICS_TAG {
            debug!("Ignoring sync tag {}", tag);
            return Ok(EventOutcome::Ignored);
        }
        self.analytics.flush().await?;
        Ok(EventOutcome::Handled)
    }

    async fn on_push(&self, data: Option<&str>) -> AgentResult<EventOutcome> {
        let notification = self.notifications.build(data, Utc::now());
        self.host.show_notification(&notification).await?;
        Ok(EventOutcome::Handled)
    }

    async fn on_notification_click(&self, id: u64) -> AgentResult<EventOutcome> {
        self.host.close_notification(id).await?;

        let target = self.notifications.click_url();
        let url = self.scope.join(target).map_err(|e| AgentError::InvalidUrl {
            url: target.to_string(),
            reason: e.to_string(),
        })?;
        self.host.open_window(&url).await?;
        Ok(EventOutcome::Handled)
    }
}
