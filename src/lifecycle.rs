//! Lifecycle manager
//!
//! Drives one agent version through install and activate:
//!
//! | State | Entered when |
//! |-------|--------------|
//! | Parsed | Agent created |
//! | Installing | Install started |
//! | Waiting | Manifest stored, waiting for activation |
//! | Activating | Activation started, stale partitions being removed |
//! | Active | Clients claimed, serving |
//! | Redundant | Install failed; this version never serves |
//!
//! Install is all-or-nothing: the whole manifest is fetched before anything
//! is written, then stored as one batch. Stale primary partitions are only
//! deleted by a successful activate, so a failed install leaves the
//! previous version untouched.

use crate::cache::{CacheStore, PartitionNames};
use crate::error::{AgentError, AgentResult};
use crate::fetch::Fetcher;
use crate::host::ClientHost;
use crate::manifest::Manifest;
use crate::request::{Request, RequestKey, Response};
use futures_util::future::try_join_all;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use url::Url;

/// Lifecycle state of an agent version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Parsed,
    Installing,
    Waiting,
    Activating,
    Active,
    Redundant,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Parsed => "parsed",
            Self::Installing => "installing",
            Self::Waiting => "waiting",
            Self::Activating => "activating",
            Self::Active => "active",
            Self::Redundant => "redundant",
        };
        write!(f, "{}", name)
    }
}

/// Result of an activation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationReport {
    /// Stale partitions removed
    pub deleted: Vec<String>,
    /// Stale partitions that could not be removed
    pub failed: Vec<String>,
}

/// Install/activate state machine for one version
pub struct LifecycleManager {
    store: Arc<dyn CacheStore>,
    fetcher: Arc<dyn Fetcher>,
    host: Arc<dyn ClientHost>,
    names: PartitionNames,
    manifest: Manifest,
    state: watch::Sender<LifecycleState>,
    skip_waiting: AtomicBool,
}

impl LifecycleManager {
    pub fn new(
        store: Arc<dyn CacheStore>,
        fetcher: Arc<dyn Fetcher>,
        host: Arc<dyn ClientHost>,
        names: PartitionNames,
        manifest: Manifest,
    ) -> Self {
        let (state, _) = watch::channel(LifecycleState::Parsed);
        Self {
            store,
            fetcher,
            host,
            names,
            manifest,
            state,
            skip_waiting: AtomicBool::new(false),
        }
    }

    /// Current state
    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Observe state transitions
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Partition names this version uses
    pub fn names(&self) -> &PartitionNames {
        &self.names
    }

    fn transition(&self, next: LifecycleState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            info!("Lifecycle {} -> {}", previous, next);
        }
    }

    /// Fetch the manifest and store it in the primary partition
    pub async fn install(&self) -> AgentResult<()> {
        let current = self.state();
        if matches!(
            current,
            LifecycleState::Redundant | LifecycleState::Activating | LifecycleState::Active
        ) {
            return Err(AgentError::InvalidTransition {
                state: current.to_string(),
                operation: "install",
            });
        }

        self.transition(LifecycleState::Installing);
        info!(
            "Installing {} ({} assets)",
            self.names.version(),
            self.manifest.len()
        );

        let fetches = self.manifest.assets().iter().map(|url| self.fetch_asset(url));
        let entries = match try_join_all(fetches).await {
            Ok(entries) => entries,
            Err(e) => {
                error!("Cache failed: {}", e);
                self.transition(LifecycleState::Redundant);
                return Err(e);
            }
        };

        if let Err(e) = self.store.put_all(self.names.primary(), entries).await {
            error!("Failed to store manifest in {}: {}", self.names.primary(), e);
            self.transition(LifecycleState::Redundant);
            return Err(e);
        }

        debug!("Cached static assets in {}", self.names.primary());
        self.transition(LifecycleState::Waiting);
        self.skip_waiting();
        Ok(())
    }

    async fn fetch_asset(&self, url: &Url) -> AgentResult<(RequestKey, Response)> {
        let failure = |reason: String| AgentError::InstallBatchFailure {
            url: url.to_string(),
            reason,
        };

        let response = self
            .fetcher
            .fetch(&Request::get(url.clone()))
            .await
            .map_err(|e| failure(e.to_string()))?;

        if !response.is_ok() {
            return Err(failure(
                AgentError::NetworkStatus {
                    url: url.to_string(),
                    status: response.status,
                }
                .to_string(),
            ));
        }

        Ok((RequestKey::get(url), response))
    }

    /// Request activation without waiting for open pages to close.
    ///
    /// Returns `true` when the installed version is ready to activate now;
    /// a request made mid-install takes effect once install completes.
    pub fn skip_waiting(&self) -> bool {
        self.skip_waiting.store(true, Ordering::SeqCst);
        self.state() == LifecycleState::Waiting
    }

    /// Whether a skip-waiting request has been recorded
    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    /// Whether the host may fire activate without waiting for pages to close
    pub fn ready_to_activate(&self) -> bool {
        self.state() == LifecycleState::Waiting && self.skip_waiting.load(Ordering::SeqCst)
    }

    /// Remove stale primary partitions and claim open clients
    pub async fn activate(&self) -> AgentResult<ActivationReport> {
        let current = self.state();
        if current != LifecycleState::Waiting {
            return Err(AgentError::InvalidTransition {
                state: current.to_string(),
                operation: "activate",
            });
        }

        self.transition(LifecycleState::Activating);
        let report = self.delete_stale_partitions().await;

        let claimed = self
            .host
            .claim_clients()
            .await
            .map_err(|e| AgentError::ClientClaim(e.to_string()));

        self.transition(LifecycleState::Active);

        if let Err(e) = claimed {
            warn!("{}", e);
            return Err(e);
        }

        Ok(report)
    }

    async fn delete_stale_partitions(&self) -> ActivationReport {
        let mut report = ActivationReport::default();

        let existing = match self.store.keys().await {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Could not list partitions, skipping cleanup: {}", e);
                return report;
            }
        };

        for name in self.names.stale(&existing) {
            info!("Deleting old cache: {}", name);
            match self.store.delete(name).await {
                Ok(_) => report.deleted.push(name.to_string()),
                Err(e) => {
                    let e = AgentError::PartitionDelete {
                        name: name.to_string(),
                        reason: e.to_string(),
                    };
                    warn!("{}", e);
                    report.failed.push(name.to_string());
                }
            }
        }

        report
    }
}
