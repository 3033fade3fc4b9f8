//! Offline caching agent for single-page web applications
//!
//! Intercepts outbound requests, serves cached responses when available and
//! fills the cache opportunistically. The host runtime delivers platform
//! events to [`Agent::dispatch`] and provides the cache store, the network
//! and the client surfaces.

pub mod agent;
pub mod cache;
pub mod config;
pub mod control;
pub mod error;
pub mod fetch;
pub mod host;
pub mod interceptor;
pub mod lifecycle;
pub mod logging;
pub mod manifest;
pub mod notify;
pub mod policy;
pub mod request;

pub use agent::{Agent, Event, EventOutcome};
pub use error::{AgentError, AgentResult};
