//! Cache store abstraction
//!
//! The store is owned by the host and shared by the interceptor and the
//! lifecycle manager. Implementations must tolerate interleaved calls from
//! concurrent tasks; writes to the same key are last-write-wins.

use crate::error::AgentResult;
use crate::request::{RequestKey, Response};
use async_trait::async_trait;

/// Persistent key-value storage split into named partitions
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Names of all existing partitions, in creation order
    async fn keys(&self) -> AgentResult<Vec<String>>;

    /// Whether a partition exists
    async fn has(&self, partition: &str) -> AgentResult<bool>;

    /// Delete a partition. Returns `false` if it did not exist.
    async fn delete(&self, partition: &str) -> AgentResult<bool>;

    /// Look `key` up across all partitions in creation order
    async fn match_any(&self, key: &RequestKey) -> AgentResult<Option<Response>>;

    /// Look `key` up in one partition only
    async fn match_in(&self, partition: &str, key: &RequestKey) -> AgentResult<Option<Response>>;

    /// Store one response, creating the partition if needed
    async fn put(&self, partition: &str, key: RequestKey, response: Response) -> AgentResult<()>;

    /// Store a batch atomically: either every entry lands or none does
    async fn put_all(
        &self,
        partition: &str,
        entries: Vec<(RequestKey, Response)>,
    ) -> AgentResult<()>;

    /// Keys held by a partition (empty if the partition does not exist)
    async fn entries_in(&self, partition: &str) -> AgentResult<Vec<RequestKey>>;
}
