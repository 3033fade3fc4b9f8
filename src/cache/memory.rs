//! In-process cache store

use crate::cache::store::CacheStore;
use crate::error::AgentResult;
use crate::request::{RequestKey, Response};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;

type Partition = BTreeMap<RequestKey, Response>;

/// Cache store held entirely in memory
///
/// Partitions are kept in creation order so that [`CacheStore::match_any`]
/// resolves the same way a browser cache storage does.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    partitions: RwLock<Vec<(String, Partition)>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create empty partitions, e.g. to seed state left by earlier versions
    pub async fn with_partitions<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        {
            let mut partitions = store.partitions.write().await;
            for name in names {
                let name = name.into();
                if !partitions.iter().any(|(n, _)| *n == name) {
                    partitions.push((name, Partition::new()));
                }
            }
        }
        store
    }

    fn partition_mut<'a>(
        partitions: &'a mut Vec<(String, Partition)>,
        name: &str,
    ) -> &'a mut Partition {
        let index = match partitions.iter().position(|(n, _)| n == name) {
            Some(index) => index,
            None => {
                debug!("Creating partition {}", name);
                partitions.push((name.to_string(), Partition::new()));
                partitions.len() - 1
            }
        };
        &mut partitions[index].1
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn keys(&self) -> AgentResult<Vec<String>> {
        let partitions = self.partitions.read().await;
        Ok(partitions.iter().map(|(name, _)| name.clone()).collect())
    }

    async fn has(&self, partition: &str) -> AgentResult<bool> {
        let partitions = self.partitions.read().await;
        Ok(partitions.iter().any(|(name, _)| name == partition))
    }

    async fn delete(&self, partition: &str) -> AgentResult<bool> {
        let mut partitions = self.partitions.write().await;
        let before = partitions.len();
        partitions.retain(|(name, _)| name != partition);
        Ok(partitions.len() != before)
    }

    async fn match_any(&self, key: &RequestKey) -> AgentResult<Option<Response>> {
        let partitions = self.partitions.read().await;
        Ok(partitions
            .iter()
            .find_map(|(_, entries)| entries.get(key).cloned()))
    }

    async fn match_in(&self, partition: &str, key: &RequestKey) -> AgentResult<Option<Response>> {
        let partitions = self.partitions.read().await;
        Ok(partitions
            .iter()
            .find(|(name, _)| name == partition)
            .and_then(|(_, entries)| entries.get(key).cloned()))
    }

    async fn put(&self, partition: &str, key: RequestKey, response: Response) -> AgentResult<()> {
        let mut partitions = self.partitions.write().await;
        Self::partition_mut(&mut partitions, partition).insert(key, response);
        Ok(())
    }

    async fn put_all(
        &self,
        partition: &str,
        entries: Vec<(RequestKey, Response)>,
    ) -> AgentResult<()> {
        // Single write guard: no reader observes a half-applied batch
        let mut partitions = self.partitions.write().await;
        let target = Self::partition_mut(&mut partitions, partition);
        target.extend(entries);
        Ok(())
    }

    async fn entries_in(&self, partition: &str) -> AgentResult<Vec<RequestKey>> {
        let partitions = self.partitions.read().await;
        Ok(partitions
            .iter()
            .find(|(name, _)| name == partition)
            .map(|(_, entries)| entries.keys().cloned().collect())
            .unwrap_or_default())
    }
}
