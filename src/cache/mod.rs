//! Partitioned response cache
//!
//! Responses are stored per named partition, keyed by [`RequestKey`].
//! Two partition kinds exist:
//!
//! | Kind | Name | Lifetime |
//! |------|------|----------|
//! | Primary | `{family_prefix}{version}` | Replaced wholesale by each version |
//! | Media | configured name | Grows on demand, never pruned |
//!
//! Any partition whose name carries the family prefix but not the current
//! version is stale and is deleted during activation.
//!
//! [`RequestKey`]: crate::request::RequestKey

pub mod memory;
pub mod partition;
pub mod store;

pub use memory::MemoryCacheStore;
pub use partition::PartitionNames;
pub use store::CacheStore;
