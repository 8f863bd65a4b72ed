/// Cache-aside layer for membership lookups
///
/// Member sets are stored as Redis sets, one key per (namespace, identifier):
/// - organizational group members under `egroup:`
/// - computing group members under `unixgroup:`
/// - a user's organizational groups under `u:`
/// - a user's computing groups under `unixuser:`

pub mod decorator;
pub mod redis_store;

#[cfg(test)]
pub mod memory;

pub use decorator::CachedLookup;
pub use redis_store::RedisStore;

use crate::error::LookupResult;
use async_trait::async_trait;
use std::time::Duration;

/// Key-value store holding member sets with an expiry
#[async_trait]
pub trait MembershipStore: Send + Sync + 'static {
    /// Members stored at `key`, `None` when the key is missing or expired
    async fn members(&self, key: &str) -> LookupResult<Option<Vec<String>>>;

    /// Replace the set at `key` and reset its expiry in one atomic step
    async fn replace(&self, key: &str, members: &[String], ttl: Duration) -> LookupResult<()>;

    /// Remaining lifetime of `key`, `None` when missing or without expiry
    async fn ttl(&self, key: &str) -> LookupResult<Option<Duration>>;
}
