/// Redis-backed membership store
use super::MembershipStore;
use crate::config::CacheConfig;
use crate::error::{LookupError, LookupResult};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::time::Duration;

/// Shared connection to the cache database
///
/// `ConnectionManager` multiplexes and reconnects, so clones are cheap and
/// safe to use from concurrent tasks.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

fn cache_error(action: &str, e: redis::RedisError) -> LookupError {
    LookupError::Cache(format!("{} failed: {}", action, e))
}

/// Redis expiry for a configured TTL, never below one second
fn expiry_secs(ttl: Duration) -> i64 {
    ttl.as_secs().max(1) as i64
}

/// Map a `TTL` reply; -2 means missing and -1 means no expiry
fn remaining(seconds: i64) -> Option<Duration> {
    if seconds < 0 {
        None
    } else {
        Some(Duration::from_secs(seconds as u64))
    }
}

impl RedisStore {
    /// Connect to the cache database described by `config`
    pub async fn connect(config: &CacheConfig) -> LookupResult<Self> {
        let client = Client::open(config.redis_url())
            .map_err(|e| cache_error("Redis client creation", e))?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| cache_error("Redis connection", e))?;

        Ok(Self { connection })
    }

    /// Ping Redis to check the connection
    pub async fn ping(&self) -> LookupResult<()> {
        let mut conn = self.connection.clone();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| cache_error("Redis PING", e))?;

        if pong != "PONG" {
            return Err(LookupError::Cache(
                "Unexpected Redis PING response".to_string(),
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl MembershipStore for RedisStore {
    async fn members(&self, key: &str) -> LookupResult<Option<Vec<String>>> {
        let mut conn = self.connection.clone();
        let members: Vec<String> = conn
            .smembers(key)
            .await
            .map_err(|e| cache_error("Cache read", e))?;

        // Redis never keeps an empty set, so no members means no key
        if members.is_empty() {
            Ok(None)
        } else {
            Ok(Some(members))
        }
    }

    async fn replace(&self, key: &str, members: &[String], ttl: Duration) -> LookupResult<()> {
        let mut conn = self.connection.clone();

        let mut pipe = redis::pipe();
        pipe.atomic().del(key).ignore();
        if !members.is_empty() {
            pipe.sadd(key, members)
                .ignore()
                .expire(key, expiry_secs(ttl))
                .ignore();
        }

        let _: () = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| cache_error("Cache write", e))?;

        Ok(())
    }

    async fn ttl(&self, key: &str) -> LookupResult<Option<Duration>> {
        let mut conn = self.connection.clone();
        let seconds: i64 = conn
            .ttl(key)
            .await
            .map_err(|e| cache_error("Cache TTL check", e))?;

        Ok(remaining(seconds))
    }
}
