//! Redis-backed [`ExistenceCache`] implementation.
//!
//! The markers live in the same Redis instance as the job queues and are
//! written by the create-path worker jobs, not by this service. The cache
//! contract is presence-only: `EXISTS product_42` is the entire read.

use async_trait::async_trait;
use redis::AsyncCommands;
use shop_relay_core::{CacheError, ExistenceCache, LifecycleKey};

/// Existence cache reading marker keys from Redis
pub struct RedisExistenceCache {
    client: redis::Client,
}

impl RedisExistenceCache {
    /// Create a cache from a Redis connection string.
    ///
    /// The connection is established lazily on first use; this only
    /// validates the URL.
    pub fn new(connection_string: &str) -> Result<Self, CacheError> {
        let client =
            redis::Client::open(connection_string).map_err(|e| CacheError::Unavailable {
                message: format!("invalid Redis connection string: {}", e),
            })?;

        Ok(Self { client })
    }
}

impl std::fmt::Debug for RedisExistenceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisExistenceCache").finish_non_exhaustive()
    }
}

#[async_trait]
impl ExistenceCache for RedisExistenceCache {
    async fn exists(&self, key: &LifecycleKey) -> Result<bool, CacheError> {
        let mut con = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| CacheError::Unavailable {
                message: e.to_string(),
            })?;

        con.exists(key.as_str())
            .await
            .map_err(|e| CacheError::Unavailable {
                message: e.to_string(),
            })
    }
}

#[cfg(test)]
#[path = "redis_cache_tests.rs"]
mod tests;
