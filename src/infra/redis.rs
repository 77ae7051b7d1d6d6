//! Redis-backed snapshot cache.

use std::num::NonZeroUsize;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use deadpool_redis::{Config, Connection, Pool, Runtime, redis::AsyncCommands};

use crate::cache::{CacheError, CacheStore};

pub struct RedisCache {
    pool: Pool,
}

impl RedisCache {
    /// Build the pool. No connection is opened until the first command.
    pub fn new(
        url: &str,
        pool_size: NonZeroUsize,
        operation_timeout: Duration,
    ) -> Result<Self, CacheError> {
        let mut config = Config::from_url(url);
        if let Some(pool) = config.pool.as_mut() {
            pool.max_size = pool_size.get();
            pool.timeouts.wait = Some(operation_timeout);
            pool.timeouts.create = Some(operation_timeout);
            pool.timeouts.recycle = Some(operation_timeout);
        } else {
            let mut pool = deadpool_redis::PoolConfig::new(pool_size.get());
            pool.timeouts.wait = Some(operation_timeout);
            pool.timeouts.create = Some(operation_timeout);
            pool.timeouts.recycle = Some(operation_timeout);
            config.pool = Some(pool);
        }

        let pool = config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|err| CacheError::Connection(err.to_string()))?;

        Ok(Self { pool })
    }

    async fn connection(&self) -> Result<Connection, CacheError> {
        self.pool
            .get()
            .await
            .map_err(|err| CacheError::Connection(err.to_string()))
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        let mut conn = self.connection().await?;
        let value: Option<Vec<u8>> = conn
            .get(key)
            .await
            .map_err(|err| CacheError::Command(err.to_string()))?;
        Ok(value.map(Bytes::from))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        // SETEX rejects a zero expiry.
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, seconds)
            .await
            .map_err(|err| CacheError::Command(err.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(key)
            .await
            .map_err(|err| CacheError::Command(err.to_string()))
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let _: String = deadpool_redis::redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|err| CacheError::Command(err.to_string()))?;
        Ok(())
    }
}
