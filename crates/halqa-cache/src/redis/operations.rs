//! Attendance cache invalidation on Redis.

use async_trait::async_trait;

use halqa_core::error::{AppError, ErrorKind};
use halqa_core::result::AppResult;
use halqa_core::traits::cache::CacheProvider;

use super::client::RedisClient;

/// Redis-backed cache provider.
#[derive(Debug, Clone)]
pub struct RedisCacheProvider {
    client: RedisClient,
}

impl RedisCacheProvider {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }
}

fn cache_error(operation: &str, e: redis::RedisError) -> AppError {
    AppError::with_source(ErrorKind::Cache, format!("Redis {operation} failed: {e}"), e)
}

#[async_trait]
impl CacheProvider for RedisCacheProvider {
    async fn delete(&self, key: &str) -> AppResult<()> {
        let mut conn = self.client.conn_mut();
        // UNLINK frees the value off the command thread; returns the number removed.
        let removed: i64 = redis::cmd("UNLINK")
            .arg(self.client.prefixed_key(key))
            .query_async(&mut conn)
            .await
            .map_err(|e| cache_error("UNLINK", e))?;
        tracing::trace!(key, removed, "Invalidated attendance cache entry");
        Ok(())
    }

    async fn health_check(&self) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        let reply: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| cache_error("PING", e))?;
        Ok(reply == "PONG")
    }
}
