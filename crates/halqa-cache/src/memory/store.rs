//! Single-process attendance cache on moka.

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;

use halqa_core::config::cache::MemoryCacheConfig;
use halqa_core::result::AppResult;
use halqa_core::traits::cache::CacheProvider;

/// In-memory cache provider using moka.
///
/// Entries expire after `time_to_live_seconds` even if never invalidated.
#[derive(Debug, Clone)]
pub struct MemoryCacheProvider {
    cache: Cache<String, String>,
}

impl MemoryCacheProvider {
    /// Create a new in-memory cache from configuration.
    pub fn new(config: &MemoryCacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(Duration::from_secs(config.time_to_live_seconds))
            .build();
        Self { cache }
    }

    #[cfg(test)]
    async fn insert(&self, key: &str, value: &str) {
        self.cache.insert(key.to_string(), value.to_string()).await;
    }
}

#[async_trait]
impl CacheProvider for MemoryCacheProvider {
    async fn delete(&self, key: &str) -> AppResult<()> {
        self.cache.invalidate(key).await;
        Ok(())
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys;
    use halqa_core::types::{SessionId, UserId};

    fn make_provider() -> MemoryCacheProvider {
        let config = MemoryCacheConfig {
            max_capacity: 1000,
            time_to_live_seconds: 60,
        };
        MemoryCacheProvider::new(&config)
    }

    #[tokio::test]
    async fn test_delete_invalidates_only_that_participant() {
        let provider = make_provider();
        let session = SessionId::new();
        let (alice, bob) = (UserId::new(), UserId::new());
        provider.insert(&keys::attendance_status(session, alice), "attended").await;
        provider.insert(&keys::attendance_status(session, bob), "late").await;

        provider.delete(&keys::attendance_status(session, alice)).await.unwrap();

        assert!(!provider.cache.contains_key(&keys::attendance_status(session, alice)));
        assert!(provider.cache.contains_key(&keys::attendance_status(session, bob)));
    }

    #[tokio::test]
    async fn test_delete_missing_key_is_ok() {
        let provider = make_provider();
        provider.delete("never-set").await.unwrap();
    }

    #[tokio::test]
    async fn test_health_check() {
        let provider = make_provider();
        assert!(provider.health_check().await.unwrap());
    }
}
