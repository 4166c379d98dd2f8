//! Cache seam for derived attendance state.

use async_trait::async_trait;

use crate::result::AppResult;

/// Shared cache of per-participant attendance state.
///
/// Readers repopulate entries from the database on a miss, so the pipeline
/// only ever invalidates. Deleting a key that is not cached succeeds.
#[async_trait]
pub trait CacheProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Drop a cached entry.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Check that the cache backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}
