//! Cache service trait and error types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache connection error: {0}")]
    ConnectionError(String),
    #[error("Cache operation error: {0}")]
    OperationError(String),
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cached projection of a short URL record.
///
/// Carries the expiry so a cache hit still goes through the read-time
/// liveness check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedUrl {
    pub long_url: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Read-through cache in front of the URL Store.
///
/// The store stays the system of record: entries are written after a store
/// read and invalidated on every destination update. Implementations are
/// fail-open, so a cache failure degrades to a store lookup.
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::RedisCache`] - Redis-backed cache with TTL support
/// - [`crate::infrastructure::cache::NullCache`] - No-op implementation for disabled caching
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Looks up a cached entry.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(entry))` on cache hit
    /// - `Ok(None)` on cache miss or backend error (fail-open)
    async fn get(&self, short_code: &str) -> CacheResult<Option<CachedUrl>>;

    /// Stores an entry; `ttl_seconds = None` applies the implementation default.
    async fn set(
        &self,
        short_code: &str,
        entry: &CachedUrl,
        ttl_seconds: Option<u64>,
    ) -> CacheResult<()>;

    /// Removes a cached entry. Called after a destination update.
    async fn invalidate(&self, short_code: &str) -> CacheResult<()>;

    /// Checks if the cache backend is healthy.
    async fn health_check(&self) -> bool;
}
