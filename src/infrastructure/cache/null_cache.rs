//! Cache stand-in used when `REDIS_URL` is unset or Redis is unreachable.

use super::service::{CacheResult, CacheService, CachedUrl};
use async_trait::async_trait;

/// Always misses. Every resolve falls through to the URL Store, and writes
/// and invalidations are dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCache;

impl NullCache {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CacheService for NullCache {
    async fn get(&self, _: &str) -> CacheResult<Option<CachedUrl>> {
        Ok(None)
    }

    async fn set(&self, _: &str, _: &CachedUrl, _: Option<u64>) -> CacheResult<()> {
        Ok(())
    }

    async fn invalidate(&self, _: &str) -> CacheResult<()> {
        Ok(())
    }

    /// Nothing to reach, so never reported as degraded.
    async fn health_check(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_is_never_visible() {
        let cache = NullCache::new();
        let entry = CachedUrl {
            long_url: "https://example.com".to_string(),
            expires_at: None,
        };

        cache.set("abc123", &entry, Some(60)).await.unwrap();

        assert!(cache.get("abc123").await.unwrap().is_none());
        assert!(cache.health_check().await);
    }
}
