//! Non-durable, in-process URL Store.
//!
//! Shared across request tasks, so every operation takes the mutex for its
//! whole read-modify-write. Suitable for tests and local runs only; the
//! PostgreSQL store is the system of record.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::entities::{NewShortUrl, ShortUrlRecord};
use crate::domain::repositories::UrlRepository;
use crate::error::AppError;

#[derive(Default)]
pub struct MemoryUrlRepository {
    records: Mutex<HashMap<String, ShortUrlRecord>>,
}

impl MemoryUrlRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ShortUrlRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[async_trait]
impl UrlRepository for MemoryUrlRepository {
    async fn exists(&self, short_code: &str) -> Result<bool, AppError> {
        Ok(self.lock().contains_key(short_code))
    }

    async fn insert_if_absent(
        &self,
        new_url: NewShortUrl,
    ) -> Result<Option<ShortUrlRecord>, AppError> {
        let mut records = self.lock();
        if records.contains_key(&new_url.short_code) {
            return Ok(None);
        }

        let record = new_url.into_record();
        records.insert(record.short_code.clone(), record.clone());
        Ok(Some(record))
    }

    async fn find_by_code(&self, short_code: &str) -> Result<Option<ShortUrlRecord>, AppError> {
        Ok(self.lock().get(short_code).cloned())
    }

    async fn record_click(&self, short_code: &str, at: DateTime<Utc>) -> Result<bool, AppError> {
        let mut records = self.lock();
        match records.get_mut(short_code) {
            Some(record) => {
                record.click_count += 1;
                record.last_accessed = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_destination(
        &self,
        short_code: &str,
        owner: &str,
        new_long_url: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<ShortUrlRecord>, AppError> {
        let mut records = self.lock();
        match records.get_mut(short_code) {
            Some(record) if record.is_owned_by(owner) => {
                record.long_url = new_long_url.to_string();
                record.updated_at = Some(at);
                Ok(Some(record.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_url(code: &str, owner: Option<&str>) -> NewShortUrl {
        NewShortUrl {
            short_code: code.to_string(),
            long_url: "https://example.com".to_string(),
            owner: owner.map(str::to_string),
            expires_at: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_if_absent_does_not_overwrite() {
        let repo = MemoryUrlRepository::new();

        let first = repo.insert_if_absent(new_url("abc123", None)).await.unwrap();
        assert!(first.is_some());

        let mut second = new_url("abc123", Some("u2"));
        second.long_url = "https://other.com".to_string();
        assert!(repo.insert_if_absent(second).await.unwrap().is_none());

        let stored = repo.find_by_code("abc123").await.unwrap().unwrap();
        assert_eq!(stored.long_url, "https://example.com");
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_record_click_increments() {
        let repo = MemoryUrlRepository::new();
        repo.insert_if_absent(new_url("abc123", None)).await.unwrap();

        let at = Utc::now();
        assert!(repo.record_click("abc123", at).await.unwrap());
        assert!(repo.record_click("abc123", at).await.unwrap());
        assert!(!repo.record_click("missing", at).await.unwrap());

        let stored = repo.find_by_code("abc123").await.unwrap().unwrap();
        assert_eq!(stored.click_count, 2);
        assert_eq!(stored.last_accessed, Some(at));
    }

    #[tokio::test]
    async fn test_update_destination_requires_owner() {
        let repo = MemoryUrlRepository::new();
        repo.insert_if_absent(new_url("abc123", Some("u1"))).await.unwrap();

        let denied = repo
            .update_destination("abc123", "u2", "https://new.com", Utc::now())
            .await
            .unwrap();
        assert!(denied.is_none());

        let updated = repo
            .update_destination("abc123", "u1", "https://new.com", Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.long_url, "https://new.com");
        assert!(updated.updated_at.is_some());
    }
}
