//! Repository trait for short URL records.

use crate::domain::entities::{NewShortUrl, ShortUrlRecord};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// The URL Store: durable short code → destination records.
///
/// Every mutating operation is a single atomic statement at the store; callers
/// never read-modify-write.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgUrlRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::persistence::MemoryUrlRepository`] - non-durable, for tests and local runs
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UrlRepository: Send + Sync {
    /// Returns whether a record with this code exists (expired ones included).
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn exists(&self, short_code: &str) -> Result<bool, AppError>;

    /// Inserts the record unless the code is already taken.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(record))` if inserted
    /// - `Ok(None)` if a record with the same code already exists; nothing is overwritten
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn insert_if_absent(
        &self,
        new_url: NewShortUrl,
    ) -> Result<Option<ShortUrlRecord>, AppError>;

    /// Finds a record by its short code.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn find_by_code(&self, short_code: &str) -> Result<Option<ShortUrlRecord>, AppError>;

    /// Atomically increments `click_count` and sets `last_accessed = at`.
    ///
    /// Returns `Ok(false)` if no record matched.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn record_click(&self, short_code: &str, at: DateTime<Utc>) -> Result<bool, AppError>;

    /// Replaces the destination if and only if `owner` owns the record.
    ///
    /// Returns `Ok(None)` if no record matched both the code and the owner.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn update_destination(
        &self,
        short_code: &str,
        owner: &str,
        new_long_url: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<ShortUrlRecord>, AppError>;

    /// Cheap liveness probe used by the health endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the store is unreachable.
    async fn ping(&self) -> Result<(), AppError>;
}
