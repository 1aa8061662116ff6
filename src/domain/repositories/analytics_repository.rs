//! Repository trait for the analytics sink.

use crate::domain::entities::{AnalyticsRow, NewAnalyticsRow};
use crate::error::AppError;
use async_trait::async_trait;

/// Append-only analytics store written by the event consumers.
///
/// No deduplication happens here: the consumer delivers at least once, so
/// the same event may be appended more than once.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalyticsRepository: Send + Sync {
    /// Appends one row.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn insert(&self, row: NewAnalyticsRow) -> Result<(), AppError>;

    /// Lists the most recent rows for a short code, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn list_for_code(
        &self,
        short_code: &str,
        limit: i64,
    ) -> Result<Vec<AnalyticsRow>, AppError>;
}
