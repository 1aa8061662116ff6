//! Non-durable, in-process analytics sink.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::entities::{AnalyticsRow, NewAnalyticsRow};
use crate::domain::repositories::AnalyticsRepository;
use crate::error::AppError;

#[derive(Default)]
pub struct MemoryAnalyticsRepository {
    rows: Mutex<Vec<AnalyticsRow>>,
}

impl MemoryAnalyticsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<AnalyticsRow>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// All rows in ingestion order.
    pub fn rows(&self) -> Vec<AnalyticsRow> {
        self.lock().clone()
    }
}

#[async_trait]
impl AnalyticsRepository for MemoryAnalyticsRepository {
    async fn insert(&self, row: NewAnalyticsRow) -> Result<(), AppError> {
        let mut rows = self.lock();
        let id = rows.len() as i64 + 1;
        rows.push(AnalyticsRow {
            id,
            event_type: row.event_type,
            short_code: row.short_code,
            long_url: row.long_url,
            user_id: row.user_id,
            user_agent: row.user_agent,
            referer: row.referer,
            ip_address: row.ip_address,
            timestamp: row.timestamp,
            ingested_at: Utc::now(),
        });
        Ok(())
    }

    async fn list_for_code(
        &self,
        short_code: &str,
        limit: i64,
    ) -> Result<Vec<AnalyticsRow>, AppError> {
        let mut matching: Vec<AnalyticsRow> = self
            .lock()
            .iter()
            .filter(|r| r.short_code == short_code)
            .cloned()
            .collect();

        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        matching.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(matching)
    }
}
