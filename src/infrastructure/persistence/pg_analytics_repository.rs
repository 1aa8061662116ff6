//! PostgreSQL implementation of the analytics sink.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{FromRow, PgPool};
use std::sync::Arc;

use crate::domain::entities::{AnalyticsRow, NewAnalyticsRow};
use crate::domain::events::EventKind;
use crate::domain::repositories::AnalyticsRepository;
use crate::error::AppError;

#[derive(FromRow)]
struct AnalyticsRecord {
    id: i64,
    event_type: String,
    short_code: String,
    long_url: Option<String>,
    user_id: Option<String>,
    user_agent: Option<String>,
    referer: Option<String>,
    ip_address: Option<String>,
    timestamp: DateTime<Utc>,
    ingested_at: DateTime<Utc>,
}

impl TryFrom<AnalyticsRecord> for AnalyticsRow {
    type Error = AppError;

    fn try_from(r: AnalyticsRecord) -> Result<Self, Self::Error> {
        let event_type = EventKind::parse(&r.event_type).ok_or_else(|| {
            AppError::internal(
                "Unknown analytics event type",
                json!({ "event_type": r.event_type, "id": r.id }),
            )
        })?;

        Ok(Self {
            id: r.id,
            event_type,
            short_code: r.short_code,
            long_url: r.long_url,
            user_id: r.user_id,
            user_agent: r.user_agent,
            referer: r.referer,
            ip_address: r.ip_address,
            timestamp: r.timestamp,
            ingested_at: r.ingested_at,
        })
    }
}

/// PostgreSQL repository for the append-only `analytics` table.
pub struct PgAnalyticsRepository {
    pool: Arc<PgPool>,
}

impl PgAnalyticsRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AnalyticsRepository for PgAnalyticsRepository {
    async fn insert(&self, row: NewAnalyticsRow) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO analytics
                (event_type, short_code, long_url, user_id, user_agent, referer, ip_address, timestamp)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(row.event_type.as_str())
        .bind(&row.short_code)
        .bind(&row.long_url)
        .bind(&row.user_id)
        .bind(&row.user_agent)
        .bind(&row.referer)
        .bind(&row.ip_address)
        .bind(row.timestamp)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn list_for_code(
        &self,
        short_code: &str,
        limit: i64,
    ) -> Result<Vec<AnalyticsRow>, AppError> {
        let rows = sqlx::query_as::<_, AnalyticsRecord>(
            r#"
            SELECT id, event_type, short_code, long_url, user_id, user_agent, referer,
                   ip_address, timestamp, ingested_at
            FROM analytics
            WHERE short_code = $1
            ORDER BY timestamp DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(short_code)
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.into_iter().map(AnalyticsRow::try_from).collect()
    }
}
