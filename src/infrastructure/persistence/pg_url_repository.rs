//! PostgreSQL implementation of the URL Store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::sync::Arc;

use crate::domain::entities::{NewShortUrl, ShortUrlRecord};
use crate::domain::repositories::UrlRepository;
use crate::error::AppError;

#[derive(FromRow)]
struct UrlRow {
    short_code: String,
    long_url: String,
    user_id: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    click_count: i64,
    last_accessed: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<UrlRow> for ShortUrlRecord {
    fn from(r: UrlRow) -> Self {
        Self {
            short_code: r.short_code,
            long_url: r.long_url,
            owner: r.user_id,
            expires_at: r.expires_at,
            created_at: r.created_at,
            click_count: r.click_count,
            last_accessed: r.last_accessed,
            updated_at: r.updated_at,
        }
    }
}

const RETURNING_COLUMNS: &str =
    "short_code, long_url, user_id, expires_at, created_at, click_count, last_accessed, updated_at";

/// PostgreSQL repository for short URL records.
///
/// Uniqueness is enforced by the `urls` primary key; inserts use
/// `ON CONFLICT DO NOTHING` so a lost allocation race never overwrites.
pub struct PgUrlRepository {
    pool: Arc<PgPool>,
}

impl PgUrlRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UrlRepository for PgUrlRepository {
    async fn exists(&self, short_code: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM urls WHERE short_code = $1)",
        )
        .bind(short_code)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(exists)
    }

    async fn insert_if_absent(
        &self,
        new_url: NewShortUrl,
    ) -> Result<Option<ShortUrlRecord>, AppError> {
        let sql = format!(
            r#"
            INSERT INTO urls (short_code, long_url, user_id, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (short_code) DO NOTHING
            RETURNING {RETURNING_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, UrlRow>(&sql)
            .bind(&new_url.short_code)
            .bind(&new_url.long_url)
            .bind(&new_url.owner)
            .bind(new_url.expires_at)
            .bind(new_url.created_at)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.map(ShortUrlRecord::from))
    }

    async fn find_by_code(&self, short_code: &str) -> Result<Option<ShortUrlRecord>, AppError> {
        let sql = format!("SELECT {RETURNING_COLUMNS} FROM urls WHERE short_code = $1");

        let row = sqlx::query_as::<_, UrlRow>(&sql)
            .bind(short_code)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.map(ShortUrlRecord::from))
    }

    async fn record_click(&self, short_code: &str, at: DateTime<Utc>) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE urls
            SET click_count = click_count + 1, last_accessed = $2
            WHERE short_code = $1
            "#,
        )
        .bind(short_code)
        .bind(at)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_destination(
        &self,
        short_code: &str,
        owner: &str,
        new_long_url: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<ShortUrlRecord>, AppError> {
        let sql = format!(
            r#"
            UPDATE urls
            SET long_url = $3, updated_at = $4
            WHERE short_code = $1 AND user_id = $2
            RETURNING {RETURNING_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, UrlRow>(&sql)
            .bind(short_code)
            .bind(owner)
            .bind(new_long_url)
            .bind(at)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.map(ShortUrlRecord::from))
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }
}
