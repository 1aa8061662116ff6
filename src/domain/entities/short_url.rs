//! Short URL record: the mapping between a short code and its destination.

use chrono::{DateTime, Utc};

/// A persisted short code → destination mapping.
///
/// `short_code` is globally unique and never reused. `click_count` only ever
/// grows; it is bumped by the store itself, never written back by callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortUrlRecord {
    pub short_code: String,
    pub long_url: String,
    pub owner: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub click_count: i64,
    pub last_accessed: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ShortUrlRecord {
    /// Returns true if the record is past its expiry at `now`.
    ///
    /// Expiry is strict: a record expiring exactly at `now` still resolves.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|e| now > e)
    }

    /// Returns true if the record has passed its expiry time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Returns true if `user` owns this record.
    pub fn is_owned_by(&self, user: &str) -> bool {
        self.owner.as_deref() == Some(user)
    }
}

/// Input data for inserting a new record.
#[derive(Debug, Clone)]
pub struct NewShortUrl {
    pub short_code: String,
    pub long_url: String,
    pub owner: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl NewShortUrl {
    /// Materializes the record as it looks right after insertion.
    pub fn into_record(self) -> ShortUrlRecord {
        ShortUrlRecord {
            short_code: self.short_code,
            long_url: self.long_url,
            owner: self.owner,
            expires_at: self.expires_at,
            created_at: self.created_at,
            click_count: 0,
            last_accessed: None,
            updated_at: None,
        }
    }
}
