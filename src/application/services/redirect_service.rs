//! Short code resolution for redirects.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, warn};

use super::{ServiceSettings, bounded};
use crate::domain::events::{ClickMetadata, DomainEvent, UrlClicked};
use crate::domain::repositories::UrlRepository;
use crate::error::AppError;
use crate::infrastructure::cache::{CacheService, CachedUrl};
use crate::infrastructure::messaging::EventEmitter;

/// Live destination of a short code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub long_url: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<CachedUrl> for Resolved {
    fn from(entry: CachedUrl) -> Self {
        Self {
            long_url: entry.long_url,
            expires_at: entry.expires_at,
        }
    }
}

/// Resolves short codes and records clicks.
///
/// Stateless per call. Click accounting is best-effort: the counter bump and
/// the `URLClicked` event may fail without affecting the resolved result.
pub struct RedirectService<R: UrlRepository + ?Sized> {
    repository: Arc<R>,
    cache: Arc<dyn CacheService>,
    emitter: EventEmitter,
    store_timeout: Duration,
}

impl<R: UrlRepository + ?Sized> RedirectService<R> {
    pub fn new(
        repository: Arc<R>,
        cache: Arc<dyn CacheService>,
        emitter: EventEmitter,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            repository,
            cache,
            emitter,
            store_timeout: settings.store_timeout,
        }
    }

    /// Resolves `short_code` to its destination and records the click.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if the code is unknown or expired
    /// - [`AppError::Internal`] if the store read fails or times out
    pub async fn resolve(
        &self,
        short_code: &str,
        click: ClickMetadata,
    ) -> Result<Resolved, AppError> {
        let entry = self.lookup(short_code).await?;
        let now = Utc::now();

        if entry.expires_at.is_some_and(|expires_at| now > expires_at) {
            debug!(short_code, "Short URL expired");
            return Err(not_found(short_code));
        }

        match bounded(self.store_timeout, self.repository.record_click(short_code, now)).await {
            Ok(true) => {}
            Ok(false) => debug!(short_code, "Click counter target vanished"),
            Err(e) => {
                metrics::counter!("click_update_failed_total").increment(1);
                warn!(short_code, error = %e, "Failed to update click count");
            }
        }

        self.emitter.emit(DomainEvent::UrlClicked(UrlClicked {
            short_code: short_code.to_string(),
            clicked_at: now,
            user_agent: click.user_agent,
            referer: click.referer,
            ip_address: click.ip_address,
        }));

        metrics::counter!("redirects_total").increment(1);

        Ok(entry.into())
    }

    /// Read-through lookup: cache first, store on miss or cache failure.
    async fn lookup(&self, short_code: &str) -> Result<CachedUrl, AppError> {
        match self.cache.get(short_code).await {
            Ok(Some(entry)) => return Ok(entry),
            Ok(None) => {}
            Err(e) => warn!(short_code, error = %e, "Cache read failed, falling back to store"),
        }

        let record = bounded(self.store_timeout, self.repository.find_by_code(short_code))
            .await?
            .ok_or_else(|| not_found(short_code))?;

        let entry = CachedUrl {
            long_url: record.long_url,
            expires_at: record.expires_at,
        };

        if let Some(ttl) = cache_ttl(entry.expires_at, Utc::now())
            && let Err(e) = self.cache.set(short_code, &entry, ttl).await
        {
            warn!(short_code, error = %e, "Failed to populate cache");
        }

        Ok(entry)
    }
}

fn not_found(short_code: &str) -> AppError {
    AppError::not_found("Short URL not found", json!({ "short_code": short_code }))
}

/// TTL for a cache entry: `Some(None)` defers to the cache default, `None`
/// means the record is already expired and must not be cached.
fn cache_ttl(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<Option<u64>> {
    match expires_at {
        None => Some(None),
        Some(expires_at) => {
            let remaining = (expires_at - now).num_seconds();
            (remaining > 0).then(|| Some(remaining as u64))
        }
    }
}
