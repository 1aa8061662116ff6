//! Short URL creation and destination updates.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, warn};

use super::{CodeAllocator, ServiceSettings, bounded};
use crate::domain::entities::{NewShortUrl, ShortUrlRecord};
use crate::domain::events::{DomainEvent, UrlCreated};
use crate::domain::repositories::UrlRepository;
use crate::error::AppError;
use crate::infrastructure::cache::CacheService;
use crate::infrastructure::messaging::EventEmitter;
use crate::utils::time::parse_expires_at;
use crate::utils::url_validator::validate_long_url;

/// Input of [`ShortenerService::shorten`].
#[derive(Debug, Clone, Default)]
pub struct ShortenCommand {
    pub long_url: String,
    pub owner: Option<String>,
    pub custom_alias: Option<String>,
    /// RFC 3339 timestamp; `None` or empty means "never expires".
    pub expires_at: Option<String>,
}

/// Input of [`ShortenerService::update`].
#[derive(Debug, Clone)]
pub struct UpdateCommand {
    pub short_code: String,
    pub new_long_url: String,
    pub owner: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub short_code: String,
    pub message: String,
}

/// Creates short URLs and lets their owners repoint them.
///
/// Persisting a record and announcing it are decoupled: the `URLCreated`
/// event is emitted on a detached task after the insert commits, so a broker
/// outage never fails a shorten call.
pub struct ShortenerService<R: UrlRepository + ?Sized> {
    repository: Arc<R>,
    allocator: CodeAllocator<R>,
    cache: Arc<dyn CacheService>,
    emitter: EventEmitter,
    store_timeout: Duration,
}

impl<R: UrlRepository + ?Sized> ShortenerService<R> {
    pub fn new(
        repository: Arc<R>,
        cache: Arc<dyn CacheService>,
        emitter: EventEmitter,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            allocator: CodeAllocator::new(
                repository.clone(),
                settings.max_allocation_attempts,
                settings.store_timeout,
            ),
            repository,
            cache,
            emitter,
            store_timeout: settings.store_timeout,
        }
    }

    /// Creates a short URL.
    ///
    /// # Flow
    ///
    /// 1. Validate the destination and parse the optional expiry
    /// 2. Allocate a code (alias verbatim, or random)
    /// 3. Conditional insert; a generated code that lost a race is
    ///    reallocated, up to `max_allocation_attempts` races
    /// 4. Emit `URLCreated` fire-and-forget
    ///
    /// An expiry in the past is accepted; the code is simply never resolvable.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidArgument`] for a bad URL, expiry, or alias
    /// - [`AppError::AlreadyExists`] if the alias is taken
    /// - [`AppError::AllocationExhausted`] if no free code was found
    /// - [`AppError::Internal`] on store failure or timeout
    pub async fn shorten(&self, command: ShortenCommand) -> Result<ShortUrlRecord, AppError> {
        validate_long_url(&command.long_url)?;

        let expires_at = parse_expires_at(command.expires_at.as_deref()).map_err(|e| {
            AppError::invalid_argument(
                "Invalid expires_at format, expected RFC 3339",
                json!({ "reason": e.to_string() }),
            )
        })?;

        let owner = command.owner.filter(|o| !o.is_empty());
        let custom_alias = command.custom_alias.filter(|a| !a.is_empty());

        let new_url = |short_code: String| NewShortUrl {
            short_code,
            long_url: command.long_url.clone(),
            owner: owner.clone(),
            expires_at,
            created_at: Utc::now(),
        };

        let record = self.insert_allocated(custom_alias.as_deref(), new_url).await?;

        metrics::counter!("short_codes_allocated_total").increment(1);
        info!(
            short_code = %record.short_code,
            owner = record.owner.as_deref().unwrap_or(""),
            "Short URL created"
        );

        self.emitter.emit(DomainEvent::UrlCreated(UrlCreated {
            short_code: record.short_code.clone(),
            long_url: record.long_url.clone(),
            user_id: record.owner.clone(),
            created_at: record.created_at,
        }));

        Ok(record)
    }

    async fn insert(&self, new_url: NewShortUrl) -> Result<Option<ShortUrlRecord>, AppError> {
        bounded(self.store_timeout, self.repository.insert_if_absent(new_url)).await
    }

    /// Allocates a code and inserts it. A generated code that lost the insert
    /// race is reallocated; at most `max_attempts` races are tolerated.
    async fn insert_allocated(
        &self,
        custom_alias: Option<&str>,
        new_url: impl Fn(String) -> NewShortUrl,
    ) -> Result<ShortUrlRecord, AppError> {
        let max_races = self.allocator.max_attempts();
        let mut races = 0;

        loop {
            let code = self.allocator.allocate(custom_alias).await?;

            if let Some(record) = self.insert(new_url(code.clone())).await? {
                return Ok(record);
            }

            if let Some(alias) = custom_alias {
                return Err(AppError::already_exists(
                    "Custom alias already exists",
                    json!({ "alias": alias }),
                ));
            }

            races += 1;
            metrics::counter!("short_code_collisions_total").increment(1);
            debug!(short_code = %code, races, "Lost insert race for generated code");

            if races >= max_races {
                return Err(AppError::allocation_exhausted(
                    "Failed to allocate a unique short code",
                    json!({ "attempts": max_races }),
                ));
            }
        }
    }

    /// Repoints a short URL owned by `command.owner`.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidArgument`] for a bad destination URL
    /// - [`AppError::NotFound`] if the code does not exist
    /// - [`AppError::PermissionDenied`] if the record is owned by someone else or by nobody
    /// - [`AppError::Internal`] on store failure or timeout
    pub async fn update(&self, command: UpdateCommand) -> Result<UpdateOutcome, AppError> {
        validate_long_url(&command.new_long_url)?;

        let record = bounded(
            self.store_timeout,
            self.repository.find_by_code(&command.short_code),
        )
        .await?
        .ok_or_else(|| {
            AppError::not_found(
                "Short URL not found",
                json!({ "short_code": command.short_code }),
            )
        })?;

        if !record.is_owned_by(&command.owner) {
            return Err(AppError::permission_denied(
                "You don't have permission to update this URL",
                json!({ "short_code": command.short_code }),
            ));
        }

        let updated = bounded(
            self.store_timeout,
            self.repository.update_destination(
                &command.short_code,
                &command.owner,
                &command.new_long_url,
                Utc::now(),
            ),
        )
        .await?;

        if updated.is_none() {
            return Err(AppError::not_found(
                "Short URL not found",
                json!({ "short_code": command.short_code }),
            ));
        }

        if let Err(e) = self.cache.invalidate(&command.short_code).await {
            warn!(short_code = %command.short_code, error = %e, "Failed to invalidate cache entry");
        }

        info!(short_code = %command.short_code, "Short URL destination updated");

        Ok(UpdateOutcome {
            short_code: command.short_code,
            message: "URL destination updated successfully".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::MockUrlRepository;
    use crate::infrastructure::cache::{MockCacheService, NullCache};
    use crate::infrastructure::messaging::{
        BrokerError, EventPublisher, MemoryBroker, MockEventPublisher, Topics,
    };
    use crate::infrastructure::persistence::MemoryUrlRepository;

    fn emitter(publisher: Arc<dyn EventPublisher>) -> EventEmitter {
        EventEmitter::new(publisher, Topics::default(), Duration::from_secs(1))
    }

    fn memory_service(
        repo: Arc<MemoryUrlRepository>,
        broker: &MemoryBroker,
    ) -> ShortenerService<MemoryUrlRepository> {
        ShortenerService::new(
            repo,
            Arc::new(NullCache::new()),
            emitter(Arc::new(broker.clone())),
            ServiceSettings::default(),
        )
    }

    fn record(code: &str, owner: Option<&str>) -> ShortUrlRecord {
        NewShortUrl {
            short_code: code.to_string(),
            long_url: "https://example.com".to_string(),
            owner: owner.map(str::to_string),
            expires_at: None,
            created_at: Utc::now(),
        }
        .into_record()
    }

    async fn wait_for_messages(broker: &MemoryBroker, topic: &str, count: usize) {
        for _ in 0..100 {
            if broker.topic_len(topic) >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {count} messages on {topic}");
    }

    fn alias_command(long_url: &str, alias: &str) -> ShortenCommand {
        ShortenCommand {
            long_url: long_url.to_string(),
            custom_alias: Some(alias.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_shorten_with_alias_returns_alias() {
        let broker = MemoryBroker::new();
        let service = memory_service(Arc::new(MemoryUrlRepository::new()), &broker);

        let record = service
            .shorten(alias_command("https://example.com", "abc123"))
            .await
            .unwrap();

        assert_eq!(record.short_code, "abc123");
        assert_eq!(record.long_url, "https://example.com");
        assert_eq!(record.click_count, 0);
    }

    #[tokio::test]
    async fn test_shorten_duplicate_alias_already_exists() {
        let repo = Arc::new(MemoryUrlRepository::new());
        let service = memory_service(repo.clone(), &MemoryBroker::new());

        service
            .shorten(alias_command("https://example.com", "abc123"))
            .await
            .unwrap();
        let err = service
            .shorten(alias_command("https://x.com", "abc123"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::AlreadyExists { .. }));
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_shorten_emits_created_event() {
        let broker = MemoryBroker::new();
        let service = memory_service(Arc::new(MemoryUrlRepository::new()), &broker);

        let record = service
            .shorten(ShortenCommand {
                long_url: "https://example.com/a".to_string(),
                owner: Some("u1".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        wait_for_messages(&broker, "url-created-events", 1).await;
        let message = &broker.messages("url-created-events")[0];
        let payload: serde_json::Value =
            serde_json::from_slice(message.payload.as_deref().unwrap()).unwrap();

        assert_eq!(payload["short_code"], record.short_code);
        assert_eq!(payload["long_url"], "https://example.com/a");
        assert_eq!(payload["user_id"], "u1");
        assert_eq!(message.key.as_deref(), Some(record.short_code.as_bytes()));
    }

    #[tokio::test]
    async fn test_shorten_rejects_invalid_url_and_expiry() {
        let service = memory_service(Arc::new(MemoryUrlRepository::new()), &MemoryBroker::new());

        let err = service
            .shorten(ShortenCommand {
                long_url: "javascript:alert(1)".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument { .. }));

        let err = service
            .shorten(ShortenCommand {
                long_url: "https://example.com".to_string(),
                expires_at: Some("next week".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn test_shorten_accepts_past_expiry() {
        let service = memory_service(Arc::new(MemoryUrlRepository::new()), &MemoryBroker::new());

        let record = service
            .shorten(ShortenCommand {
                long_url: "https://x.com".to_string(),
                expires_at: Some("2000-01-01T00:00:00Z".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(record.is_expired());
    }

    #[tokio::test]
    async fn test_shorten_succeeds_when_publish_fails() {
        let mut publisher = MockEventPublisher::new();
        publisher.expect_publish().returning(|topic, _| {
            Err(BrokerError::PublishFailed {
                topic: topic.to_string(),
                reason: "broker down".to_string(),
            })
        });

        let service = ShortenerService::new(
            Arc::new(MemoryUrlRepository::new()),
            Arc::new(NullCache::new()),
            emitter(Arc::new(publisher)),
            ServiceSettings::default(),
        );

        assert!(
            service
                .shorten(alias_command("https://example.com", "abc123"))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_shorten_regenerates_after_lost_insert_race() {
        let mut repo = MockUrlRepository::new();
        repo.expect_exists().returning(|_| Ok(false));

        let mut seq = mockall::Sequence::new();
        repo.expect_insert_if_absent()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(None));
        repo.expect_insert_if_absent()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|new_url| Ok(Some(new_url.into_record())));

        let service = ShortenerService::new(
            Arc::new(repo),
            Arc::new(NullCache::new()),
            emitter(Arc::new(MemoryBroker::new())),
            ServiceSettings::default(),
        );

        let record = service
            .shorten(ShortenCommand {
                long_url: "https://example.com".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(record.short_code.len(), 8);
    }

    #[tokio::test]
    async fn test_shorten_exhausted_after_repeated_lost_races() {
        let mut repo = MockUrlRepository::new();
        repo.expect_exists().returning(|_| Ok(false));
        repo.expect_insert_if_absent().times(3).returning(|_| Ok(None));

        let service = ShortenerService::new(
            Arc::new(repo),
            Arc::new(NullCache::new()),
            emitter(Arc::new(MemoryBroker::new())),
            ServiceSettings {
                max_allocation_attempts: 3,
                ..ServiceSettings::default()
            },
        );

        let err = service
            .shorten(ShortenCommand {
                long_url: "https://example.com".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::AllocationExhausted { .. }));
    }

    #[tokio::test]
    async fn test_shorten_lost_alias_race_is_already_exists() {
        let mut repo = MockUrlRepository::new();
        repo.expect_exists().returning(|_| Ok(false));
        repo.expect_insert_if_absent().times(1).returning(|_| Ok(None));

        let service = ShortenerService::new(
            Arc::new(repo),
            Arc::new(NullCache::new()),
            emitter(Arc::new(MemoryBroker::new())),
            ServiceSettings::default(),
        );

        let err = service
            .shorten(alias_command("https://example.com", "abc123"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::AlreadyExists { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_alias_claims_single_winner() {
        let repo = Arc::new(MemoryUrlRepository::new());
        let service = Arc::new(memory_service(repo.clone(), &MemoryBroker::new()));

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .shorten(alias_command(&format!("https://example.com/{i}"), "race"))
                        .await
                })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(e) => assert!(matches!(e, AppError::AlreadyExists { .. })),
            }
        }

        assert_eq!(created, 1);
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_update_by_non_owner_permission_denied() {
        let mut repo = MockUrlRepository::new();
        repo.expect_find_by_code()
            .returning(|code| Ok(Some(record(code, Some("u1")))));
        repo.expect_update_destination().times(0);

        let service = ShortenerService::new(
            Arc::new(repo),
            Arc::new(NullCache::new()),
            emitter(Arc::new(MemoryBroker::new())),
            ServiceSettings::default(),
        );

        let err = service
            .update(UpdateCommand {
                short_code: "abc123".to_string(),
                new_long_url: "https://new.com".to_string(),
                owner: "u2".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::PermissionDenied { .. }));
    }

    #[tokio::test]
    async fn test_update_anonymous_record_permission_denied() {
        let mut repo = MockUrlRepository::new();
        repo.expect_find_by_code()
            .returning(|code| Ok(Some(record(code, None))));

        let service = ShortenerService::new(
            Arc::new(repo),
            Arc::new(NullCache::new()),
            emitter(Arc::new(MemoryBroker::new())),
            ServiceSettings::default(),
        );

        let err = service
            .update(UpdateCommand {
                short_code: "abc123".to_string(),
                new_long_url: "https://new.com".to_string(),
                owner: "u1".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::PermissionDenied { .. }));
    }

    #[tokio::test]
    async fn test_update_missing_code_not_found() {
        let mut repo = MockUrlRepository::new();
        repo.expect_find_by_code().returning(|_| Ok(None));

        let service = ShortenerService::new(
            Arc::new(repo),
            Arc::new(NullCache::new()),
            emitter(Arc::new(MemoryBroker::new())),
            ServiceSettings::default(),
        );

        let err = service
            .update(UpdateCommand {
                short_code: "nope".to_string(),
                new_long_url: "https://new.com".to_string(),
                owner: "u1".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_by_owner_invalidates_cache() {
        let repo = Arc::new(MemoryUrlRepository::new());
        repo.insert_if_absent(NewShortUrl {
            short_code: "abc123".to_string(),
            long_url: "https://old.com".to_string(),
            owner: Some("u1".to_string()),
            expires_at: None,
            created_at: Utc::now(),
        })
        .await
        .unwrap();

        let mut cache = MockCacheService::new();
        cache
            .expect_invalidate()
            .withf(|code| code == "abc123")
            .times(1)
            .returning(|_| Ok(()));

        let service = ShortenerService::new(
            repo.clone(),
            Arc::new(cache),
            emitter(Arc::new(MemoryBroker::new())),
            ServiceSettings::default(),
        );

        let outcome = service
            .update(UpdateCommand {
                short_code: "abc123".to_string(),
                new_long_url: "https://new.com".to_string(),
                owner: "u1".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(outcome.message, "URL destination updated successfully");
        let stored = repo.find_by_code("abc123").await.unwrap().unwrap();
        assert_eq!(stored.long_url, "https://new.com");
        assert!(stored.updated_at.is_some());
    }
}
