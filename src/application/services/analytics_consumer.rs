//! Analytics ingestion from the event streams.
//!
//! Each consumer owns one topic under one consumer group and walks it as a
//! state machine:
//!
//! ```text
//! Fetch → Decode → {Process, Skip-on-decode-error} → CommitOffset → Fetch
//! ```
//!
//! The offset is committed only after the processing attempt, so a crash
//! between the analytics write and the commit redelivers the message and the
//! row is written again. Delivery is at-least-once; the sink is expected to
//! tolerate duplicates.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_retry::Retry;
use tokio_retry::strategy::FixedInterval;
use tracing::{debug, error, info, warn};

use crate::domain::entities::NewAnalyticsRow;
use crate::domain::events::{DomainEvent, EventKind};
use crate::domain::repositories::AnalyticsRepository;
use crate::infrastructure::messaging::{BrokerMessage, EventSource};

/// Outcome of a single [`AnalyticsConsumer::poll_once`] turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerStep {
    /// A message was decoded, written (or given up on) and committed.
    Processed,
    /// A malformed message was logged and committed without a write.
    Skipped,
    /// Nothing arrived within the fetch timeout.
    Idle,
    /// The fetch failed; the consumer slept for the backoff interval.
    FetchFailed,
}

#[derive(Debug, Clone, Copy)]
pub struct ConsumerSettings {
    /// Sleep after a failed fetch before trying again.
    pub backoff: Duration,
    /// How long a single fetch may wait for a message.
    pub fetch_timeout: Duration,
    /// Additional write attempts after the first failure.
    pub write_retries: usize,
    pub write_retry_interval: Duration,
}

impl Default for ConsumerSettings {
    fn default() -> Self {
        Self {
            backoff: Duration::from_secs(5),
            fetch_timeout: Duration::from_secs(10),
            write_retries: 3,
            write_retry_interval: Duration::from_millis(200),
        }
    }
}

/// Consumes one event stream into the analytics sink.
///
/// Two consumers (created and clicked) run side by side and share nothing
/// but the sink.
pub struct AnalyticsConsumer {
    kind: EventKind,
    topic: String,
    group: String,
    source: Box<dyn EventSource>,
    sink: Arc<dyn AnalyticsRepository>,
    settings: ConsumerSettings,
}

impl AnalyticsConsumer {
    pub fn new(
        kind: EventKind,
        topic: impl Into<String>,
        group: impl Into<String>,
        source: Box<dyn EventSource>,
        sink: Arc<dyn AnalyticsRepository>,
        settings: ConsumerSettings,
    ) -> Self {
        Self {
            kind,
            topic: topic.into(),
            group: group.into(),
            source,
            sink,
            settings,
        }
    }

    /// Runs one Fetch → Decode → Process/Skip → Commit turn.
    pub async fn poll_once(&mut self) -> ConsumerStep {
        let message =
            match tokio::time::timeout(self.settings.fetch_timeout, self.source.fetch()).await {
                Err(_) => return ConsumerStep::Idle,
                Ok(Err(e)) => {
                    metrics::counter!("analytics_fetch_errors_total", "topic" => self.topic.clone())
                        .increment(1);
                    warn!(
                        topic = %self.topic,
                        group = %self.group,
                        error = %e,
                        backoff_secs = self.settings.backoff.as_secs_f64(),
                        "Failed to fetch message, backing off"
                    );
                    tokio::time::sleep(self.settings.backoff).await;
                    return ConsumerStep::FetchFailed;
                }
                Ok(Ok(message)) => message,
            };

        let step = match self.decode(&message) {
            Some(event) => {
                self.write(&event, &message).await;
                ConsumerStep::Processed
            }
            None => ConsumerStep::Skipped,
        };

        if let Err(e) = self.source.commit(&message).await {
            // The message will be redelivered; the sink tolerates duplicates.
            warn!(
                topic = %message.topic,
                partition = message.partition,
                offset = message.offset,
                error = %e,
                "Failed to commit offset"
            );
        }

        step
    }

    fn decode(&self, message: &BrokerMessage) -> Option<DomainEvent> {
        let Some(payload) = message.payload.as_deref() else {
            metrics::counter!("analytics_events_skipped_total", "topic" => self.topic.clone())
                .increment(1);
            warn!(
                topic = %message.topic,
                partition = message.partition,
                offset = message.offset,
                "Skipping message without payload"
            );
            return None;
        };

        match DomainEvent::decode(self.kind, payload) {
            Ok(event) => Some(event),
            Err(e) => {
                metrics::counter!("analytics_events_skipped_total", "topic" => self.topic.clone())
                    .increment(1);
                warn!(
                    topic = %message.topic,
                    partition = message.partition,
                    offset = message.offset,
                    error = %e,
                    "Skipping malformed event"
                );
                None
            }
        }
    }

    /// Appends the analytics row, retrying in place; a write that never
    /// succeeds is logged and dropped so the partition keeps moving.
    async fn write(&self, event: &DomainEvent, message: &BrokerMessage) {
        let row = NewAnalyticsRow::from(event);
        let strategy = FixedInterval::new(self.settings.write_retry_interval)
            .take(self.settings.write_retries);

        let result = Retry::spawn(strategy, || {
            let sink = self.sink.clone();
            let row = row.clone();
            async move { sink.insert(row).await }
        })
        .await;

        match result {
            Ok(()) => {
                metrics::counter!("analytics_events_ingested_total", "event_type" => self.kind.as_str())
                    .increment(1);
                debug!(
                    event_type = %self.kind,
                    short_code = event.short_code(),
                    offset = message.offset,
                    "Analytics row written"
                );
            }
            Err(e) => {
                metrics::counter!("analytics_write_failed_total", "event_type" => self.kind.as_str())
                    .increment(1);
                error!(
                    event_type = %self.kind,
                    short_code = event.short_code(),
                    offset = message.offset,
                    attempts = self.settings.write_retries + 1,
                    error = %e,
                    "Failed to write analytics row, committing anyway"
                );
            }
        }
    }

    /// Polls until `shutdown` turns `true` or its sender is dropped.
    ///
    /// A turn interrupted by shutdown leaves its message uncommitted, so it
    /// is redelivered on the next start.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(topic = %self.topic, group = %self.group, event_type = %self.kind, "Analytics consumer started");

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                step = self.poll_once() => {
                    debug!(topic = %self.topic, ?step, "Consumer step");
                }
            }
        }

        info!(topic = %self.topic, group = %self.group, "Analytics consumer stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::{UrlClicked, UrlCreated};
    use crate::domain::repositories::MockAnalyticsRepository;
    use crate::error::AppError;
    use crate::infrastructure::messaging::{BrokerError, EventPublisher, MemoryBroker};
    use crate::infrastructure::persistence::MemoryAnalyticsRepository;
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::json;

    const TOPIC: &str = "url-click-events";
    const GROUP: &str = "analytics-click-group";

    fn fast_settings() -> ConsumerSettings {
        ConsumerSettings {
            backoff: Duration::from_millis(10),
            fetch_timeout: Duration::from_millis(50),
            write_retries: 2,
            write_retry_interval: Duration::from_millis(1),
        }
    }

    fn clicked(code: &str) -> DomainEvent {
        DomainEvent::UrlClicked(UrlClicked {
            short_code: code.to_string(),
            clicked_at: Utc::now(),
            user_agent: Some("curl/8.0".to_string()),
            referer: None,
            ip_address: None,
        })
    }

    fn consumer(
        broker: &MemoryBroker,
        sink: Arc<dyn AnalyticsRepository>,
    ) -> AnalyticsConsumer {
        AnalyticsConsumer::new(
            EventKind::UrlClicked,
            TOPIC,
            GROUP,
            Box::new(broker.subscribe(TOPIC, GROUP)),
            sink,
            fast_settings(),
        )
    }

    /// Fails the first `failures` fetches, then delegates.
    struct FlakySource<S> {
        inner: S,
        failures: usize,
    }

    #[async_trait]
    impl<S: EventSource> EventSource for FlakySource<S> {
        async fn fetch(&mut self) -> Result<BrokerMessage, BrokerError> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err(BrokerError::FetchFailed("connection reset".to_string()));
            }
            self.inner.fetch().await
        }

        async fn commit(&mut self, message: &BrokerMessage) -> Result<(), BrokerError> {
            self.inner.commit(message).await
        }
    }

    #[tokio::test]
    async fn test_processes_and_commits_in_order() {
        let broker = MemoryBroker::new();
        broker.publish(TOPIC, &clicked("a")).await.unwrap();
        broker.publish(TOPIC, &clicked("b")).await.unwrap();

        let sink = Arc::new(MemoryAnalyticsRepository::new());
        let mut consumer = consumer(&broker, sink.clone());

        assert_eq!(consumer.poll_once().await, ConsumerStep::Processed);
        assert_eq!(broker.committed_offset(TOPIC, GROUP), Some(1));
        assert_eq!(consumer.poll_once().await, ConsumerStep::Processed);
        assert_eq!(broker.committed_offset(TOPIC, GROUP), Some(2));

        let rows = sink.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].short_code, "a");
        assert_eq!(rows[1].short_code, "b");
        assert_eq!(rows[0].event_type, EventKind::UrlClicked);
        assert_eq!(rows[0].user_agent.as_deref(), Some("curl/8.0"));
    }

    #[tokio::test]
    async fn test_idle_when_nothing_arrives() {
        let broker = MemoryBroker::new();
        let mut consumer = consumer(&broker, Arc::new(MemoryAnalyticsRepository::new()));

        assert_eq!(consumer.poll_once().await, ConsumerStep::Idle);
        assert_eq!(broker.committed_offset(TOPIC, GROUP), None);
    }

    #[tokio::test]
    async fn test_malformed_message_is_skipped_and_committed() {
        let broker = MemoryBroker::new();
        broker.append(TOPIC, None, Some(b"{not json".to_vec()));
        broker.append(TOPIC, None, None);
        broker.publish(TOPIC, &clicked("ok")).await.unwrap();

        let sink = Arc::new(MemoryAnalyticsRepository::new());
        let mut consumer = consumer(&broker, sink.clone());

        assert_eq!(consumer.poll_once().await, ConsumerStep::Skipped);
        assert_eq!(consumer.poll_once().await, ConsumerStep::Skipped);
        assert_eq!(consumer.poll_once().await, ConsumerStep::Processed);

        assert_eq!(broker.committed_offset(TOPIC, GROUP), Some(3));
        assert_eq!(sink.rows().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_error_backs_off_then_recovers() {
        let broker = MemoryBroker::new();
        broker.publish(TOPIC, &clicked("a")).await.unwrap();

        let sink = Arc::new(MemoryAnalyticsRepository::new());
        let mut consumer = AnalyticsConsumer::new(
            EventKind::UrlClicked,
            TOPIC,
            GROUP,
            Box::new(FlakySource {
                inner: broker.subscribe(TOPIC, GROUP),
                failures: 2,
            }),
            sink.clone(),
            fast_settings(),
        );

        let started = tokio::time::Instant::now();
        assert_eq!(consumer.poll_once().await, ConsumerStep::FetchFailed);
        assert_eq!(consumer.poll_once().await, ConsumerStep::FetchFailed);
        assert!(started.elapsed() >= Duration::from_millis(20));

        assert_eq!(consumer.poll_once().await, ConsumerStep::Processed);
        assert_eq!(sink.rows().len(), 1);
    }

    #[tokio::test]
    async fn test_write_failure_retries_then_commits() {
        let broker = MemoryBroker::new();
        broker.publish(TOPIC, &clicked("a")).await.unwrap();

        let mut sink = MockAnalyticsRepository::new();
        sink.expect_insert()
            .times(3)
            .returning(|_| Err(AppError::internal("Database error", json!({}))));

        let mut consumer = consumer(&broker, Arc::new(sink));

        assert_eq!(consumer.poll_once().await, ConsumerStep::Processed);
        assert_eq!(broker.committed_offset(TOPIC, GROUP), Some(1));
    }

    #[tokio::test]
    async fn test_write_recovers_within_retries() {
        let broker = MemoryBroker::new();
        broker.publish(TOPIC, &clicked("a")).await.unwrap();

        let mut sink = MockAnalyticsRepository::new();
        let mut seq = mockall::Sequence::new();
        sink.expect_insert()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(AppError::internal("Database error", json!({}))));
        sink.expect_insert()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|row| row.short_code == "a")
            .returning(|_| Ok(()));

        let mut consumer = consumer(&broker, Arc::new(sink));

        assert_eq!(consumer.poll_once().await, ConsumerStep::Processed);
    }

    #[tokio::test]
    async fn test_created_consumer_decodes_created_events() {
        let broker = MemoryBroker::new();
        let event = DomainEvent::UrlCreated(UrlCreated {
            short_code: "abc123".to_string(),
            long_url: "https://example.com".to_string(),
            user_id: Some("u1".to_string()),
            created_at: Utc::now(),
        });
        broker.publish("url-created-events", &event).await.unwrap();

        let sink = Arc::new(MemoryAnalyticsRepository::new());
        let mut consumer = AnalyticsConsumer::new(
            EventKind::UrlCreated,
            "url-created-events",
            "analytics-created-group",
            Box::new(broker.subscribe("url-created-events", "analytics-created-group")),
            sink.clone(),
            fast_settings(),
        );

        assert_eq!(consumer.poll_once().await, ConsumerStep::Processed);
        let rows = sink.rows();
        assert_eq!(rows[0].event_type, EventKind::UrlCreated);
        assert_eq!(rows[0].long_url.as_deref(), Some("https://example.com"));
        assert_eq!(rows[0].user_id.as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let broker = MemoryBroker::new();
        let sink = Arc::new(MemoryAnalyticsRepository::new());
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(consumer(&broker, sink.clone()).run(rx));

        broker.publish(TOPIC, &clicked("a")).await.unwrap();
        for _ in 0..100 {
            if !sink.rows().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("consumer should stop")
            .unwrap();

        assert_eq!(sink.rows().len(), 1);
    }
}
