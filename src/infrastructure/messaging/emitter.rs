//! Fire-and-forget event emission.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::broker::EventPublisher;
use crate::domain::events::{DomainEvent, EventKind};

/// Topic names per event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub created: String,
    pub clicked: String,
}

impl Topics {
    pub fn for_kind(&self, kind: EventKind) -> &str {
        match kind {
            EventKind::UrlCreated => &self.created,
            EventKind::UrlClicked => &self.clicked,
        }
    }
}

impl Default for Topics {
    fn default() -> Self {
        Self {
            created: "url-created-events".to_string(),
            clicked: "url-click-events".to_string(),
        }
    }
}

/// Routes domain events to their topic on a detached task.
///
/// The request path never awaits the publish outcome: failures and timeouts
/// are logged and counted, and the record that triggered the event stays
/// committed either way.
#[derive(Clone)]
pub struct EventEmitter {
    publisher: Arc<dyn EventPublisher>,
    topics: Topics,
    timeout: Duration,
}

impl EventEmitter {
    pub fn new(publisher: Arc<dyn EventPublisher>, topics: Topics, timeout: Duration) -> Self {
        Self {
            publisher,
            topics,
            timeout,
        }
    }

    /// Publishes `event` in the background.
    ///
    /// The returned handle is only useful to tests; production callers drop it.
    pub fn emit(&self, event: DomainEvent) -> JoinHandle<()> {
        let publisher = self.publisher.clone();
        let topic = self.topics.for_kind(event.kind()).to_string();
        let timeout = self.timeout;

        tokio::spawn(async move {
            let kind = event.kind();
            let short_code = event.short_code().to_string();

            match tokio::time::timeout(timeout, publisher.publish(&topic, &event)).await {
                Ok(Ok(())) => {
                    debug!(topic, event_type = %kind, short_code, "Event published");
                }
                Ok(Err(e)) => {
                    metrics::counter!("events_publish_failed_total").increment(1);
                    warn!(topic, event_type = %kind, short_code, error = %e, "Failed to publish event");
                }
                Err(_) => {
                    metrics::counter!("events_publish_failed_total").increment(1);
                    warn!(
                        topic,
                        event_type = %kind,
                        short_code,
                        timeout_ms = timeout.as_millis() as u64,
                        "Event publish timed out"
                    );
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::UrlClicked;
    use crate::infrastructure::messaging::broker::{BrokerError, MockEventPublisher};
    use chrono::Utc;

    fn clicked() -> DomainEvent {
        DomainEvent::UrlClicked(UrlClicked {
            short_code: "abc123".to_string(),
            clicked_at: Utc::now(),
            user_agent: None,
            referer: None,
            ip_address: None,
        })
    }

    #[tokio::test]
    async fn test_emit_routes_to_topic_for_kind() {
        let mut publisher = MockEventPublisher::new();
        publisher
            .expect_publish()
            .withf(|topic, event| topic == "url-click-events" && event.short_code() == "abc123")
            .times(1)
            .returning(|_, _| Ok(()));

        let emitter = EventEmitter::new(
            Arc::new(publisher),
            Topics::default(),
            Duration::from_secs(1),
        );

        emitter.emit(clicked()).await.unwrap();
    }

    #[tokio::test]
    async fn test_emit_swallows_publish_failure() {
        let mut publisher = MockEventPublisher::new();
        publisher.expect_publish().times(1).returning(|topic, _| {
            Err(BrokerError::PublishFailed {
                topic: topic.to_string(),
                reason: "broker down".to_string(),
            })
        });

        let emitter = EventEmitter::new(
            Arc::new(publisher),
            Topics::default(),
            Duration::from_secs(1),
        );

        assert!(emitter.emit(clicked()).await.is_ok());
    }
}
