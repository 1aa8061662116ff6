//! Kafka-compatible broker adapter (Kafka, Redpanda, MSK, ...).
//!
//! Compiled only with the `kafka` feature. Consumers run with
//! `enable.auto.commit=false`; offsets move only through
//! [`EventSource::commit`], which gives at-least-once delivery.

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use rdkafka::{Offset, TopicPartitionList};
use std::time::Duration;

use super::broker::{BrokerError, BrokerMessage, EventPublisher, EventSource};
use crate::domain::events::DomainEvent;

/// Publishes events with an `rdkafka` future producer.
pub struct KafkaPublisher {
    producer: FutureProducer,
    timeout: Duration,
}

impl KafkaPublisher {
    /// Creates a producer for the comma-separated `brokers` list.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::ConnectionFailed`] if the client cannot be configured.
    pub fn new(brokers: &str, timeout: Duration) -> Result<Self, BrokerError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", timeout.as_millis().to_string())
            .set("acks", "all")
            .create()
            .map_err(|e| {
                BrokerError::ConnectionFailed(format!("Failed to create producer: {e}"))
            })?;

        tracing::info!(brokers, "Kafka producer created");

        Ok(Self { producer, timeout })
    }
}

#[async_trait]
impl EventPublisher for KafkaPublisher {
    async fn publish(&self, topic: &str, event: &DomainEvent) -> Result<(), BrokerError> {
        let payload = event.encode()?;

        let record = FutureRecord::to(topic)
            .payload(&payload)
            .key(event.short_code());

        match self
            .producer
            .send(record, Timeout::After(self.timeout))
            .await
        {
            Ok((partition, offset)) => {
                tracing::debug!(
                    topic,
                    partition,
                    offset,
                    event_type = %event.kind(),
                    "Event published"
                );
                Ok(())
            }
            Err((kafka_error, _)) => Err(BrokerError::PublishFailed {
                topic: topic.to_string(),
                reason: kafka_error.to_string(),
            }),
        }
    }

    async fn health_check(&self) -> bool {
        let producer = self.producer.clone();
        tokio::task::spawn_blocking(move || {
            producer
                .client()
                .fetch_metadata(None, Duration::from_millis(500))
                .is_ok()
        })
        .await
        .unwrap_or(false)
    }
}

/// Reads one topic under one consumer group with manual offset commits.
pub struct KafkaEventSource {
    consumer: StreamConsumer,
}

impl KafkaEventSource {
    /// Creates a consumer and subscribes it to `topic`.
    ///
    /// New groups start from the earliest retained offset so no event
    /// published before the first deployment of a consumer is skipped.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::ConnectionFailed`] if the consumer cannot be
    /// created or subscribed.
    pub fn new(brokers: &str, topic: &str, group: &str) -> Result<Self, BrokerError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", group)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "6000")
            .set("enable.partition.eof", "false")
            .create()
            .map_err(|e| {
                BrokerError::ConnectionFailed(format!("Failed to create consumer: {e}"))
            })?;

        consumer.subscribe(&[topic]).map_err(|e| {
            BrokerError::ConnectionFailed(format!("Failed to subscribe to '{topic}': {e}"))
        })?;

        tracing::info!(brokers, topic, group, "Kafka consumer subscribed");

        Ok(Self { consumer })
    }
}

#[async_trait]
impl EventSource for KafkaEventSource {
    async fn fetch(&mut self) -> Result<BrokerMessage, BrokerError> {
        let message = self
            .consumer
            .recv()
            .await
            .map_err(|e| BrokerError::FetchFailed(e.to_string()))?;

        Ok(BrokerMessage {
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
            key: message.key().map(<[u8]>::to_vec),
            payload: message.payload().map(<[u8]>::to_vec),
        })
    }

    async fn commit(&mut self, message: &BrokerMessage) -> Result<(), BrokerError> {
        let mut positions = TopicPartitionList::new();
        positions
            .add_partition_offset(
                &message.topic,
                message.partition,
                Offset::Offset(message.offset + 1),
            )
            .map_err(|e| BrokerError::CommitFailed(e.to_string()))?;

        self.consumer
            .commit(&positions, CommitMode::Async)
            .map_err(|e| BrokerError::CommitFailed(e.to_string()))
    }
}
