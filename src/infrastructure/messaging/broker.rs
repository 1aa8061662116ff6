//! Broker abstractions: publishing events and reading them back with
//! consumer-group offsets.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::events::DomainEvent;

/// Errors raised by broker adapters.
///
/// These never reach end users: the emitter and the consumer loop log them
/// and carry on.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker connection failed: {0}")]
    ConnectionFailed(String),

    #[error("publish to '{topic}' failed: {reason}")]
    PublishFailed { topic: String, reason: String },

    #[error("fetch failed: {0}")]
    FetchFailed(String),

    #[error("offset commit failed: {0}")]
    CommitFailed(String),

    #[error("event serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A message read from a topic partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    /// `None` for tombstones or empty records.
    pub payload: Option<Vec<u8>>,
}

/// Publishes domain events onto named topics.
///
/// Implementations key messages by short code so all events of one code
/// land on the same partition.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes one event and waits for the broker acknowledgement.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::PublishFailed`] if the broker rejects or cannot
    /// be reached, [`BrokerError::Serialization`] if encoding fails.
    async fn publish(&self, topic: &str, event: &DomainEvent) -> Result<(), BrokerError>;

    /// Liveness probe for the health endpoint.
    async fn health_check(&self) -> bool {
        true
    }
}

/// A resumable reader over one topic under one consumer group.
///
/// Offsets are committed explicitly. Re-subscribing with the same group
/// resumes from the last committed offset, so anything fetched but not
/// committed is delivered again.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Waits for the next message.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::FetchFailed`] on transport errors.
    async fn fetch(&mut self) -> Result<BrokerMessage, BrokerError>;

    /// Marks `message` (and everything before it on its partition) as consumed.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::CommitFailed`] if the broker rejects the commit.
    async fn commit(&mut self, message: &BrokerMessage) -> Result<(), BrokerError>;
}
