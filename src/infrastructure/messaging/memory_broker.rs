//! In-process broker with Kafka-like offset semantics.
//!
//! Each topic is a single-partition append-only log. Consumer groups keep a
//! committed offset per topic; a fresh subscription starts at the committed
//! offset (or the oldest retained record), which reproduces at-least-once
//! redelivery after a crash.
//!
//! Records are retained until every group that ever subscribed to the topic
//! has committed past them. A topic nobody subscribed to keeps everything.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

use super::broker::{BrokerError, BrokerMessage, EventPublisher, EventSource};
use crate::domain::events::DomainEvent;

#[derive(Default)]
struct TopicLog {
    /// Offset of `entries[0]`.
    base_offset: i64,
    entries: VecDeque<BrokerMessage>,
    /// Committed offset per group; `None` until the group's first commit.
    groups: HashMap<String, Option<i64>>,
}

impl TopicLog {
    fn end_offset(&self) -> i64 {
        self.base_offset + self.entries.len() as i64
    }

    fn get(&self, offset: i64) -> Option<&BrokerMessage> {
        let index = usize::try_from(offset - self.base_offset).ok()?;
        self.entries.get(index)
    }

    /// Drops records every known group has committed past.
    fn compact(&mut self) {
        let Some(low) = self
            .groups
            .values()
            .map(|committed| committed.unwrap_or(self.base_offset))
            .min()
        else {
            return;
        };

        while self.base_offset < low && self.entries.pop_front().is_some() {
            self.base_offset += 1;
        }
    }
}

#[derive(Default)]
struct BrokerState {
    topics: HashMap<String, TopicLog>,
}

struct Inner {
    state: Mutex<BrokerState>,
    appended: watch::Sender<u64>,
}

/// Cloneable handle to a shared in-process broker.
#[derive(Clone)]
pub struct MemoryBroker {
    inner: Arc<Inner>,
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBroker {
    pub fn new() -> Self {
        let (appended, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(BrokerState::default()),
                appended,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a raw record and returns its offset.
    pub fn append(&self, topic: &str, key: Option<Vec<u8>>, payload: Option<Vec<u8>>) -> i64 {
        let offset = {
            let mut state = self.lock();
            let log = state.topics.entry(topic.to_string()).or_default();
            let offset = log.end_offset();
            log.entries.push_back(BrokerMessage {
                topic: topic.to_string(),
                partition: 0,
                offset,
                key,
                payload,
            });
            offset
        };

        self.inner.appended.send_modify(|n| *n += 1);
        offset
    }

    /// Opens a reader for `topic` positioned at `group`'s committed offset.
    ///
    /// The group is registered on the topic, so records it has not
    /// committed are retained even before its first commit.
    pub fn subscribe(&self, topic: &str, group: &str) -> MemorySubscription {
        let position = {
            let mut state = self.lock();
            let log = state.topics.entry(topic.to_string()).or_default();
            let committed = *log.groups.entry(group.to_string()).or_insert(None);
            committed.unwrap_or(log.base_offset).max(log.base_offset)
        };

        MemorySubscription {
            broker: self.clone(),
            appended: self.inner.appended.subscribe(),
            topic: topic.to_string(),
            group: group.to_string(),
            position,
        }
    }

    /// Next offset `group` will read from `topic`, if it ever committed.
    pub fn committed_offset(&self, topic: &str, group: &str) -> Option<i64> {
        self.lock()
            .topics
            .get(topic)
            .and_then(|log| log.groups.get(group).copied().flatten())
    }

    /// Number of records currently retained for `topic`.
    pub fn topic_len(&self, topic: &str) -> usize {
        self.lock().topics.get(topic).map_or(0, |log| log.entries.len())
    }

    /// Offset the next record appended to `topic` will get.
    pub fn end_offset(&self, topic: &str) -> i64 {
        self.lock().topics.get(topic).map_or(0, TopicLog::end_offset)
    }

    /// Snapshot of the retained part of a topic's log.
    pub fn messages(&self, topic: &str) -> Vec<BrokerMessage> {
        self.lock()
            .topics
            .get(topic)
            .map(|log| log.entries.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl EventPublisher for MemoryBroker {
    async fn publish(&self, topic: &str, event: &DomainEvent) -> Result<(), BrokerError> {
        let payload = event.encode()?;
        self.append(
            topic,
            Some(event.short_code().as_bytes().to_vec()),
            Some(payload),
        );
        Ok(())
    }
}

/// Reader over one topic of a [`MemoryBroker`] under one consumer group.
pub struct MemorySubscription {
    broker: MemoryBroker,
    appended: watch::Receiver<u64>,
    topic: String,
    group: String,
    position: i64,
}

impl MemorySubscription {
    fn next_message(&mut self) -> Option<BrokerMessage> {
        let state = self.broker.lock();
        let log = state.topics.get(&self.topic)?;
        // Another reader in the group may have committed and compacted past us.
        self.position = self.position.max(log.base_offset);
        log.get(self.position).cloned()
    }
}

#[async_trait]
impl EventSource for MemorySubscription {
    async fn fetch(&mut self) -> Result<BrokerMessage, BrokerError> {
        loop {
            self.appended.borrow_and_update();

            if let Some(message) = self.next_message() {
                self.position = message.offset + 1;
                return Ok(message);
            }

            self.appended
                .changed()
                .await
                .map_err(|e| BrokerError::FetchFailed(e.to_string()))?;
        }
    }

    async fn commit(&mut self, message: &BrokerMessage) -> Result<(), BrokerError> {
        let mut state = self.broker.lock();
        let log = state.topics.entry(self.topic.clone()).or_default();
        let committed = log.groups.entry(self.group.clone()).or_insert(None);
        *committed = Some(committed.unwrap_or(0).max(message.offset + 1));
        log.compact();
        Ok(())
    }
}
