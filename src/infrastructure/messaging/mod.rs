//! Event broker integration.
//!
//! - [`broker`] - publisher/source traits, messages, errors
//! - [`emitter`] - fire-and-forget emission used by the request path
//! - [`memory_broker`] - in-process broker with consumer-group offsets
//! - `kafka` - `rdkafka` adapter (feature `kafka`)

pub mod broker;
pub mod emitter;
#[cfg(feature = "kafka")]
pub mod kafka;
pub mod memory_broker;

pub use broker::{BrokerError, BrokerMessage, EventPublisher, EventSource};
pub use emitter::{EventEmitter, Topics};
#[cfg(feature = "kafka")]
pub use kafka::{KafkaEventSource, KafkaPublisher};
pub use memory_broker::{MemoryBroker, MemorySubscription};

#[cfg(test)]
pub use broker::MockEventPublisher;
