//! Domain layer containing business entities, events, and repository contracts.
//!
//! - [`entities`] - Core data structures
//! - [`events`] - `URLCreated` / `URLClicked` domain events and their wire format
//! - [`identity`] - Bearer token validation seam
//! - [`repositories`] - Data access trait definitions
//!
//! The domain layer has no dependencies on infrastructure or presentation layers.
//!
//! # Event Flow
//!
//! 1. A service persists a record, then hands a [`events::DomainEvent`] to the emitter
//! 2. The emitter publishes it on a background task (the caller never waits)
//! 3. An analytics consumer reads the topic, appends a row, commits the offset

pub mod entities;
pub mod events;
pub mod identity;
pub mod repositories;
