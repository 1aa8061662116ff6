//! Application layer services implementing business logic.
//!
//! Services orchestrate domain operations by coordinating repository calls,
//! validation, caching and event emission. They consume repository traits and
//! provide a clean API for HTTP handlers and background consumers.
//!
//! # Available Services
//!
//! - [`services::ShortenerService`] - Short URL creation and destination updates
//! - [`services::RedirectService`] - Resolution with click accounting
//! - [`services::CodeAllocator`] - Unique short code allocation
//! - [`services::analytics_consumer::AnalyticsConsumer`] - Event stream ingestion

pub mod services;
