//! Repository implementations.
//!
//! PostgreSQL repositories use runtime-checked SQLx queries. The in-memory
//! variants share the same contracts and are used by tests and by
//! `STORE_BACKEND=memory` local runs.
//!
//! # Repositories
//!
//! - [`PgUrlRepository`] / [`MemoryUrlRepository`] - the URL Store
//! - [`PgAnalyticsRepository`] / [`MemoryAnalyticsRepository`] - the analytics sink

pub mod memory_analytics_repository;
pub mod memory_url_repository;
pub mod pg_analytics_repository;
pub mod pg_url_repository;

pub use memory_analytics_repository::MemoryAnalyticsRepository;
pub use memory_url_repository::MemoryUrlRepository;
pub use pg_analytics_repository::PgAnalyticsRepository;
pub use pg_url_repository::PgUrlRepository;
