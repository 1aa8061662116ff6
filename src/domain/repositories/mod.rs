//! Repository trait definitions for the domain layer.
//!
//! - Traits define the contract for data operations
//! - Implementations live in `crate::infrastructure::persistence`
//! - Mock implementations are auto-generated via `mockall` for testing
//!
//! # Available Repositories
//!
//! - [`UrlRepository`] - Short URL records (the URL Store)
//! - [`AnalyticsRepository`] - Append-only analytics sink

pub mod analytics_repository;
pub mod url_repository;

pub use analytics_repository::AnalyticsRepository;
pub use url_repository::UrlRepository;

#[cfg(test)]
pub use analytics_repository::MockAnalyticsRepository;
#[cfg(test)]
pub use url_repository::MockUrlRepository;
