//! Core domain entities.
//!
//! Entities follow the "New Type" pattern with separate structs for creation:
//! - [`ShortUrlRecord`] / [`NewShortUrl`] - short code → destination mapping
//! - [`AnalyticsRow`] / [`NewAnalyticsRow`] - append-only analytics facts

pub mod analytics;
pub mod short_url;

pub use analytics::{AnalyticsRow, NewAnalyticsRow};
pub use short_url::{NewShortUrl, ShortUrlRecord};
