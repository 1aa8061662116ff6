//! Business logic services for the application layer.

pub mod analytics_consumer;
pub mod code_allocator;
pub mod redirect_service;
pub mod shortener_service;

pub use analytics_consumer::{AnalyticsConsumer, ConsumerSettings, ConsumerStep};
pub use code_allocator::CodeAllocator;
pub use redirect_service::{RedirectService, Resolved};
pub use shortener_service::{ShortenCommand, ShortenerService, UpdateCommand, UpdateOutcome};

use std::future::Future;
use std::time::Duration;

use crate::error::AppError;

/// Tunables shared by the request-path services.
#[derive(Debug, Clone, Copy)]
pub struct ServiceSettings {
    /// Upper bound for every store call on a request path.
    pub store_timeout: Duration,
    /// Generated-code attempts before giving up with `AllocationExhausted`.
    pub max_allocation_attempts: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_millis(1000),
            max_allocation_attempts: 10,
        }
    }
}

/// Runs a store call under `limit`; an elapsed timer becomes [`AppError::Internal`].
pub(crate) async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    tokio::time::timeout(limit, call).await?
}
