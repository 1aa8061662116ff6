//! Short code allocation.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::debug;

use super::bounded;
use crate::domain::repositories::UrlRepository;
use crate::error::AppError;
use crate::utils::code_generator::{generate_code, validate_custom_alias};

/// Produces short codes that are unused at the time of the check.
///
/// The existence check is advisory: two callers can both see a code as free.
/// The store's conditional insert is the authoritative uniqueness check, and
/// [`crate::application::services::ShortenerService`] handles a lost race.
pub struct CodeAllocator<R: UrlRepository + ?Sized> {
    repository: Arc<R>,
    max_attempts: usize,
    store_timeout: Duration,
}

impl<R: UrlRepository + ?Sized> CodeAllocator<R> {
    pub fn new(repository: Arc<R>, max_attempts: usize, store_timeout: Duration) -> Self {
        Self {
            repository,
            max_attempts,
            store_timeout,
        }
    }

    /// Attempt budget for one allocation.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Returns the alias verbatim if it is free, otherwise a fresh random code.
    ///
    /// Random generation spends at most `max_attempts` existence checks.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidArgument`] if the alias breaks the alias rules
    /// - [`AppError::AlreadyExists`] if the alias is taken
    /// - [`AppError::AllocationExhausted`] if every generated code collided
    /// - [`AppError::Internal`] on store failure or timeout
    pub async fn allocate(&self, custom_alias: Option<&str>) -> Result<String, AppError> {
        match custom_alias {
            Some(alias) => self.claim_alias(alias).await,
            None => self
                .generate_within(self.max_attempts)
                .await
                .map(|(code, _)| code),
        }
    }

    /// Validates an alias and checks that nobody holds it.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidArgument`] if the alias breaks the alias rules
    /// - [`AppError::AlreadyExists`] if the alias is taken
    /// - [`AppError::Internal`] on store failure or timeout
    async fn claim_alias(&self, alias: &str) -> Result<String, AppError> {
        validate_custom_alias(alias)?;

        if bounded(self.store_timeout, self.repository.exists(alias)).await? {
            return Err(AppError::already_exists(
                "Custom alias already exists",
                json!({ "alias": alias }),
            ));
        }

        Ok(alias.to_string())
    }

    /// Generates random codes until one is unused, spending at most `budget`
    /// attempts.
    ///
    /// Returns the code together with the number of attempts it took.
    ///
    /// # Errors
    ///
    /// [`AppError::AllocationExhausted`] once the budget is spent, or
    /// [`AppError::Internal`] on store failure or timeout.
    async fn generate_within(&self, budget: usize) -> Result<(String, usize), AppError> {
        for attempt in 1..=budget {
            let code = generate_code()?;

            if !bounded(self.store_timeout, self.repository.exists(&code)).await? {
                return Ok((code, attempt));
            }

            metrics::counter!("short_code_collisions_total").increment(1);
            debug!(attempt, "Generated short code already in use");
        }

        Err(AppError::allocation_exhausted(
            "Failed to allocate a unique short code",
            json!({ "attempts": budget }),
        ))
    }
}
