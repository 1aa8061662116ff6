//! Destination URL validation.
//!
//! Destinations are stored verbatim; validation only rejects values that can
//! never be a safe redirect target.

use url::Url;

use crate::error::AppError;
use serde_json::json;

/// Longest accepted destination URL.
pub const MAX_URL_LENGTH: usize = 2048;

/// Errors that can occur during URL validation.
#[derive(Debug, thiserror::Error)]
pub enum UrlValidationError {
    #[error("Invalid URL format: {0}")]
    InvalidFormat(String),

    #[error("Only HTTP and HTTPS protocols are allowed")]
    UnsupportedProtocol,

    #[error("URL has no host")]
    MissingHost,

    #[error("URL is longer than {MAX_URL_LENGTH} characters")]
    TooLong,
}

/// Checks that `raw` is an absolute `http`/`https` URL with a host.
///
/// Rejects `javascript:`, `data:`, `file:` and similar schemes.
///
/// # Errors
///
/// Returns the first rule `raw` violates.
pub fn check_url(raw: &str) -> Result<(), UrlValidationError> {
    if raw.len() > MAX_URL_LENGTH {
        return Err(UrlValidationError::TooLong);
    }

    let url = Url::parse(raw).map_err(|e| UrlValidationError::InvalidFormat(e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(UrlValidationError::UnsupportedProtocol);
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(UrlValidationError::MissingHost);
    }

    Ok(())
}

/// [`check_url`] mapped onto the request-path error type.
///
/// # Errors
///
/// Returns [`AppError::InvalidArgument`] carrying the violated rule.
pub fn validate_long_url(raw: &str) -> Result<(), AppError> {
    check_url(raw).map_err(|e| {
        AppError::invalid_argument("Invalid URL", json!({ "reason": e.to_string() }))
    })
}
