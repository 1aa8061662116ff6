//! Short code generation and custom alias validation.
//!
//! # Code space
//!
//! A generated code is 6 random bytes (48 bits) encoded as URL-safe base64
//! without padding. 48 bits map to exactly 8 base64 characters, so the
//! fixed 8-character length costs no entropy.
//!
//! With `n` codes already stored, a single attempt collides with probability
//! `n / 2^48`. At `n = 10^8` that is about `3.6e-7`, and the chance that
//! every one of 10 consecutive attempts collides is below `1e-64`. Over the
//! whole space, the birthday bound puts the first expected collision near
//! `n ≈ 2^24` (about 16.7 million codes), which is why uniqueness is always
//! checked against the store rather than assumed.

use crate::error::AppError;
use base64::Engine as _;
use regex::Regex;
use serde_json::json;
use std::sync::LazyLock;

/// Random bytes per generated code.
const CODE_LENGTH_BYTES: usize = 6;

/// Length of every generated code.
pub const CODE_LENGTH: usize = 8;

/// Longest accepted custom alias.
pub const MAX_ALIAS_LENGTH: usize = 64;

/// Route segments that cannot be used as short codes.
const RESERVED_CODES: &[&str] = &["api", "health", "metrics", "static", "admin"];

static ALIAS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("alias pattern is valid"));

/// Generates a cryptographically secure random short code.
///
/// # Errors
///
/// Returns [`AppError::Internal`] if the system random number generator fails.
pub fn generate_code() -> Result<String, AppError> {
    let mut buffer = [0u8; CODE_LENGTH_BYTES];

    getrandom::fill(&mut buffer).map_err(|e| {
        AppError::internal(
            "Random number generator unavailable",
            json!({ "reason": e.to_string() }),
        )
    })?;

    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buffer))
}

/// Validates a caller-supplied alias.
///
/// # Rules
///
/// - Length: 1-64 characters
/// - Allowed characters: ASCII letters, digits, `-`, `_`
/// - Cannot be a reserved route segment
///
/// # Errors
///
/// Returns [`AppError::InvalidArgument`] if any rule is violated.
pub fn validate_custom_alias(alias: &str) -> Result<(), AppError> {
    if alias.is_empty() || alias.len() > MAX_ALIAS_LENGTH {
        return Err(AppError::invalid_argument(
            "Custom alias must be 1-64 characters",
            json!({ "provided_length": alias.len() }),
        ));
    }

    if !ALIAS_REGEX.is_match(alias) {
        return Err(AppError::invalid_argument(
            "Custom alias can only contain letters, digits, hyphens, and underscores",
            json!({ "alias": alias }),
        ));
    }

    if RESERVED_CODES.contains(&alias.to_ascii_lowercase().as_str()) {
        return Err(AppError::invalid_argument(
            "This alias is reserved",
            json!({ "alias": alias }),
        ));
    }

    Ok(())
}
