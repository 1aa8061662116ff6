//! DTOs for the shortening endpoint.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::application::services::ShortenCommand;

/// Request to shorten one URL.
#[derive(Debug, Deserialize, Validate)]
pub struct ShortenRequest {
    /// The destination URL (must be valid HTTP/HTTPS).
    #[validate(url(message = "Invalid URL format"))]
    pub long_url: String,

    /// Optional caller-chosen short code.
    #[validate(length(min = 1, max = 64))]
    pub custom_alias: Option<String>,

    /// Optional RFC 3339 expiry. After this instant the code stops resolving.
    pub expires_at: Option<String>,

    /// Optional owner; must match the bearer subject when present.
    pub owner: Option<String>,
}

impl ShortenRequest {
    pub fn into_command(self, owner: Option<String>) -> ShortenCommand {
        ShortenCommand {
            long_url: self.long_url,
            owner,
            custom_alias: self.custom_alias,
            expires_at: self.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ShortenResponse {
    pub short_code: String,
}
