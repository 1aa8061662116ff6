//! DTO for the JSON resolve endpoint.

use serde::Serialize;

use crate::application::services::Resolved;
use crate::utils::time::format_rfc3339;

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub long_url: String,

    /// RFC 3339, present only for expiring codes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

impl From<Resolved> for ResolveResponse {
    fn from(resolved: Resolved) -> Self {
        Self {
            long_url: resolved.long_url,
            expires_at: resolved.expires_at.map(format_rfc3339),
        }
    }
}
