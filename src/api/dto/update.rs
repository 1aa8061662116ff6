//! DTOs for the destination update endpoint.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::application::services::UpdateOutcome;

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRequest {
    #[validate(url(message = "Invalid URL format"))]
    pub new_long_url: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub short_code: String,
    pub message: String,
}

impl From<UpdateOutcome> for UpdateResponse {
    fn from(outcome: UpdateOutcome) -> Self {
        Self {
            short_code: outcome.short_code,
            message: outcome.message,
        }
    }
}
