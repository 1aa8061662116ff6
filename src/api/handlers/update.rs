//! Handler for destination updates.

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use validator::Validate;

use crate::api::dto::update::{UpdateRequest, UpdateResponse};
use crate::api::middleware::auth::AuthenticatedUser;
use crate::application::services::UpdateCommand;
use crate::error::AppError;
use crate::state::AppState;

/// Repoints a short code owned by the caller.
///
/// # Endpoint
///
/// `PATCH /api/urls/{code}` (Bearer token required)
///
/// # Request Body
///
/// ```json
/// { "new_long_url": "https://new.example.com" }
/// ```
///
/// # Response
///
/// ```json
/// { "short_code": "abc123", "message": "URL destination updated successfully" }
/// ```
///
/// # Errors
///
/// - 400 for an invalid URL
/// - 401 without a valid token
/// - 403 if the caller does not own the code
/// - 404 if the code does not exist
pub async fn update_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
    Extension(AuthenticatedUser(owner)): Extension<AuthenticatedUser>,
    Json(payload): Json<UpdateRequest>,
) -> Result<Json<UpdateResponse>, AppError> {
    payload.validate()?;

    let outcome = state
        .shortener
        .update(UpdateCommand {
            short_code: code,
            new_long_url: payload.new_long_url,
            owner,
        })
        .await?;

    Ok(Json(outcome.into()))
}
