//! Handler for the shortening endpoint.

use axum::{Extension, Json, extract::State, http::StatusCode};
use serde_json::json;
use validator::Validate;

use crate::api::dto::shorten::{ShortenRequest, ShortenResponse};
use crate::api::middleware::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::state::AppState;

/// Creates a short URL.
///
/// # Endpoint
///
/// `POST /api/shorten`
///
/// Authentication is optional. With a bearer token the record is owned by
/// the token subject and can later be updated by it; anonymous records can
/// never be updated.
///
/// # Request Body
///
/// ```json
/// {
///   "long_url": "https://example.com",
///   "custom_alias": "abc123",
///   "expires_at": "2030-01-01T00:00:00Z"
/// }
/// ```
///
/// # Response
///
/// `201 Created`
///
/// ```json
/// { "short_code": "abc123" }
/// ```
///
/// # Errors
///
/// - 400 for an invalid URL, alias or expiry
/// - 403 if `owner` is given and differs from the token subject
/// - 409 if the alias is taken
/// - 503 if no free code could be allocated
pub async fn shorten_handler(
    State(state): State<AppState>,
    user: Option<Extension<AuthenticatedUser>>,
    Json(payload): Json<ShortenRequest>,
) -> Result<(StatusCode, Json<ShortenResponse>), AppError> {
    payload.validate()?;

    let subject = user.map(|Extension(AuthenticatedUser(subject))| subject);

    if let Some(requested) = payload.owner.as_deref().filter(|o| !o.is_empty())
        && subject.as_deref() != Some(requested)
    {
        return Err(AppError::permission_denied(
            "Owner must match the authenticated user",
            json!({ "owner": requested }),
        ));
    }

    let record = state
        .shortener
        .shorten(payload.into_command(subject))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ShortenResponse {
            short_code: record.short_code,
        }),
    ))
}
