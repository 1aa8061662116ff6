//! Bearer token authentication middleware.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_auth::AuthBearer;
use serde_json::json;

use crate::{error::AppError, state::AppState};

/// Subject of a validated bearer token, inserted as a request extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

/// Requires a valid bearer token.
///
/// # Header Format
///
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// # Errors
///
/// Returns `401 Unauthorized` with `WWW-Authenticate: Bearer` if the header
/// is missing, malformed, or the identity provider rejects the token.
///
/// # Example
///
/// ```rust,ignore
/// let route = patch(update_handler.layer(middleware::from_fn_with_state(state, auth::require)));
/// ```
pub async fn require(
    State(st): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();

    let user = authenticate(&st, &mut parts).await?;
    parts.extensions.insert(user);

    Ok(next.run(Request::from_parts(parts, body)).await)
}

/// Authenticates the request only if it carries an `Authorization` header.
///
/// Anonymous requests pass through untouched; a present but invalid token is
/// still rejected with `401`.
pub async fn optional(
    State(st): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !req.headers().contains_key(header::AUTHORIZATION) {
        return Ok(next.run(req).await);
    }

    require(State(st), req, next).await
}

async fn authenticate(st: &AppState, parts: &mut Parts) -> Result<AuthenticatedUser, AppError> {
    let AuthBearer(token) = AuthBearer::from_request_parts(parts, &())
        .await
        .map_err(|_| {
            AppError::unauthorized(
                "Unauthorized",
                json!({"reason": "Authorization header is missing or invalid"}),
            )
        })?;

    st.identity
        .validate_token(&token)
        .await
        .into_subject()
        .map(AuthenticatedUser)
        .ok_or_else(|| AppError::unauthorized("Unauthorized", json!({"reason": "Invalid token"})))
}
