//! Handlers that resolve short codes.

use axum::{
    Extension, Json,
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;

use crate::api::dto::resolve::ResolveResponse;
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::client_info::click_metadata;

type PeerAddr = Option<Extension<ConnectInfo<SocketAddr>>>;

fn peer(addr: PeerAddr) -> Option<SocketAddr> {
    addr.map(|Extension(ConnectInfo(addr))| addr)
}

/// Redirects a short code to its destination.
///
/// # Endpoint
///
/// `GET /{code}`
///
/// Answers `302 Found` with a `Location` header. Every successful redirect
/// counts as a click: the counter is bumped and a `URLClicked` event is
/// emitted in the background.
///
/// # Errors
///
/// Returns 404 Not Found if the code is unknown or expired.
pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    addr: PeerAddr,
) -> Result<Response, AppError> {
    let click = click_metadata(&headers, peer(addr), state.behind_proxy);
    let resolved = state.redirect.resolve(&code, click).await?;

    Ok((
        StatusCode::FOUND,
        [(header::LOCATION, resolved.long_url)],
    )
        .into_response())
}

/// Resolves a short code without redirecting.
///
/// # Endpoint
///
/// `GET /api/urls/{code}`
///
/// # Response
///
/// ```json
/// { "long_url": "https://example.com", "expires_at": "2030-01-01T00:00:00Z" }
/// ```
///
/// The lookup counts as a click, same as the redirect.
///
/// # Errors
///
/// Returns 404 Not Found if the code is unknown or expired.
pub async fn resolve_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    addr: PeerAddr,
) -> Result<Json<ResolveResponse>, AppError> {
    let click = click_metadata(&headers, peer(addr), state.behind_proxy);
    let resolved = state.redirect.resolve(&code, click).await?;

    Ok(Json(resolved.into()))
}
