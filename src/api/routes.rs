//! API route configuration.

use crate::api::handlers::{resolve_handler, shorten_handler, update_handler};
use crate::api::middleware::auth;
use crate::state::AppState;
use axum::{
    Router,
    handler::Handler,
    middleware,
    routing::{get, post},
};

/// Routes nested under `/api`.
///
/// # Endpoints
///
/// - `POST  /shorten`      - Create a short URL (optional Bearer token)
/// - `GET   /urls/{code}`  - Resolve a code to JSON (public)
/// - `PATCH /urls/{code}`  - Repoint a code (Bearer token required, owner only)
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/shorten",
            post(shorten_handler.layer(middleware::from_fn_with_state(
                state.clone(),
                auth::optional,
            ))),
        )
        .route(
            "/urls/{code}",
            get(resolve_handler).patch(update_handler.layer(middleware::from_fn_with_state(
                state,
                auth::require,
            ))),
        )
}
