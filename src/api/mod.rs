//! HTTP edge: authenticates callers and forwards to the application services.
//!
//! - [`dto`] - request/response bodies and their validation rules
//! - [`handlers`] - one async fn per endpoint
//! - [`middleware`] - bearer authentication and request spans
//! - [`routes`] - the `/api` router

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;
