//! Infrastructure layer for external integrations.
//!
//! Implements the interfaces defined by the domain layer.
//!
//! # Modules
//!
//! - [`cache`] - Read-through cache (Redis and no-op implementations)
//! - [`identity`] - HMAC-signed bearer token provider
//! - [`messaging`] - Event broker adapters and the fire-and-forget emitter
//! - [`persistence`] - PostgreSQL and in-memory repository implementations

pub mod cache;
pub mod identity;
pub mod messaging;
pub mod persistence;
