//! Identity provider implementations.

pub mod hmac_provider;

pub use hmac_provider::HmacIdentityProvider;
