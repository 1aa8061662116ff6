//! HTTP request handlers for API endpoints.
//!
//! Each handler module corresponds to a logical grouping of endpoints.

pub mod health;
pub mod redirect;
pub mod shorten;
pub mod update;

pub use health::health_handler;
pub use redirect::{redirect_handler, resolve_handler};
pub use shorten::shorten_handler;
pub use update::update_handler;
