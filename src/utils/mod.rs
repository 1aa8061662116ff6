//! Utility functions shared across layers.
//!
//! - [`code_generator`] - Short code generation and alias validation
//! - [`url_validator`] - Destination URL validation
//! - [`time`] - RFC 3339 parsing and formatting
//! - [`client_info`] - Click metadata extraction from HTTP headers

pub mod client_info;
pub mod code_generator;
pub mod time;
pub mod url_validator;
