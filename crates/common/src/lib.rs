//! alinas Common Library
//!
//! Shared error type, composite resource identifiers and field enums for the
//! NAS resource handlers.

pub mod error;
pub mod types;

pub use error::{ApiError, Error, Result};
pub use types::*;

/// alinas version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// NAS management API version the handlers speak
pub const NAS_API_VERSION: &str = "2017-06-26";
