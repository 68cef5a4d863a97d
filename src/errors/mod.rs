//! Centralized error handling for gluestick
//!
//! Every fallible operation in the library returns [`AppResult`]. The web
//! layer maps each [`AppError`] variant to an HTTP status in
//! [`crate::web::responses::handle_error`].
//!
//! # Usage
//!
//! ```rust
//! use gluestick::errors::{AppError, AppResult};
//!
//! fn example_function(name: &str) -> AppResult<String> {
//!     if name.is_empty() {
//!         return Err(AppError::validation("name must not be empty"));
//!     }
//!     Ok(name.to_string())
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;
