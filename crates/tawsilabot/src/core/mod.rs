//! Core utilities: configuration, errors, logging, auth, validation and
//! commission arithmetic.

pub mod auth;
pub mod commission;
pub mod config;
pub mod error;
pub mod logging;
pub mod validation;

// Re-exports for convenience
pub use error::{AppError, AppResult};
pub use logging::init_logger;
