use thiserror::Error;

/// Centralized error types for the application
///
/// All errors in the application are converted to this enum for consistent error handling.
/// Uses `thiserror` for automatic error conversion and display formatting.
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Database connection pool errors
    #[error("Database pool error: {0}")]
    DatabasePool(#[from] r2d2::Error),

    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// HTTP/Fetch errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Photo hosting errors (upload failures, malformed responses)
    #[error("Photo hosting error: {0}")]
    Hosting(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// Anyhow errors (for general error handling)
    #[error("Application error: {0}")]
    Anyhow(#[from] anyhow::Error),

    /// Order lookups that came up empty where a record was required
    #[error("Order {0} not found")]
    OrderNotFound(String),

    /// Payment-record lookups that came up empty where a record was required
    #[error("Payment record {0} not found")]
    PaymentNotFound(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

/// Helper function to convert String to AppError::Hosting
impl From<String> for AppError {
    fn from(err: String) -> Self {
        AppError::Hosting(err)
    }
}

/// Helper function to convert &str to AppError::Hosting
impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        AppError::Hosting(err.to_string())
    }
}
