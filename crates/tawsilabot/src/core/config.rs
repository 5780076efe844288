use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Configuration constants for the bot

/// Telegram Bot API token
/// Read once at startup from TELOXIDE_TOKEN (the variable teloxide's
/// `Bot::from_env` reads). Also needed directly to build file-download URLs.
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| env::var("TELOXIDE_TOKEN").unwrap_or_default());

/// Broadcast channel for new orders and lifecycle controls
/// Read from TELEGRAM_CHANNEL_ID (numeric chat id, e.g. -1001234567890).
/// None disables channel posting; submission treats that as "skip", same
/// as the service it replaces.
pub static CHANNEL_ID: Lazy<Option<i64>> = Lazy::new(|| {
    env::var("TELEGRAM_CHANNEL_ID").ok().and_then(|raw| raw.trim().parse().ok())
});

/// Comma-separated Telegram user ids allowed to use staff features
/// (order listing, statistics, payment management).
pub static AUTHORIZED_USER_IDS: Lazy<String> =
    Lazy::new(|| env::var("AUTHORIZED_USER_IDS").unwrap_or_default());

/// SQLite database path
/// Read from DATABASE_PATH environment variable.
pub static DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("DATABASE_PATH").unwrap_or_else(|_| "tawsila.sqlite".to_string()));

/// Log file path
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "tawsilabot.log".to_string()));

/// Cloudinary cloud name (the {cloud} part of the upload endpoint URL)
pub static CLOUDINARY_CLOUD_NAME: Lazy<String> =
    Lazy::new(|| env::var("CLOUDINARY_CLOUD_NAME").unwrap_or_default());

/// Cloudinary API key
pub static CLOUDINARY_API_KEY: Lazy<String> =
    Lazy::new(|| env::var("CLOUDINARY_API_KEY").unwrap_or_default());

/// Cloudinary API secret (used for request signing)
pub static CLOUDINARY_API_SECRET: Lazy<String> =
    Lazy::new(|| env::var("CLOUDINARY_API_SECRET").unwrap_or_default());

/// Health check server port
pub static HEALTH_PORT: Lazy<u16> = Lazy::new(|| {
    env::var("PORT")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(3000)
});

/// Order wizard configuration
pub mod wizard {
    /// Maximum number of photos accepted per order
    pub const MAX_PHOTOS: usize = 10;
}

/// Media-group (album) aggregation configuration
pub mod media_group {
    use super::Duration;

    /// Quiet period after the last photo of an album before the batch is
    /// finalized. Much smaller than human inter-photo send gaps, larger
    /// than intra-album server delivery jitter.
    pub const DEBOUNCE_MS: u64 = 600;

    /// Debounce window duration
    pub fn debounce() -> Duration {
        Duration::from_millis(DEBOUNCE_MS)
    }
}

/// Order identifier configuration
pub mod order_id {
    /// Prefix of every generated order id (`TSL-YYYY-MM-DD-XXX`)
    pub const PREFIX: &str = "TSL";

    /// Width of the zero-padded sequence suffix
    pub const SEQ_WIDTH: usize = 3;
}

/// Database configuration
pub mod database {
    /// Maximum number of pooled SQLite connections
    pub const POOL_SIZE: u32 = 10;
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Timeout for outbound HTTP requests (Telegram API, photo hosting)
    pub const TIMEOUT_SECS: u64 = 60;

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(TIMEOUT_SECS)
    }
}
