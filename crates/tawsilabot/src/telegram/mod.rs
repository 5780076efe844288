//! Telegram bot integration and handlers

pub mod bot;
pub mod channel;
pub mod handlers;
pub mod menu;
pub mod orders;
pub mod stats;
pub mod texts;
pub mod wizard;

// Re-exports for convenience
pub use bot::{create_bot, setup_bot_commands, Command};
pub use handlers::{schema, HandlerDeps, HandlerError};
