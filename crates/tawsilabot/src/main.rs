use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use teloxide::prelude::*;

use tawsilabot::core::{config, init_logger};
use tawsilabot::hosting::{CloudinaryHost, PhotoHost};
use tawsilabot::storage::orders::OrderStore;
use tawsilabot::storage::{create_pool, SqliteOrderStore};
use tawsilabot::telegram::wizard::media_group::MediaGroupAggregator;
use tawsilabot::telegram::wizard::session::SessionStore;
use tawsilabot::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps};

/// Main entry point for the Telegram bot
///
/// # Errors
/// Returns an error if initialization fails (logging, database, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    // Set up global panic handler to catch panics in dispatcher tasks:
    // log the panic and keep working instead of terminating
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
        if let Some(msg) = panic_info.payload().downcast_ref::<&str>() {
            log::error!("Panic message: {}", msg);
        }
    }));

    // Load environment variables from .env before any config is read
    let _ = dotenv();

    // Initialize logger (console + file)
    init_logger(&config::LOG_FILE_PATH)?;

    log::info!("Starting tawsilabot...");

    // Database pool + order store
    let db_pool = Arc::new(
        create_pool(&config::DATABASE_PATH).map_err(|e| anyhow::anyhow!("Failed to create database pool: {}", e))?,
    );
    let store: Arc<dyn OrderStore> = Arc::new(SqliteOrderStore::new(Arc::clone(&db_pool)));

    // Photo hosting, session table and album aggregator
    let photo_host: Arc<dyn PhotoHost> = Arc::new(CloudinaryHost::from_env());
    let sessions = Arc::new(SessionStore::new());
    let media_groups = Arc::new(MediaGroupAggregator::new(config::media_group::debounce()));

    let bot = create_bot()?;
    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to set bot commands: {}", e);
    }

    if config::CHANNEL_ID.is_none() {
        log::warn!("TELEGRAM_CHANNEL_ID is not set; orders will not be posted to a channel.");
    }

    // Health check endpoint, alongside the dispatcher
    tokio::spawn(async {
        if let Err(e) = run_health_server(*config::HEALTH_PORT).await {
            log::error!("Health server failed: {}", e);
        }
    });

    let deps = HandlerDeps::new(sessions, media_groups, store, photo_host);

    log::info!("Bot is starting...");
    Dispatcher::builder(bot, schema(deps))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    log::info!("Dispatcher shutdown gracefully");
    Ok(())
}

/// Serves `GET /health` returning a JSON status payload.
async fn run_health_server(port: u16) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    use axum::{routing::get, Json, Router};
    use serde_json::json;
    use std::net::SocketAddr;
    use tokio::net::TcpListener;

    let app = Router::new().route(
        "/health",
        get(|| async { Json(json!({ "status": "healthy", "timestamp": chrono::Utc::now().to_rfc3339() })) }),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    log::info!("Health check server running on http://{}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
