//! Submission orchestration
//!
//! The confirm path runs a strict external sequence: generate the order
//! id, re-host every photo, post to the channel, persist the record.
//! Later steps depend on artifacts of earlier ones (the channel post and
//! the stored record need the permanent photo URLs), so the order is
//! fixed. Nothing is checkpointed: a retry after a partial failure
//! re-runs the whole sequence, so every external side effect is
//! at-least-once.

use futures_util::future::try_join_all;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::FileId;

use crate::core::config;
use crate::core::error::AppResult;
use crate::hosting::PhotoHost;
use crate::storage::orders::{NewOrder, OrderStore};
use crate::telegram::channel;
use crate::telegram::wizard::session::Session;

/// Runs the full submission sequence for a completed session.
///
/// On success the session carries the hosting records and the new order
/// id is returned. On failure the first error propagates and the caller
/// decides the UI recovery; hosting records from a successful upload
/// step stay on the session either way.
pub async fn submit_order(
    bot: &Bot,
    store: &Arc<dyn OrderStore>,
    host: &Arc<dyn PhotoHost>,
    session: &mut Session,
) -> AppResult<String> {
    // Step 1: allocate the order id (needed for the hosting folder)
    let order_id = store.generate_next_order_id().await?;

    // Step 2: re-host all photos concurrently
    let folder = format!("orders/{order_id}");
    let uploads = session.photo_file_ids.iter().map(|file_id| {
        let folder = folder.clone();
        async move {
            let file = bot.get_file(FileId(file_id.clone())).await?;
            let source = format!(
                "https://api.telegram.org/file/bot{}/{}",
                config::BOT_TOKEN.as_str(),
                file.path
            );
            host.upload(&source, &folder).await
        }
    });
    let hosted = try_join_all(uploads).await?;
    log::info!("Hosted {} photo(s) for order {}", hosted.len(), order_id);
    session.uploaded_photos = hosted;

    // Step 3: broadcast to the operations channel
    channel::post_order(bot, session, &order_id).await?;

    // Step 4: persist the order record
    store
        .create_order(NewOrder {
            order_id: order_id.clone(),
            customer_name: session.customer_name.clone(),
            phone: session.phone.clone(),
            wilaya: session.wilaya.clone(),
            address: session.address.clone(),
            amount_total: session.amount_total,
            notes: session.notes.clone(),
            photo_links: session.uploaded_photos.iter().map(|p| p.secure_url.clone()).collect(),
        })
        .await?;

    Ok(order_id)
}
