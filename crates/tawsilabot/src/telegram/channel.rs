//! Broadcast-channel integration
//!
//! Every submitted order is posted to the operations channel as a photo
//! album (details in the first caption) followed by a control-buttons
//! message staff use to drive the order lifecycle.

use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{InputFile, InputMedia, InputMediaPhoto, MessageId, ParseMode};
use url::Url;

use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::storage::orders::{OrderStatus, OrderStore};
use crate::telegram::menu;
use crate::telegram::wizard::session::Session;

fn channel_chat() -> Option<ChatId> {
    let id = (*config::CHANNEL_ID)?;
    Some(ChatId(id))
}

/// Posts a submitted order (album + control message) to the channel.
///
/// Skips quietly when no channel is configured, mirroring the service
/// behavior this replaces; a configured channel that rejects the post is
/// a hard error so the submission can be retried.
pub async fn post_order(bot: &Bot, session: &Session, order_id: &str) -> AppResult<()> {
    let Some(chat) = channel_chat() else {
        log::error!("TELEGRAM_CHANNEL_ID is not set. Cannot post order {} to channel.", order_id);
        return Ok(());
    };

    if session.uploaded_photos.is_empty() {
        log::error!("No hosted photos on order {}. Cannot post to channel.", order_id);
        return Ok(());
    }

    log::info!("Posting order {} to channel {}", order_id, chat);

    let details = menu::OrderDetails {
        customer_name: session.customer_name.as_deref(),
        phone: session.phone.as_deref(),
        wilaya: session.wilaya.as_deref(),
        address: session.address.as_deref(),
        amount_total: session.amount_total,
        notes: session.notes.as_deref(),
        photo_count: session.uploaded_photos.len(),
    };
    let caption = menu::format_order_message(&details, Some(order_id), Some(OrderStatus::Preparing));

    // send_media_group requires 2-10 items; a single photo goes out via
    // send_photo with the same caption
    if session.uploaded_photos.len() == 1 {
        let file = InputFile::url(Url::parse(&session.uploaded_photos[0].secure_url)?);
        bot.send_photo(chat, file)
            .caption(caption)
            .parse_mode(ParseMode::Markdown)
            .await?;
    } else {
        let mut media: Vec<InputMedia> = Vec::with_capacity(session.uploaded_photos.len());
        for (index, photo) in session.uploaded_photos.iter().enumerate() {
            let mut item = InputMediaPhoto::new(InputFile::url(Url::parse(&photo.secure_url)?));
            if index == 0 {
                item = item.caption(caption.clone()).parse_mode(ParseMode::Markdown);
            }
            media.push(InputMedia::Photo(item));
        }

        bot.send_media_group(chat, media).await?;
    }

    bot.send_message(
        chat,
        format!("🎛️ **أزرار التحكم بالطلب: {order_id}**\n🔍 الحالة: قيد التجهيز"),
    )
    .parse_mode(ParseMode::Markdown)
    .reply_markup(menu::channel_control_keyboard(order_id, OrderStatus::Preparing))
    .await?;

    log::info!("Posted order {} with controls to channel", order_id);
    Ok(())
}

/// Refreshes the channel control message after a status change.
///
/// The status is re-read from the store so the message always reflects
/// what is persisted, not what the button claimed.
pub async fn update_order_status_message(
    bot: &Bot,
    store: &Arc<dyn OrderStore>,
    order_id: &str,
    control_message_id: Option<MessageId>,
) -> AppResult<()> {
    let Some(chat) = channel_chat() else {
        log::error!("TELEGRAM_CHANNEL_ID is not set. Cannot update channel message.");
        return Ok(());
    };

    let current = store
        .order_status(order_id)
        .await?
        .ok_or_else(|| AppError::OrderNotFound(order_id.to_string()))?;

    let keyboard = menu::channel_control_keyboard(order_id, current);
    let text = format!(
        "*التحكم بالطلب: {order_id}*\n✨ *الحالة:* {}",
        menu::status_display_text(current)
    );

    match control_message_id {
        Some(message_id) => {
            let edit = bot
                .edit_message_text(chat, message_id, text)
                .parse_mode(ParseMode::Markdown)
                .reply_markup(keyboard)
                .await;
            match edit {
                Ok(_) => {}
                // The keyboard/text already match the new status
                Err(e) if e.to_string().contains("message is not modified") => {
                    log::info!("Channel message for {} already up to date", order_id);
                }
                Err(e) => return Err(e.into()),
            }
        }
        None => {
            bot.send_message(chat, text)
                .parse_mode(ParseMode::Markdown)
                .reply_markup(keyboard)
                .await?;
        }
    }

    log::info!("Channel control message for {} now shows {}", order_id, current);
    Ok(())
}

/// Rewrites the control message into a permanent-deletion notice
/// (falling back to deleting it outright).
pub async fn post_deletion_notice(bot: &Bot, order_id: &str, control_message_id: Option<MessageId>) -> AppResult<()> {
    let Some(chat) = channel_chat() else {
        log::error!("TELEGRAM_CHANNEL_ID is not set. Cannot update channel message.");
        return Ok(());
    };

    let notice = format!("❌ **تم حذف الطلب: {order_id}**\n📝 تم حذف هذا الطلب نهائياً من النظام.");

    match control_message_id {
        Some(message_id) => {
            if let Err(e) = bot
                .edit_message_text(chat, message_id, notice.clone())
                .parse_mode(ParseMode::Markdown)
                .await
            {
                log::warn!("Failed to edit control message for {}: {}. Deleting instead.", order_id, e);
                if let Err(e) = bot.delete_message(chat, message_id).await {
                    log::warn!("Failed to delete control message for {}: {}", order_id, e);
                }
            }
        }
        None => {
            bot.send_message(chat, notice).parse_mode(ParseMode::Markdown).await?;
        }
    }

    Ok(())
}
