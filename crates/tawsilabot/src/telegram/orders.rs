//! Staff order management
//!
//! Order listing and details for authorized staff, plus the channel
//! lifecycle controls (status transitions, reverts, permanent deletion).

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, InputFile, InputMedia, InputMediaPhoto, ParseMode};
use url::Url;

use crate::core::auth;
use crate::core::error::AppResult;
use crate::storage::orders::OrderStatus;
use crate::telegram::channel;
use crate::telegram::handlers::types::HandlerDeps;
use crate::telegram::menu;
use crate::telegram::texts;

/// Plain status label (no emoji) for callback toasts.
fn status_plain_text(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Preparing => "قيد التجهيز",
        OrderStatus::Prepared => "تم التجهيز",
        OrderStatus::Shipped => "تم الإرسال",
        OrderStatus::Delivered => "تم التسليم",
        OrderStatus::Canceled => "تم الإلغاء",
    }
}

/// Lists every order, one summary message each with a details button.
pub async fn handle_my_orders(bot: &Bot, deps: &HandlerDeps, chat: ChatId, user_id: u64) -> AppResult<()> {
    if !auth::is_authorized(user_id) {
        bot.send_message(chat, texts::NOT_AUTHORIZED).await?;
        return Ok(());
    }

    bot.send_message(chat, "⏳ جارِ البحث عن الطلبات...").await?;
    let orders = deps.store.fetch_all_orders().await?;

    if orders.is_empty() {
        bot.send_message(chat, "لا توجد أي طلبيات مسجلة حالياً.").await?;
        return Ok(());
    }

    bot.send_message(chat, format!("لقد وجدت {} طلبات:", orders.len())).await?;

    for order in orders {
        let name = order.customer_name.as_deref().unwrap_or("غير متوفر");
        let wilaya = order.wilaya.as_deref().unwrap_or("غير متوفر");
        let amount = match order.amount_total {
            Some(amount) => format!("{} د.ج", menu::format_amount(amount)),
            None => "غير متوفر".to_string(),
        };

        let summary = format!("*الاسم:* {name} | *البلد:* {wilaya} | *المبلغ:* {amount}");
        let message = format!(
            "*الطلبية رقم:* `{}`\n------------------\n{}\n------------------",
            order.order_id, summary
        );
        let keyboard = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
            "تفاصيل الطلبية",
            format!("details:{}", order.order_id),
        )]]);

        if let Err(e) = bot
            .send_message(chat, message)
            .parse_mode(ParseMode::Markdown)
            .reply_markup(keyboard)
            .await
        {
            // Keep listing the rest instead of aborting the whole loop
            log::error!("Failed to send summary for order {}: {}", order.order_id, e);
        }
    }

    Ok(())
}

/// Sends the stored photos and full details of one order.
pub async fn handle_details(bot: &Bot, deps: &HandlerDeps, chat: ChatId, order_id: &str) -> AppResult<()> {
    let Some(order) = deps.store.fetch_order(order_id).await? else {
        bot.send_message(chat, format!("لم أتمكن من العثور على تفاصيل الطلبية رقم: {order_id}")).await?;
        return Ok(());
    };

    if order.photo_links.len() == 1 {
        let file = InputFile::url(Url::parse(&order.photo_links[0])?);
        if let Err(e) = bot.send_photo(chat, file).await {
            log::error!("Failed to send photo for order {}: {}", order_id, e);
        }
    } else if !order.photo_links.is_empty() {
        let mut media: Vec<InputMedia> = Vec::with_capacity(order.photo_links.len());
        for link in &order.photo_links {
            media.push(InputMedia::Photo(InputMediaPhoto::new(InputFile::url(Url::parse(link)?))));
        }
        if let Err(e) = bot.send_media_group(chat, media).await {
            log::error!("Failed to send photos for order {}: {}", order_id, e);
        }
    }

    let details = menu::OrderDetails {
        customer_name: order.customer_name.as_deref(),
        phone: order.phone.as_deref(),
        wilaya: order.wilaya.as_deref(),
        address: order.address.as_deref(),
        amount_total: order.amount_total,
        notes: order.notes.as_deref(),
        photo_count: order.photo_links.len(),
    };
    bot.send_message(chat, menu::format_order_message(&details, Some(order_id), Some(order.status)))
        .parse_mode(ParseMode::Markdown)
        .await?;

    Ok(())
}

/// Channel control button: move an order to a new status.
///
/// `Canceled` is special: it permanently deletes the order and rewrites
/// the channel message into a deletion notice.
pub async fn handle_status_change(
    bot: &Bot,
    deps: &HandlerDeps,
    q: &CallbackQuery,
    new_status: OrderStatus,
    order_id: &str,
) -> AppResult<()> {
    let control_message_id = q.message.as_ref().map(|m| m.id());

    if new_status == OrderStatus::Canceled {
        bot.answer_callback_query(q.id.clone())
            .text(format!("حذف الطلب {order_id} نهائياً..."))
            .await?;

        if deps.store.order_status(order_id).await?.is_none() {
            let _ = bot
                .answer_callback_query(q.id.clone())
                .text(format!("⚠️ الطلب {order_id} غير موجود"))
                .await;
            return Ok(());
        }

        deps.store.delete_order(order_id).await?;
        channel::post_deletion_notice(bot, order_id, control_message_id).await?;

        log::info!("Order {} permanently deleted", order_id);
        let _ = bot
            .answer_callback_query(q.id.clone())
            .text(format!("✅ تم حذف الطلب {order_id} نهائياً من النظام"))
            .await;
        return Ok(());
    }

    bot.answer_callback_query(q.id.clone())
        .text(format!("تحديث حالة الطلب {order_id}..."))
        .await?;

    // Skip redundant updates so the channel edit does not churn
    let current = deps.store.order_status(order_id).await?;
    if current == Some(new_status) {
        log::warn!("Order {} is already {}", order_id, new_status);
        let _ = bot
            .answer_callback_query(q.id.clone())
            .text(format!("⚠️ الطلب بالفعل في حالة: {}", status_plain_text(new_status)))
            .await;
        return Ok(());
    }

    deps.store.update_order_status(order_id, new_status).await?;
    channel::update_order_status_message(bot, &deps.store, order_id, control_message_id).await?;

    log::info!("Order {} moved from {:?} to {}", order_id, current, new_status);
    let _ = bot
        .answer_callback_query(q.id.clone())
        .text(format!("✅ تم تحديث حالة الطلب إلى: {}", status_plain_text(new_status)))
        .await;
    Ok(())
}

/// Channel control button: revert a status back to `preparing`.
///
/// Only valid while the order is still in the status being reverted —
/// another staff member may have moved it on in the meantime.
pub async fn handle_status_revert(
    bot: &Bot,
    deps: &HandlerDeps,
    q: &CallbackQuery,
    previous: OrderStatus,
    order_id: &str,
) -> AppResult<()> {
    bot.answer_callback_query(q.id.clone())
        .text(format!("إلغاء حالة الطلب {order_id}..."))
        .await?;

    let current = deps.store.order_status(order_id).await?;
    if current != Some(previous) {
        log::warn!(
            "Order {} is {:?}, not {}; revert rejected",
            order_id,
            current,
            previous
        );
        let _ = bot
            .answer_callback_query(q.id.clone())
            .text(format!("⚠️ الطلب ليس في حالة: {}", status_plain_text(previous)))
            .await;
        return Ok(());
    }

    deps.store.update_order_status(order_id, OrderStatus::Preparing).await?;
    let control_message_id = q.message.as_ref().map(|m| m.id());
    channel::update_order_status_message(bot, &deps.store, order_id, control_message_id).await?;

    log::info!("Order {} reverted from {} to preparing", order_id, previous);
    let _ = bot
        .answer_callback_query(q.id.clone())
        .text(format!("✅ تم إلغاء حالة: {}", status_plain_text(previous)))
        .await;
    Ok(())
}
