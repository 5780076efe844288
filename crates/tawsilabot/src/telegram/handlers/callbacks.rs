//! Callback-query routing
//!
//! One place that parses `data` strings and dispatches to the wizard,
//! order-management, statistics and payment handlers. Failures are
//! logged and surfaced as a generic toast; they never escape the
//! dispatcher task.

use std::str::FromStr;
use teloxide::prelude::*;

use super::types::HandlerDeps;
use crate::core::error::AppResult;
use crate::storage::orders::OrderStatus;
use crate::telegram::wizard::{self, ConfirmOutcome, EditField};
use crate::telegram::{orders, stats, texts};

/// Entry point from the dispatcher. Never returns an error.
pub async fn handle_callback(bot: Bot, q: CallbackQuery, deps: HandlerDeps) {
    let data = q.data.clone().unwrap_or_default();
    log::info!("Button pressed by {}: {}", q.from.id, data);

    if let Err(e) = route(&bot, &q, &deps, &data).await {
        log::error!("Callback '{}' from user {} failed: {}", data, q.from.id, e);
        let _ = bot
            .answer_callback_query(q.id.clone())
            .text("❌ حدث خطأ أثناء معالجة الإجراء")
            .await;
    }
}

/// Chat the pressed keyboard lives in; private-chat fallback derives the
/// chat id from the user id (they coincide for private chats).
fn callback_chat(q: &CallbackQuery) -> ChatId {
    q.message
        .as_ref()
        .map(|m| m.chat().id)
        .unwrap_or(ChatId(q.from.id.0 as i64))
}

async fn route(bot: &Bot, q: &CallbackQuery, deps: &HandlerDeps, data: &str) -> AppResult<()> {
    let user = q.from.id;
    let chat = callback_chat(q);

    // ---- Order wizard actions ----

    if let Some(wilaya) = data.strip_prefix("order:set_wilaya:") {
        let _ = bot.answer_callback_query(q.id.clone()).text(format!("{wilaya} ✅")).await;
        return wizard::handle_wilaya_selected(bot, deps, chat, user, wilaya).await;
    }

    if let Some(field) = data.strip_prefix("order:edit:") {
        bot.answer_callback_query(q.id.clone()).await?;
        let Some(field) = EditField::from_callback(field) else {
            return Ok(());
        };
        return wizard::handle_edit(bot, deps, chat, user, field).await;
    }

    match data {
        "order:start" => {
            bot.answer_callback_query(q.id.clone()).await?;
            if deps.sessions.contains(user) {
                bot.send_message(chat, texts::WIZARD_ALREADY_ACTIVE).await?;
                return Ok(());
            }
            return wizard::start_wizard(bot, deps, chat, user).await;
        }
        "order:cancel" => {
            bot.answer_callback_query(q.id.clone()).await?;
            return wizard::handle_cancel(bot, deps, chat, user).await;
        }
        "order:back" => {
            bot.answer_callback_query(q.id.clone()).await?;
            return wizard::handle_back(bot, deps, chat, user).await;
        }
        "order:next" => {
            bot.answer_callback_query(q.id.clone()).await?;
            return wizard::handle_skip(bot, deps, chat, user).await;
        }
        "order:confirm" => {
            // The confirm handler owns the duplicate-rejection notice, so
            // the query is answered after the outcome is known.
            let outcome = wizard::handle_confirm(bot, deps, chat, user).await?;
            let answer = bot.answer_callback_query(q.id.clone());
            let _ = match outcome {
                ConfirmOutcome::AlreadyProcessing => answer.text(texts::ALREADY_PROCESSING).await,
                _ => answer.await,
            };
            return Ok(());
        }
        _ => {}
    }

    // ---- Channel lifecycle controls ----

    if let Some(rest) = data.strip_prefix("cancel_status:") {
        if let Some((status, order_id)) = rest.split_once(':') {
            if let Ok(status) = OrderStatus::from_str(status) {
                return orders::handle_status_revert(bot, deps, q, status, order_id).await;
            }
        }
        return Ok(());
    }

    if let Some(rest) = data.strip_prefix("status:") {
        if let Some((status, order_id)) = rest.split_once(':') {
            if let Ok(status) = OrderStatus::from_str(status) {
                return orders::handle_status_change(bot, deps, q, status, order_id).await;
            }
        }
        return Ok(());
    }

    if let Some(order_id) = data.strip_prefix("details:") {
        let _ = bot
            .answer_callback_query(q.id.clone())
            .text(format!("جلب تفاصيل الطلب {order_id}..."))
            .await;
        return orders::handle_details(bot, deps, chat, order_id).await;
    }

    // ---- Statistics & payments (screens edited in place) ----

    let Some(message_id) = q.message.as_ref().map(|m| m.id()) else {
        let _ = bot.answer_callback_query(q.id.clone()).await;
        return Ok(());
    };

    if data == "stats:back" {
        bot.answer_callback_query(q.id.clone()).await?;
        return stats::show_statistics_root(bot, chat, message_id).await;
    }

    if let Some(wilaya) = data.strip_prefix("stats:wilaya:") {
        let _ = bot
            .answer_callback_query(q.id.clone())
            .text(format!("جلب إحصائيات {wilaya}..."))
            .await;
        return stats::show_wilaya_report(bot, deps, chat, message_id, wilaya).await;
    }

    if let Some(wilaya) = data.strip_prefix("stats:details:") {
        let _ = bot
            .answer_callback_query(q.id.clone())
            .text(format!("جلب تفاصيل طلبيات {wilaya}..."))
            .await;
        return stats::show_wilaya_details(bot, deps, chat, message_id, wilaya).await;
    }

    if let Some(wilaya) = data.strip_prefix("stats:filter:") {
        let _ = bot.answer_callback_query(q.id.clone()).text("اختر الحالة للفلترة...").await;
        return stats::show_status_filter(bot, chat, message_id, wilaya).await;
    }

    if let Some(rest) = data.strip_prefix("stats:status:") {
        if let Some((wilaya, status)) = rest.rsplit_once(':') {
            if let Ok(status) = OrderStatus::from_str(status) {
                let _ = bot
                    .answer_callback_query(q.id.clone())
                    .text(format!("جلب طلبيات {status}..."))
                    .await;
                return stats::show_filtered_orders(bot, deps, chat, message_id, wilaya, status).await;
            }
        }
        return Ok(());
    }

    if let Some(wilaya) = data.strip_prefix("stats:accounting:") {
        let _ = bot.answer_callback_query(q.id.clone()).text("حساب تقرير المحاسبة...").await;
        return stats::show_accounting_report(bot, deps, chat, message_id, wilaya).await;
    }

    if let Some(wilaya) = data.strip_prefix("payment:receive:") {
        bot.answer_callback_query(q.id.clone()).await?;
        return stats::prompt_payment_amount(bot, deps, chat, message_id, user, wilaya).await;
    }

    if let Some(wilaya) = data.strip_prefix("payment:manage:") {
        bot.answer_callback_query(q.id.clone()).await?;
        return stats::show_payment_management(bot, chat, message_id, wilaya).await;
    }

    if let Some(wilaya) = data.strip_prefix("payment:list:") {
        let _ = bot
            .answer_callback_query(q.id.clone())
            .text(format!("جلب قائمة مدفوعات {wilaya}..."))
            .await;
        return stats::show_payment_list(bot, deps, chat, message_id, wilaya).await;
    }

    if let Some(payment_id) = data.strip_prefix("payment:select:") {
        bot.answer_callback_query(q.id.clone()).await?;
        return stats::show_payment_actions(bot, deps, chat, message_id, payment_id).await;
    }

    if let Some(payment_id) = data.strip_prefix("payment:edit:") {
        bot.answer_callback_query(q.id.clone()).await?;
        return stats::prompt_payment_edit(bot, deps, chat, message_id, user, payment_id).await;
    }

    if let Some(payment_id) = data.strip_prefix("payment:delete:") {
        let _ = bot
            .answer_callback_query(q.id.clone())
            .text(format!("حذف الدفعة {payment_id}..."))
            .await;
        return stats::handle_payment_delete(bot, deps, chat, message_id, payment_id).await;
    }

    let _ = bot.answer_callback_query(q.id.clone()).text("تم استلام الإجراء.").await;
    Ok(())
}
