//! Statistics and distributor-payment flows
//!
//! Staff-only screens reached from the "إحصائيات البلدان" menu button:
//! per-wilaya reports, order listings and filters, accounting summaries,
//! and payment recording/management. The payment input steps reuse the
//! wizard session table with scratch fields.

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ParseMode};

use crate::core::auth;
use crate::core::error::AppResult;
use crate::core::validation;
use crate::storage::orders::{OrderStatus, WilayaStats};
use crate::telegram::handlers::types::HandlerDeps;
use crate::telegram::menu;
use crate::telegram::texts;
use crate::telegram::wizard::session::{Session, Step};

const STATS_MENU_TEXT: &str = "📊 *إحصائيات البلدان*\n\nاختر البلد لعرض إحصائياته:";

/// Entry point from the main menu button.
pub async fn show_statistics_menu(bot: &Bot, chat: ChatId, user_id: u64) -> AppResult<()> {
    if !auth::is_authorized(user_id) {
        bot.send_message(chat, texts::NOT_AUTHORIZED).await?;
        return Ok(());
    }

    bot.send_message(chat, STATS_MENU_TEXT)
        .parse_mode(ParseMode::Markdown)
        .reply_markup(menu::statistics_wilayas_keyboard())
        .await?;
    Ok(())
}

/// `stats:back` — edit the current screen back to the wilaya picker.
pub async fn show_statistics_root(bot: &Bot, chat: ChatId, message_id: MessageId) -> AppResult<()> {
    bot.edit_message_text(chat, message_id, STATS_MENU_TEXT)
        .parse_mode(ParseMode::Markdown)
        .reply_markup(menu::statistics_wilayas_keyboard())
        .await?;
    Ok(())
}

/// `stats:wilaya:<w>` — the full statistics report for one wilaya.
pub async fn show_wilaya_report(
    bot: &Bot,
    deps: &HandlerDeps,
    chat: ChatId,
    message_id: MessageId,
    wilaya: &str,
) -> AppResult<()> {
    let stats = deps.store.wilaya_statistics(wilaya).await?;
    let total_received = deps.store.total_received(wilaya).await?;
    let report = menu::format_wilaya_statistics_report(wilaya, &stats, total_received);

    bot.edit_message_text(chat, message_id, report)
        .parse_mode(ParseMode::Markdown)
        .reply_markup(menu::statistics_actions_keyboard(wilaya))
        .await?;
    Ok(())
}

/// `stats:details:<w>` — order listing for a wilaya.
pub async fn show_wilaya_details(
    bot: &Bot,
    deps: &HandlerDeps,
    chat: ChatId,
    message_id: MessageId,
    wilaya: &str,
) -> AppResult<()> {
    let orders = deps.store.orders_by_wilaya(wilaya).await?;
    let message = menu::format_orders_list(&orders, &format!("📋 طلبيات {} (إجمالي: {})", wilaya, orders.len()));

    bot.edit_message_text(chat, message_id, message)
        .parse_mode(ParseMode::Markdown)
        .reply_markup(menu::statistics_actions_keyboard(wilaya))
        .await?;
    Ok(())
}

/// `stats:filter:<w>` — pick a status to filter by.
pub async fn show_status_filter(bot: &Bot, chat: ChatId, message_id: MessageId, wilaya: &str) -> AppResult<()> {
    bot.edit_message_text(
        chat,
        message_id,
        format!("🔍 *فلترة طلبيات {wilaya} حسب الحالة*\n\nاختر الحالة المطلوبة:"),
    )
    .parse_mode(ParseMode::Markdown)
    .reply_markup(menu::status_filter_keyboard(wilaya))
    .await?;
    Ok(())
}

/// `stats:status:<w>:<s>` — orders of one wilaya in one status.
pub async fn show_filtered_orders(
    bot: &Bot,
    deps: &HandlerDeps,
    chat: ChatId,
    message_id: MessageId,
    wilaya: &str,
    status: OrderStatus,
) -> AppResult<()> {
    let orders = deps.store.orders_by_wilaya_and_status(wilaya, status).await?;
    let title = format!(
        "📋 طلبيات {} - {} (إجمالي: {})",
        wilaya,
        menu::status_display_text(status),
        orders.len()
    );
    let message = menu::format_orders_list(&orders, &title);

    bot.edit_message_text(chat, message_id, message)
        .parse_mode(ParseMode::Markdown)
        .reply_markup(menu::status_filter_keyboard(wilaya))
        .await?;
    Ok(())
}

fn format_accounting_report(wilaya: &str, stats: &WilayaStats) -> String {
    let separator = "━━━━━━━━━━━━━━━━━━━━━";
    format!(
        "💼 *تقرير المحاسبة - {wilaya}*\n\
         {separator}\n\n\
         🚚 *المرسل للموزع:*\n   \
         • عدد الطلبيات: {ship_c}\n   \
         • إجمالي المبلغ: {ship_a} د.ج\n\n\
         📦 *المسلم من الموزع:*\n   \
         • عدد الطلبيات: {del_c}\n   \
         • إجمالي المبلغ: {del_a} د.ج\n\n\
         {separator}\n\
         💵 **إجمالي المطلوب تحصيله: {total} د.ج**",
        ship_c = stats.shipped.count,
        ship_a = menu::format_amount(stats.shipped.amount),
        del_c = stats.delivered.count,
        del_a = menu::format_amount(stats.delivered.amount),
        total = menu::format_amount(stats.accounting_amount()),
    )
}

/// `stats:accounting:<w>` — shipped/delivered accounting summary.
pub async fn show_accounting_report(
    bot: &Bot,
    deps: &HandlerDeps,
    chat: ChatId,
    message_id: MessageId,
    wilaya: &str,
) -> AppResult<()> {
    let stats = deps.store.wilaya_statistics(wilaya).await?;

    bot.edit_message_text(chat, message_id, format_accounting_report(wilaya, &stats))
        .parse_mode(ParseMode::Markdown)
        .reply_markup(menu::statistics_actions_keyboard(wilaya))
        .await?;
    Ok(())
}

// ==================== Payment flows ====================

/// `payment:receive:<w>` — put the user into the payment-amount step.
///
/// Reuses an existing session if the user has one (the step flip parks
/// whatever they were doing), otherwise creates a minimal one.
pub async fn prompt_payment_amount(
    bot: &Bot,
    deps: &HandlerDeps,
    chat: ChatId,
    message_id: MessageId,
    user: UserId,
    wilaya: &str,
) -> AppResult<()> {
    match deps.sessions.get(user) {
        Some(mut session) => {
            session.step = Step::AwaitingPaymentAmount;
            session.payment_wilaya = Some(wilaya.to_string());
            deps.sessions.set(user, session);
        }
        None => {
            deps.sessions.set(
                user,
                Session::for_payment(Step::AwaitingPaymentAmount, wilaya.to_string(), None),
            );
        }
    }

    bot.edit_message_text(
        chat,
        message_id,
        format!(
            "💰 *تسجيل استلام مبلغ من موزع {wilaya}*\n\nيرجى إدخال المبلغ المستلم (بالأرقام فقط):\n\nمثال: 5000"
        ),
    )
    .parse_mode(ParseMode::Markdown)
    .reply_markup(InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "❌ إلغاء",
        format!("stats:wilaya:{wilaya}"),
    )]]))
    .await?;
    Ok(())
}

/// `payment:manage:<w>` — payment-management menu.
pub async fn show_payment_management(bot: &Bot, chat: ChatId, message_id: MessageId, wilaya: &str) -> AppResult<()> {
    bot.edit_message_text(chat, message_id, format!("📊 *إدارة مدفوعات {wilaya}*\n\nاختر الإجراء المطلوب:"))
        .parse_mode(ParseMode::Markdown)
        .reply_markup(menu::payment_management_keyboard(wilaya))
        .await?;
    Ok(())
}

/// `payment:list:<w>` — payment history with per-entry edit buttons.
pub async fn show_payment_list(
    bot: &Bot,
    deps: &HandlerDeps,
    chat: ChatId,
    message_id: MessageId,
    wilaya: &str,
) -> AppResult<()> {
    let history = deps.store.payment_history(wilaya).await?;
    let (message, keyboard) = menu::format_payments_list(&history, wilaya);

    bot.edit_message_text(chat, message_id, message)
        .parse_mode(ParseMode::Markdown)
        .reply_markup(keyboard)
        .await?;
    Ok(())
}

/// `payment:select:<id>` — actions for one payment record.
pub async fn show_payment_actions(
    bot: &Bot,
    deps: &HandlerDeps,
    chat: ChatId,
    message_id: MessageId,
    payment_id: &str,
) -> AppResult<()> {
    let Some(payment) = deps.store.payment(payment_id).await? else {
        bot.edit_message_text(chat, message_id, format!("⚠️ لم يتم العثور على الدفعة: {payment_id}")).await?;
        return Ok(());
    };

    bot.edit_message_text(
        chat,
        message_id,
        format!(
            "✏️ *تعديل الدفعة*\n\n💰 معرف الدفعة: {payment_id}\n📍 البلد: {}\n\nاختر الإجراء:",
            payment.wilaya
        ),
    )
    .parse_mode(ParseMode::Markdown)
    .reply_markup(menu::payment_edit_keyboard(payment_id, &payment.wilaya))
    .await?;
    Ok(())
}

/// `payment:edit:<id>` — put the user into the payment-edit step.
pub async fn prompt_payment_edit(
    bot: &Bot,
    deps: &HandlerDeps,
    chat: ChatId,
    message_id: MessageId,
    user: UserId,
    payment_id: &str,
) -> AppResult<()> {
    let Some(payment) = deps.store.payment(payment_id).await? else {
        bot.edit_message_text(chat, message_id, format!("⚠️ لم يتم العثور على الدفعة: {payment_id}")).await?;
        return Ok(());
    };

    match deps.sessions.get(user) {
        Some(mut session) => {
            session.step = Step::AwaitingPaymentEdit;
            session.payment_wilaya = Some(payment.wilaya.clone());
            session.payment_id_for_edit = Some(payment_id.to_string());
            deps.sessions.set(user, session);
        }
        None => {
            deps.sessions.set(
                user,
                Session::for_payment(
                    Step::AwaitingPaymentEdit,
                    payment.wilaya.clone(),
                    Some(payment_id.to_string()),
                ),
            );
        }
    }

    bot.edit_message_text(
        chat,
        message_id,
        format!(
            "✏️ *تعديل مبلغ الدفعة*\n\n💰 معرف الدفعة: {payment_id}\n📍 البلد: {}\n\n\
             يرجى إدخال المبلغ الجديد (بالأرقام فقط):\n\nمثال: 7500",
            payment.wilaya
        ),
    )
    .parse_mode(ParseMode::Markdown)
    .reply_markup(InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "❌ إلغاء",
        format!("payment:select:{payment_id}"),
    )]]))
    .await?;
    Ok(())
}

/// `payment:delete:<id>` — delete a payment record.
pub async fn handle_payment_delete(
    bot: &Bot,
    deps: &HandlerDeps,
    chat: ChatId,
    message_id: MessageId,
    payment_id: &str,
) -> AppResult<()> {
    let Some(payment) = deps.store.payment(payment_id).await? else {
        bot.edit_message_text(chat, message_id, format!("⚠️ لم يتم العثور على الدفعة: {payment_id}")).await?;
        return Ok(());
    };

    deps.store.delete_payment(payment_id).await?;

    bot.edit_message_text(
        chat,
        message_id,
        format!(
            "✅ *تم حذف الدفعة بنجاح*\n\n💰 معرف الدفعة: {payment_id}\n📍 البلد: {}",
            payment.wilaya
        ),
    )
    .parse_mode(ParseMode::Markdown)
    .reply_markup(InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "⬅️ عودة للقائمة",
        format!("payment:list:{}", payment.wilaya),
    )]]))
    .await?;
    Ok(())
}

// ==================== Payment text input ====================

/// Text entered while at `AwaitingPaymentAmount`.
pub async fn handle_payment_amount_input(
    bot: &Bot,
    deps: &HandlerDeps,
    chat: ChatId,
    user: UserId,
    text: &str,
) -> AppResult<()> {
    let Some(session) = deps.sessions.get(user) else {
        return Ok(());
    };
    let Some(wilaya) = session.payment_wilaya.clone() else {
        deps.sessions.remove(user);
        return Ok(());
    };

    let Some(amount) = validation::parse_amount(text) else {
        bot.send_message(chat, texts::INVALID_AMOUNT).await?;
        return Ok(());
    };

    let payment = deps.store.record_payment(&wilaya, amount, None).await?;
    deps.sessions.remove(user);

    bot.send_message(
        chat,
        format!(
            "✅ تم تسجيل استلام {} د.ج من موزع {} (معرف الدفعة: {})",
            menu::format_amount(amount),
            wilaya,
            payment.payment_id
        ),
    )
    .await?;

    send_fresh_report(bot, deps, chat, &wilaya).await
}

/// Text entered while at `AwaitingPaymentEdit`.
pub async fn handle_payment_edit_input(
    bot: &Bot,
    deps: &HandlerDeps,
    chat: ChatId,
    user: UserId,
    text: &str,
) -> AppResult<()> {
    let Some(session) = deps.sessions.get(user) else {
        return Ok(());
    };
    let (Some(wilaya), Some(payment_id)) = (session.payment_wilaya.clone(), session.payment_id_for_edit.clone())
    else {
        deps.sessions.remove(user);
        return Ok(());
    };

    let Some(amount) = validation::parse_amount(text) else {
        bot.send_message(chat, texts::INVALID_AMOUNT).await?;
        return Ok(());
    };

    deps.store.update_payment(&payment_id, amount).await?;
    deps.sessions.remove(user);

    bot.send_message(
        chat,
        format!("✅ تم تعديل الدفعة {} إلى {} د.ج", payment_id, menu::format_amount(amount)),
    )
    .await?;

    send_fresh_report(bot, deps, chat, &wilaya).await
}

/// Posts an up-to-date wilaya report as a new message (the prompt the
/// user was answering was an inline-edited screen).
async fn send_fresh_report(bot: &Bot, deps: &HandlerDeps, chat: ChatId, wilaya: &str) -> AppResult<()> {
    let stats = deps.store.wilaya_statistics(wilaya).await?;
    let total_received = deps.store.total_received(wilaya).await?;
    let report = menu::format_wilaya_statistics_report(wilaya, &stats, total_received);

    bot.send_message(chat, report)
        .parse_mode(ParseMode::Markdown)
        .reply_markup(menu::statistics_actions_keyboard(wilaya))
        .await?;
    Ok(())
}
