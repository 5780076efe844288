//! Keyboards and message formatting
//!
//! Stateless rendering: every function here maps plain data to the text
//! and buttons Telegram shows. No session or store access.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup};

use crate::storage::orders::{OrderRecord, OrderStatus, PaymentRecord, WilayaStats};
use crate::core::commission;
use crate::telegram::texts;

/// The wilayas the business serves, in picker order.
pub const WILAYAS: &[&str] = &["عين صالح", "تمنراست", "أولف", "أدرار", "رقان"];

/// Fields shown in an order/review message. Borrowed view so both the
/// wizard session and stored records can render through the same code.
#[derive(Debug, Default)]
pub struct OrderDetails<'a> {
    pub customer_name: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub wilaya: Option<&'a str>,
    pub address: Option<&'a str>,
    pub amount_total: Option<f64>,
    pub notes: Option<&'a str>,
    pub photo_count: usize,
}

// ==================== Keyboards ====================

/// Persistent reply keyboard with the main actions.
pub fn main_menu_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![KeyboardButton::new(texts::NEW_ORDER)],
        vec![KeyboardButton::new(texts::MY_ORDERS), KeyboardButton::new(texts::STATISTICS)],
        vec![KeyboardButton::new(texts::HELP)],
    ])
    .resize_keyboard()
}

/// Back/cancel row shown under every mandatory wizard prompt.
pub fn wizard_nav_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback(texts::BACK, "order:back"),
        InlineKeyboardButton::callback(texts::CANCEL, "order:cancel"),
    ]])
}

/// Skip + back/cancel for the optional steps (address, notes).
pub fn optional_step_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(texts::SKIP, "order:next")],
        vec![
            InlineKeyboardButton::callback(texts::BACK, "order:back"),
            InlineKeyboardButton::callback(texts::CANCEL, "order:cancel"),
        ],
    ])
}

/// Wilaya picker for the region step.
pub fn wilayas_keyboard() -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = WILAYAS
        .iter()
        .map(|wilaya| {
            vec![InlineKeyboardButton::callback(
                *wilaya,
                format!("order:set_wilaya:{wilaya}"),
            )]
        })
        .collect();
    rows.push(vec![InlineKeyboardButton::callback(texts::CANCEL, "order:cancel")]);
    InlineKeyboardMarkup::new(rows)
}

/// Review screen: confirm, per-field edit shortcuts, cancel.
pub fn review_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(texts::CONFIRM, "order:confirm")],
        vec![
            InlineKeyboardButton::callback(texts::EDIT_NAME, "order:edit:name"),
            InlineKeyboardButton::callback(texts::EDIT_PHONE, "order:edit:phone"),
        ],
        vec![
            InlineKeyboardButton::callback(texts::EDIT_WILAYA, "order:edit:wilaya"),
            InlineKeyboardButton::callback(texts::EDIT_ADDRESS, "order:edit:address"),
        ],
        vec![InlineKeyboardButton::callback(texts::EDIT_AMOUNT, "order:edit:amount")],
        vec![InlineKeyboardButton::callback(texts::EDIT_NOTES, "order:edit:notes")],
        vec![InlineKeyboardButton::callback(texts::CANCEL, "order:cancel")],
    ])
}

/// Lifecycle control buttons posted to the channel, conditional on the
/// current status so staff only see transitions that make sense.
pub fn channel_control_keyboard(order_id: &str, status: OrderStatus) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();

    match status {
        OrderStatus::Preparing => {
            rows.push(vec![
                InlineKeyboardButton::callback(texts::STATUS_PREPARED, format!("status:prepared:{order_id}")),
                InlineKeyboardButton::callback(texts::STATUS_SHIPPED, format!("status:shipped:{order_id}")),
            ]);
            rows.push(vec![
                InlineKeyboardButton::callback(texts::STATUS_DELIVERED, format!("status:delivered:{order_id}")),
                InlineKeyboardButton::callback(texts::STATUS_CANCELED, format!("status:canceled:{order_id}")),
            ]);
        }
        OrderStatus::Prepared => {
            rows.push(vec![
                InlineKeyboardButton::callback("❌ إلغاء التجهيز", format!("cancel_status:prepared:{order_id}")),
                InlineKeyboardButton::callback(texts::STATUS_SHIPPED, format!("status:shipped:{order_id}")),
            ]);
            rows.push(vec![
                InlineKeyboardButton::callback(texts::STATUS_DELIVERED, format!("status:delivered:{order_id}")),
                InlineKeyboardButton::callback(texts::STATUS_CANCELED, format!("status:canceled:{order_id}")),
            ]);
        }
        OrderStatus::Shipped => {
            rows.push(vec![
                InlineKeyboardButton::callback("❌ إلغاء الإرسال", format!("cancel_status:shipped:{order_id}")),
                InlineKeyboardButton::callback(texts::STATUS_DELIVERED, format!("status:delivered:{order_id}")),
            ]);
            rows.push(vec![InlineKeyboardButton::callback(
                texts::STATUS_CANCELED,
                format!("status:canceled:{order_id}"),
            )]);
        }
        OrderStatus::Delivered => {
            rows.push(vec![
                InlineKeyboardButton::callback("❌ إلغاء التسليم", format!("cancel_status:delivered:{order_id}")),
                InlineKeyboardButton::callback(texts::STATUS_CANCELED, format!("status:canceled:{order_id}")),
            ]);
        }
        OrderStatus::Canceled => {
            rows.push(vec![InlineKeyboardButton::callback(
                "🔄 إعادة تفعيل",
                format!("status:preparing:{order_id}"),
            )]);
        }
    }

    InlineKeyboardMarkup::new(rows)
}

/// Wilaya picker for the statistics menu.
pub fn statistics_wilayas_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(
        WILAYAS
            .iter()
            .map(|wilaya| {
                vec![InlineKeyboardButton::callback(
                    format!("📊 {wilaya}"),
                    format!("stats:wilaya:{wilaya}"),
                )]
            })
            .collect::<Vec<_>>(),
    )
}

/// Actions available from a wilaya statistics report.
pub fn statistics_actions_keyboard(wilaya: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("📋 عرض التفاصيل", format!("stats:details:{wilaya}"))],
        vec![
            InlineKeyboardButton::callback("🔍 فلترة حسب الحالة", format!("stats:filter:{wilaya}")),
            InlineKeyboardButton::callback("💼 تقرير المحاسبة", format!("stats:accounting:{wilaya}")),
        ],
        vec![
            InlineKeyboardButton::callback("💰 استلام مبلغ", format!("payment:receive:{wilaya}")),
            InlineKeyboardButton::callback("📊 إدارة المدفوعات", format!("payment:manage:{wilaya}")),
        ],
        vec![InlineKeyboardButton::callback("⬅️ عودة", "stats:back")],
    ])
}

/// Status filter for a wilaya's order listing.
pub fn status_filter_keyboard(wilaya: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("🔍 قيد التجهيز", format!("stats:status:{wilaya}:preparing"))],
        vec![InlineKeyboardButton::callback("✅ تم التجهيز", format!("stats:status:{wilaya}:prepared"))],
        vec![InlineKeyboardButton::callback("🚚 تم الإرسال", format!("stats:status:{wilaya}:shipped"))],
        vec![InlineKeyboardButton::callback("📦 تم التسليم", format!("stats:status:{wilaya}:delivered"))],
        vec![InlineKeyboardButton::callback("⬅️ عودة", format!("stats:wilaya:{wilaya}"))],
    ])
}

/// Payment-management actions for one wilaya.
pub fn payment_management_keyboard(wilaya: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("📊 عرض قائمة المدفوعات", format!("payment:list:{wilaya}"))],
        vec![InlineKeyboardButton::callback("💰 إضافة دفعة جديدة", format!("payment:receive:{wilaya}"))],
        vec![InlineKeyboardButton::callback("⬅️ عودة", format!("stats:wilaya:{wilaya}"))],
    ])
}

/// Edit/delete actions for one payment record.
pub fn payment_edit_keyboard(payment_id: &str, wilaya: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("✏️ تعديل المبلغ", format!("payment:edit:{payment_id}"))],
        vec![InlineKeyboardButton::callback("🗑️ حذف الدفعة", format!("payment:delete:{payment_id}"))],
        vec![InlineKeyboardButton::callback("⬅️ عودة", format!("payment:manage:{wilaya}"))],
    ])
}

// ==================== Formatting ====================

/// Escapes legacy-Markdown control characters in user-supplied text.
/// `.` is deliberately left alone (legacy Markdown does not treat it).
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if "\\_*[]()~`>#+=|{}!-".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Renders an amount without grouping separators, dropping a zero
/// fractional part (`2500` rather than `2500.0`).
pub fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{}", amount as i64)
    } else {
        format!("{amount}")
    }
}

/// Human status label with emoji.
pub fn status_display_text(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Preparing => "🔍 قيد التجهيز",
        OrderStatus::Prepared => "✅ تم التجهيز",
        OrderStatus::Shipped => "🚚 تم الإرسال",
        OrderStatus::Delivered => "📦 تم التسليم",
        OrderStatus::Canceled => "❌ تم الإلغاء",
    }
}

fn status_emoji(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Preparing => "🔍",
        OrderStatus::Prepared => "✅",
        OrderStatus::Shipped => "🚚",
        OrderStatus::Delivered => "📦",
        OrderStatus::Canceled => "❌",
    }
}

/// Formats the order details block.
///
/// With `order_id` set this is the channel/details rendering ("new order"
/// title, optional status line); without it, the pre-submission review.
pub fn format_order_message(details: &OrderDetails<'_>, order_id: Option<&str>, status: Option<OrderStatus>) -> String {
    let title = match order_id {
        Some(id) => format!("طلب جديد: {id}"),
        None => "يرجى مراجعة تفاصيل الطلب:".to_string(),
    };
    let separator = "———————————————";

    let amount_label = match details.amount_total {
        Some(amount) => format!("{} د.ج", format_amount(amount)),
        None => "غير محدد".to_string(),
    };

    let status_line = match status {
        Some(status) if order_id.is_some() => {
            format!("{separator}\n✨ الحالة: {}\n", status_display_text(status))
        }
        _ => String::new(),
    };

    format!(
        "*{title}*\n\
         {separator}\n\
         👤 الاسم الكامل: {name}\n\
         {separator}\n\
         📞 رقم الهاتف: {phone}\n\
         {separator}\n\
         📍 الولاية/البلدية: {wilaya}\n\
         {separator}\n\
         🏠 العنوان: {address}\n\
         {separator}\n\
         💳 طريقة الدفع: الدفع عند الاستلام\n\
         {separator}\n\
         💰 المبلغ الإجمالي: {amount}\n\
         {separator}\n\
         📝 ملاحظات: {notes}\n\
         {separator}\n\
         {status_line}\n\
         🖼 الصور: ({photos} صور مرفقة)",
        name = non_empty_or(details.customer_name, "غير محدد"),
        phone = non_empty_or(details.phone, "غير محدد"),
        wilaya = non_empty_or(details.wilaya, "غير محدد"),
        address = non_empty_or(details.address, "وسط المدينة"),
        amount = escape_markdown(&amount_label),
        notes = non_empty_or(details.notes, "لا يوجد"),
        photos = details.photo_count,
    )
}

fn non_empty_or(value: Option<&str>, fallback: &str) -> String {
    match value {
        Some(v) if !v.is_empty() => escape_markdown(v),
        _ => fallback.to_string(),
    }
}

/// Wilaya statistics report with the accounting and balance sections.
pub fn format_wilaya_statistics_report(wilaya: &str, stats: &WilayaStats, total_received: f64) -> String {
    let separator = "━━━━━━━━━━━━━━━━━━━━━";

    let per_order_commission = commission::distributor_commission(wilaya);
    let accounting_count = stats.accounting_count();
    let total_commissions = per_order_commission * accounting_count as f64;
    let total_collectible = stats.accounting_amount() - total_commissions;

    let remaining = commission::remaining_balance(total_collectible, total_received);
    let balance_section = if commission::has_credit_balance(remaining) {
        format!(
            "💰 المستلم فعلاً: {} د.ج\n🟢 **رصيد ائتمان: {} د.ج**",
            format_amount(total_received),
            format_amount(commission::credit_amount(remaining))
        )
    } else if remaining == 0.0 {
        format!("💰 المستلم فعلاً: {} د.ج\n✅ **تم التحصيل بالكامل**", format_amount(total_received))
    } else {
        format!(
            "💰 المستلم فعلاً: {} د.ج\n⏳ **المتبقي: {} د.ج**",
            format_amount(total_received),
            format_amount(remaining)
        )
    };

    format!(
        "📊 *إحصائيات بلد: {wilaya}*\n\
         {separator}\n\
         📦 إجمالي الطلبيات: *{total_orders}*\n\
         💰 إجمالي المبالغ: *{total_amount} د.ج*\n\
         {separator}\n\n\
         📋 *حسب الحالة:*\n\
         🔍 قيد التجهيز: {prep_c} طلبيات ({prep_a} د.ج)\n\
         ✅ تم التجهيز: {pred_c} طلبيات ({pred_a} د.ج)\n\
         🚚 تم الإرسال: {ship_c} طلبيات ({ship_a} د.ج)\n\
         📦 تم التسليم: {del_c} طلبيات ({del_a} د.ج)\n\n\
         {separator}\n\
         💼 *للمحاسبة مع الموزع:*\n\
         📦 إجمالي قيمة الطلبيات: {acc_amount} د.ج\n\
         ➖ عمولة الموزع ({commission} د.ج × {acc_count}): {commissions} د.ج\n\
         💵 *المطلوب تحصيله: {collectible} د.ج*\n\n\
         {balance_section}",
        total_orders = stats.total_orders,
        total_amount = format_amount(stats.total_amount),
        prep_c = stats.preparing.count,
        prep_a = format_amount(stats.preparing.amount),
        pred_c = stats.prepared.count,
        pred_a = format_amount(stats.prepared.amount),
        ship_c = stats.shipped.count,
        ship_a = format_amount(stats.shipped.amount),
        del_c = stats.delivered.count,
        del_a = format_amount(stats.delivered.amount),
        acc_amount = format_amount(stats.accounting_amount()),
        commission = format_amount(per_order_commission),
        acc_count = accounting_count,
        commissions = format_amount(total_commissions),
        collectible = format_amount(total_collectible),
    )
}

/// Detailed order list (first 10 entries, remainder summarized).
pub fn format_orders_list(orders: &[OrderRecord], title: &str) -> String {
    if orders.is_empty() {
        return format!("{title}\n\n⚠️ لا توجد طلبيات في هذه الفئة.");
    }

    let mut message = format!("{title}\n━━━━━━━━━━━━━━━━━━━━━\n\n");
    for (index, order) in orders.iter().take(10).enumerate() {
        let date = order.created_at.split('T').next().unwrap_or(&order.created_at);
        message.push_str(&format!(
            "{}. *{}*\n   👤 {}\n   💰 {} د.ج\n   {} {}\n   📅 {}\n\n",
            index + 1,
            order.order_id,
            order.customer_name.as_deref().unwrap_or("غير محدد"),
            format_amount(order.amount_total.unwrap_or(0.0)),
            status_emoji(order.status),
            status_display_text(order.status),
            date,
        ));
    }

    if orders.len() > 10 {
        message.push_str(&format!("… و{} طلبيات أخرى", orders.len() - 10));
    }

    message
}

/// Payment list with one edit button per entry.
pub fn format_payments_list(payments: &[PaymentRecord], wilaya: &str) -> (String, InlineKeyboardMarkup) {
    if payments.is_empty() {
        return (
            format!("📊 *قائمة مدفوعات {wilaya}*\n\n⚠️ لا توجد مدفوعات مسجلة بعد."),
            payment_management_keyboard(wilaya),
        );
    }

    let mut message = format!("📊 *قائمة مدفوعات {wilaya}*\n━━━━━━━━━━━━━━━━━━━━━\n\n");
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();

    for (index, payment) in payments.iter().take(8).enumerate() {
        let date = payment.created_at.split('T').next().unwrap_or(&payment.created_at);
        message.push_str(&format!("{}. 💰 {} د.ج\n   📅 {}\n", index + 1, format_amount(payment.amount), date));
        if let Some(notes) = payment.notes.as_deref() {
            if !notes.is_empty() {
                message.push_str(&format!("   📝 {notes}\n"));
            }
        }
        message.push('\n');

        rows.push(vec![InlineKeyboardButton::callback(
            format!("✏️ تعديل #{}", index + 1),
            format!("payment:select:{}", payment.payment_id),
        )]);
    }

    if payments.len() > 8 {
        message.push_str(&format!("... و{} عمليات أخرى\n", payments.len() - 8));
    }

    rows.push(vec![InlineKeyboardButton::callback("⬅️ عودة", format!("stats:wilaya:{wilaya}"))]);

    (message, InlineKeyboardMarkup::new(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::orders::StatusBucket;

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("a*b_c"), "a\\*b\\_c");
        assert_eq!(escape_markdown("1.5"), "1.5"); // dot untouched
        assert_eq!(escape_markdown("أحمد"), "أحمد");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(2500.0), "2500");
        assert_eq!(format_amount(99.5), "99.5");
    }

    #[test]
    fn test_review_message_uses_fallbacks() {
        let details = OrderDetails {
            customer_name: Some("أحمد"),
            phone: Some("0661234567"),
            photo_count: 3,
            ..Default::default()
        };
        let message = format_order_message(&details, None, None);
        assert!(message.contains("يرجى مراجعة تفاصيل الطلب"));
        assert!(message.contains("أحمد"));
        assert!(message.contains("وسط المدينة")); // empty address fallback
        assert!(message.contains("لا يوجد")); // empty notes fallback
        assert!(message.contains("(3 صور مرفقة)"));
        assert!(!message.contains("الحالة")); // no status line in review
    }

    #[test]
    fn test_channel_message_has_id_and_status() {
        let details = OrderDetails {
            amount_total: Some(4500.0),
            photo_count: 1,
            ..Default::default()
        };
        let message = format_order_message(&details, Some("TSL-2026-08-06-001"), Some(OrderStatus::Preparing));
        assert!(message.contains("طلب جديد: TSL-2026-08-06-001"));
        assert!(message.contains("4500"));
        assert!(message.contains("قيد التجهيز"));
    }

    #[test]
    fn test_statistics_report_balance_states() {
        let stats = WilayaStats {
            total_orders: 4,
            total_amount: 16_000.0,
            shipped: StatusBucket { count: 1, amount: 6_000.0 },
            delivered: StatusBucket { count: 1, amount: 4_000.0 },
            ..Default::default()
        };

        // رقان commission is 200; collectible = 10000 - 400 = 9600
        let outstanding = format_wilaya_statistics_report("رقان", &stats, 1_600.0);
        assert!(outstanding.contains("المطلوب تحصيله: 9600 د.ج"));
        assert!(outstanding.contains("المتبقي: 8000 د.ج"));

        let settled = format_wilaya_statistics_report("رقان", &stats, 9_600.0);
        assert!(settled.contains("تم التحصيل بالكامل"));

        let credit = format_wilaya_statistics_report("رقان", &stats, 10_000.0);
        assert!(credit.contains("رصيد ائتمان: 400 د.ج"));
    }

    #[test]
    fn test_channel_control_keyboard_shape() {
        let preparing = channel_control_keyboard("TSL-1", OrderStatus::Preparing);
        assert_eq!(preparing.inline_keyboard.len(), 2);
        assert_eq!(preparing.inline_keyboard[0].len(), 2);

        let canceled = channel_control_keyboard("TSL-1", OrderStatus::Canceled);
        assert_eq!(canceled.inline_keyboard.len(), 1);
        assert_eq!(canceled.inline_keyboard[0].len(), 1);
    }

    #[test]
    fn test_wilayas_keyboard_has_cancel_row() {
        let kb = wilayas_keyboard();
        assert_eq!(kb.inline_keyboard.len(), WILAYAS.len() + 1);
    }
}
