//! User-facing Arabic strings
//!
//! The bot speaks one language, so strings live here as constants rather
//! than behind a localization layer.

pub const WELCOME: &str = "مرحباً بك! كيف يمكنني خدمتك؟";
pub const WIZARD_SEND_PHOTOS: &str = "الرجاء إرسال صور المنتج (من 1 إلى 10 صور). يمكنك إرسالها كألبوم واحد.";
pub const PHOTOS_RECEIVED: &str = "📸 تم استلام الصور.";
pub const ASK_CUSTOMER_NAME: &str = "الآن، يرجى إدخال *الاسم الكامل* للزبون:";
pub const ASK_PHONE: &str = "👤 تم تسجيل الاسم.\n\nالآن، يرجى إدخال *رقم هاتف* الزبون:";
pub const ASK_WILAYA: &str = "📞 تم تسجيل رقم الهاتف.\n\nالآن، يرجى إدخال *الولاية والبلدية*:";
pub const ASK_ADDRESS: &str = "📍 تم تسجيل الولاية/البلدية.\n\nالآن، أدخل *العنوان الكامل* للتوصيل (اختياري).";
pub const ASK_AMOUNT: &str = "🏠 تم تسجيل العنوان.\n\nالآن، يرجى إدخال *المبلغ الإجمالي* للطلب (بالأرقام فقط):";
pub const ASK_NOTES: &str = "💰 تم تسجيل المبلغ.\n\nهل لديك أي *ملاحظات* إضافية؟ (اختياري)";
pub const INVALID_PHONE: &str = "⚠️ رقم الهاتف غير صالح. يرجى المحاولة مرة أخرى:";
pub const INVALID_AMOUNT: &str = "⚠️ المبلغ غير صالح. يرجى إدخال أرقام فقط:";
pub const TOO_MANY_PHOTOS: &str = "⚠️ يُسمح بحد أقصى 10 صور لكل طلب. يرجى إعادة المحاولة.";
pub const NO_PHOTOS: &str = "⚠️ يجب إرسال صورة واحدة على الأقل.";

// Main menu buttons
pub const NEW_ORDER: &str = "🆕 طلب جديد";
pub const MY_ORDERS: &str = "📦 عرض الطلبات";
pub const STATISTICS: &str = "📊 إحصائيات البلدان";
pub const HELP: &str = "ℹ️ مساعدة";

// Wizard navigation buttons
pub const BACK: &str = "⬅️ رجوع";
pub const CANCEL: &str = "❌ إلغاء";
pub const SKIP: &str = "⏩ تخطي";
pub const CONFIRM: &str = "✅ تأكيد الطلب";
pub const EDIT_NAME: &str = "✏️ تعديل الاسم";
pub const EDIT_PHONE: &str = "✏️ تعديل الهاتف";
pub const EDIT_WILAYA: &str = "✏️ تعديل الولاية";
pub const EDIT_ADDRESS: &str = "✏️ تعديل العنوان";
pub const EDIT_AMOUNT: &str = "✏️ تعديل المبلغ";
pub const EDIT_NOTES: &str = "✏️ تعديل الملاحظات";

// Channel control buttons
pub const STATUS_PREPARED: &str = "✅ تم التجهيز";
pub const STATUS_SHIPPED: &str = "🚚 تم الإرسال";
pub const STATUS_DELIVERED: &str = "📦 تم التسليم";
pub const STATUS_CANCELED: &str = "❌ إلغاء الطلبية";

pub const ORDER_CANCELED: &str = "تم إلغاء الطلب.";
pub const ORDER_CONFIRMED: &str = "✅ تم إنشاء الطلب بنجاح!";
pub const PROCESSING_ORDER: &str = "⏳ جارٍ تأكيد الطلب وتحميل الصور...";
pub const ALREADY_PROCESSING: &str = "الطلب قيد المعالجة بالفعل...";
pub const SUBMIT_FAILED_RETRY: &str =
    "⚠️ حدث خطأ أثناء تأكيد الطلب. يرجى مراجعة البيانات والمحاولة مرة أخرى بالضغط على زر التأكيد مجدداً.";
pub const REVIEW_QUESTION: &str = "هل تريد تأكيد هذا الطلب؟";
pub const WIZARD_ALREADY_ACTIVE: &str = "أنت بالفعل في عملية إنشاء طلب. يرجى إكمالها أو إلغاؤها أولاً.";
pub const NOT_AUTHORIZED: &str = "ليس لديك الصلاحية لاستخدام هذه الميزة.";
pub const HELP_TEXT: &str = "لإنشاء طلب جديد، اضغط على زر \"🆕 طلب جديد\" في الأسفل. لإلغاء الطلب أثناء إدخاله، استخدم زر \"❌ إلغاء\" الموجود أسفل الرسالة.";
