//! Integration tests for the order wizard using a mocked Telegram API
//!
//! These tests execute the real wizard handlers against a wiremock server
//! standing in for the Bot API, a temp-file SQLite store and a mock photo
//! host.
//!
//! Run with: cargo test --test wizard_flow_test

use async_trait::async_trait;
use serial_test::serial;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::NamedTempFile;
use teloxide::prelude::*;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tawsilabot::core::error::{AppError, AppResult};
use tawsilabot::hosting::{HostedPhoto, PhotoHost};
use tawsilabot::storage::orders::{
    NewOrder, OrderRecord, OrderStatus, OrderStore, PaymentRecord, WilayaStats,
};
use tawsilabot::storage::{create_pool, SqliteOrderStore};
use tawsilabot::telegram::wizard::media_group::MediaGroupAggregator;
use tawsilabot::telegram::wizard::session::{SessionStore, Step, WizardMode};
use tawsilabot::telegram::wizard::{self, ConfirmOutcome, EditField};
use tawsilabot::telegram::HandlerDeps;

const USER: UserId = UserId(123456789);
const CHAT: ChatId = ChatId(123456789);

/// Photo host stub returning deterministic CDN records.
struct MockPhotoHost;

#[async_trait]
impl PhotoHost for MockPhotoHost {
    async fn upload(&self, _source_url: &str, folder: &str) -> AppResult<HostedPhoto> {
        Ok(HostedPhoto {
            secure_url: format!("https://cdn.test/{folder}/photo.jpg"),
            public_id: format!("{folder}/photo"),
        })
    }
}

/// Store wrapper whose `create_order` can be made to fail, for exercising
/// the submission-failure recovery path.
struct FlakyStore {
    inner: SqliteOrderStore,
    fail_create: AtomicBool,
}

#[async_trait]
impl OrderStore for FlakyStore {
    async fn generate_next_order_id(&self) -> AppResult<String> {
        self.inner.generate_next_order_id().await
    }
    async fn create_order(&self, order: NewOrder) -> AppResult<()> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(AppError::Hosting("simulated persistence outage".to_string()));
        }
        self.inner.create_order(order).await
    }
    async fn fetch_all_orders(&self) -> AppResult<Vec<OrderRecord>> {
        self.inner.fetch_all_orders().await
    }
    async fn fetch_order(&self, order_id: &str) -> AppResult<Option<OrderRecord>> {
        self.inner.fetch_order(order_id).await
    }
    async fn order_status(&self, order_id: &str) -> AppResult<Option<OrderStatus>> {
        self.inner.order_status(order_id).await
    }
    async fn update_order_status(&self, order_id: &str, status: OrderStatus) -> AppResult<()> {
        self.inner.update_order_status(order_id, status).await
    }
    async fn delete_order(&self, order_id: &str) -> AppResult<()> {
        self.inner.delete_order(order_id).await
    }
    async fn orders_by_wilaya(&self, wilaya: &str) -> AppResult<Vec<OrderRecord>> {
        self.inner.orders_by_wilaya(wilaya).await
    }
    async fn orders_by_wilaya_and_status(&self, wilaya: &str, status: OrderStatus) -> AppResult<Vec<OrderRecord>> {
        self.inner.orders_by_wilaya_and_status(wilaya, status).await
    }
    async fn wilaya_statistics(&self, wilaya: &str) -> AppResult<WilayaStats> {
        self.inner.wilaya_statistics(wilaya).await
    }
    async fn record_payment(&self, wilaya: &str, amount: f64, notes: Option<String>) -> AppResult<PaymentRecord> {
        self.inner.record_payment(wilaya, amount, notes).await
    }
    async fn total_received(&self, wilaya: &str) -> AppResult<f64> {
        self.inner.total_received(wilaya).await
    }
    async fn payment_history(&self, wilaya: &str) -> AppResult<Vec<PaymentRecord>> {
        self.inner.payment_history(wilaya).await
    }
    async fn payment(&self, payment_id: &str) -> AppResult<Option<PaymentRecord>> {
        self.inner.payment(payment_id).await
    }
    async fn update_payment(&self, payment_id: &str, amount: f64) -> AppResult<()> {
        self.inner.update_payment(payment_id, amount).await
    }
    async fn delete_payment(&self, payment_id: &str) -> AppResult<()> {
        self.inner.delete_payment(payment_id).await
    }
}

/// Test harness: mock Telegram API + real deps.
struct WizardTest {
    _mock_server: MockServer,
    bot: Bot,
    deps: HandlerDeps,
    store: Arc<FlakyStore>,
    _db_file: NamedTempFile,
}

impl WizardTest {
    async fn new() -> Self {
        // The channel id is read lazily once per process; every harness
        // sets the same value so test order does not matter.
        std::env::set_var("TELEGRAM_CHANNEL_ID", "-1001234567890");

        let mock_server = MockServer::start().await;
        mock_all_telegram_api(&mock_server).await;

        let bot = Bot::new("test_token_12345:ABCDEF").set_api_url(mock_server.uri().parse().unwrap());

        let db_file = NamedTempFile::new().expect("Failed to create temp db");
        let pool = Arc::new(create_pool(db_file.path().to_str().unwrap()).expect("Failed to create pool"));
        let store = Arc::new(FlakyStore {
            inner: SqliteOrderStore::new(pool),
            fail_create: AtomicBool::new(false),
        });

        let deps = HandlerDeps::new(
            Arc::new(SessionStore::new()),
            Arc::new(MediaGroupAggregator::new(std::time::Duration::from_millis(600))),
            Arc::clone(&store) as Arc<dyn OrderStore>,
            Arc::new(MockPhotoHost),
        );

        Self {
            _mock_server: mock_server,
            bot,
            deps,
            store,
            _db_file: db_file,
        }
    }

    fn step(&self) -> Option<Step> {
        self.deps.sessions.get(USER).map(|s| s.step)
    }

    /// Drives a fresh wizard to the review screen with known-good data.
    async fn drive_to_review(&self) {
        wizard::start_wizard(&self.bot, &self.deps, CHAT, USER).await.unwrap();
        wizard::finalize_photo_batch(
            &self.bot,
            &self.deps,
            CHAT,
            USER,
            vec!["photo-a".to_string(), "photo-b".to_string()],
        )
        .await
        .unwrap();
        wizard::handle_text(&self.bot, &self.deps, CHAT, USER, "محمد العربي").await.unwrap();
        wizard::handle_text(&self.bot, &self.deps, CHAT, USER, "0661234567").await.unwrap();
        wizard::handle_wilaya_selected(&self.bot, &self.deps, CHAT, USER, "رقان").await.unwrap();
        wizard::handle_text(&self.bot, &self.deps, CHAT, USER, "حي النصر، شارع 12").await.unwrap();
        wizard::handle_text(&self.bot, &self.deps, CHAT, USER, "4500").await.unwrap();
        wizard::handle_text(&self.bot, &self.deps, CHAT, USER, "التوصيل مساءً").await.unwrap();
        assert_eq!(self.step(), Some(Step::Reviewing));
    }
}

fn message_json(message_id: u64) -> serde_json::Value {
    serde_json::json!({
        "message_id": message_id,
        "from": { "id": 987654321, "is_bot": true, "first_name": "TestBot", "username": "test_bot" },
        "chat": { "id": 123456789, "first_name": "Test", "type": "private" },
        "date": 1735992000,
        "text": "ok"
    })
}

/// Mounts catch-all mocks for every API method the wizard touches.
async fn mock_all_telegram_api(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path_regex("/bot[^/]+/sendMessage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ok": true, "result": message_json(42)
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path_regex("/bot[^/]+/editMessageText"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ok": true, "result": message_json(42)
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path_regex("/bot[^/]+/deleteMessage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true, "result": true })))
        .mount(server)
        .await;

    let media_message = |id: u64| {
        serde_json::json!({
            "message_id": id,
            "from": { "id": 987654321, "is_bot": true, "first_name": "TestBot" },
            "chat": { "id": 123456789, "first_name": "Test", "type": "private" },
            "date": 1735992000,
            "photo": [{ "file_id": "srv-photo", "file_unique_id": "srv-unique", "width": 90, "height": 90 }]
        })
    };
    Mock::given(method("POST"))
        .and(path_regex("/bot[^/]+/sendMediaGroup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ok": true, "result": [media_message(100), media_message(101)]
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path_regex("/bot[^/]+/sendPhoto"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ok": true, "result": media_message(102)
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path_regex("/bot[^/]+/getFile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ok": true,
            "result": {
                "file_id": "photo-a",
                "file_unique_id": "unique-a",
                "file_size": 1024,
                "file_path": "photos/photo-a.jpg"
            }
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path_regex("/bot[^/]+/answerCallbackQuery"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true, "result": true })))
        .mount(server)
        .await;
}

// ==================== Linear progression ====================

#[tokio::test]
#[serial]
async fn test_linear_progression_reaches_review_with_all_fields() {
    let test = WizardTest::new().await;
    test.drive_to_review().await;

    let session = test.deps.sessions.get(USER).unwrap();
    assert_eq!(session.step, Step::Reviewing);
    assert_eq!(session.photo_file_ids, vec!["photo-a".to_string(), "photo-b".to_string()]);
    assert_eq!(session.customer_name.as_deref(), Some("محمد العربي"));
    assert_eq!(session.phone.as_deref(), Some("0661234567"));
    assert_eq!(session.wilaya.as_deref(), Some("رقان"));
    assert_eq!(session.address.as_deref(), Some("حي النصر، شارع 12"));
    assert_eq!(session.amount_total, Some(4500.0));
    assert_eq!(session.notes.as_deref(), Some("التوصيل مساءً"));
    assert_eq!(session.mode, WizardMode::Forward);
}

// ==================== Photo batches ====================

#[tokio::test]
#[serial]
async fn test_photo_batch_cap_and_dedup() {
    let test = WizardTest::new().await;
    wizard::start_wizard(&test.bot, &test.deps, CHAT, USER).await.unwrap();

    // Empty batch: rejected, step unchanged
    wizard::finalize_photo_batch(&test.bot, &test.deps, CHAT, USER, vec![]).await.unwrap();
    assert_eq!(test.step(), Some(Step::AwaitingPhotos));

    // 11 unique photos: rejected, nothing kept
    let eleven: Vec<String> = (0..11).map(|i| format!("photo-{i}")).collect();
    wizard::finalize_photo_batch(&test.bot, &test.deps, CHAT, USER, eleven).await.unwrap();
    let session = test.deps.sessions.get(USER).unwrap();
    assert_eq!(session.step, Step::AwaitingPhotos);
    assert!(session.photo_file_ids.is_empty());

    // Duplicates collapse to first-seen order and the batch is accepted
    wizard::finalize_photo_batch(
        &test.bot,
        &test.deps,
        CHAT,
        USER,
        vec!["a".to_string(), "b".to_string(), "a".to_string()],
    )
    .await
    .unwrap();
    let session = test.deps.sessions.get(USER).unwrap();
    assert_eq!(session.step, Step::AwaitingCustomerName);
    assert_eq!(session.photo_file_ids, vec!["a".to_string(), "b".to_string()]);
}

#[tokio::test]
#[serial]
async fn test_ten_photos_accepted() {
    let test = WizardTest::new().await;
    wizard::start_wizard(&test.bot, &test.deps, CHAT, USER).await.unwrap();

    let ten: Vec<String> = (0..10).map(|i| format!("photo-{i}")).collect();
    wizard::finalize_photo_batch(&test.bot, &test.deps, CHAT, USER, ten).await.unwrap();
    let session = test.deps.sessions.get(USER).unwrap();
    assert_eq!(session.step, Step::AwaitingCustomerName);
    assert_eq!(session.photo_file_ids.len(), 10);
}

// ==================== Validation ====================

#[tokio::test]
#[serial]
async fn test_invalid_phone_keeps_step_and_field() {
    let test = WizardTest::new().await;
    wizard::start_wizard(&test.bot, &test.deps, CHAT, USER).await.unwrap();
    wizard::finalize_photo_batch(&test.bot, &test.deps, CHAT, USER, vec!["p".to_string()]).await.unwrap();
    wizard::handle_text(&test.bot, &test.deps, CHAT, USER, "أحمد").await.unwrap();
    assert_eq!(test.step(), Some(Step::AwaitingPhone));

    wizard::handle_text(&test.bot, &test.deps, CHAT, USER, "notaphone").await.unwrap();
    let session = test.deps.sessions.get(USER).unwrap();
    assert_eq!(session.step, Step::AwaitingPhone);
    assert_eq!(session.phone, None);

    wizard::handle_text(&test.bot, &test.deps, CHAT, USER, "0691234567").await.unwrap();
    let session = test.deps.sessions.get(USER).unwrap();
    assert_eq!(session.step, Step::AwaitingWilaya);
    assert_eq!(session.phone.as_deref(), Some("0691234567"));
}

#[tokio::test]
#[serial]
async fn test_invalid_amount_keeps_step() {
    let test = WizardTest::new().await;
    wizard::start_wizard(&test.bot, &test.deps, CHAT, USER).await.unwrap();
    wizard::finalize_photo_batch(&test.bot, &test.deps, CHAT, USER, vec!["p".to_string()]).await.unwrap();
    wizard::handle_text(&test.bot, &test.deps, CHAT, USER, "أحمد").await.unwrap();
    wizard::handle_text(&test.bot, &test.deps, CHAT, USER, "0661234567").await.unwrap();
    wizard::handle_wilaya_selected(&test.bot, &test.deps, CHAT, USER, "أدرار").await.unwrap();
    wizard::handle_skip(&test.bot, &test.deps, CHAT, USER).await.unwrap(); // skip address
    assert_eq!(test.step(), Some(Step::AwaitingAmount));

    wizard::handle_text(&test.bot, &test.deps, CHAT, USER, "abc").await.unwrap();
    let session = test.deps.sessions.get(USER).unwrap();
    assert_eq!(session.step, Step::AwaitingAmount);
    assert_eq!(session.amount_total, None);
    assert_eq!(session.address, None); // skip cleared it
}

// ==================== Back navigation ====================

#[tokio::test]
#[serial]
async fn test_back_then_resubmit_reaches_same_step() {
    let test = WizardTest::new().await;
    wizard::start_wizard(&test.bot, &test.deps, CHAT, USER).await.unwrap();
    wizard::finalize_photo_batch(&test.bot, &test.deps, CHAT, USER, vec!["p".to_string()]).await.unwrap();
    wizard::handle_text(&test.bot, &test.deps, CHAT, USER, "أحمد").await.unwrap();
    assert_eq!(test.step(), Some(Step::AwaitingPhone));

    wizard::handle_back(&test.bot, &test.deps, CHAT, USER).await.unwrap();
    assert_eq!(test.step(), Some(Step::AwaitingCustomerName));

    wizard::handle_text(&test.bot, &test.deps, CHAT, USER, "أحمد").await.unwrap();
    let session = test.deps.sessions.get(USER).unwrap();
    assert_eq!(session.step, Step::AwaitingPhone);
    assert_eq!(session.customer_name.as_deref(), Some("أحمد"));
    // Photos survived the round trip
    assert_eq!(session.photo_file_ids, vec!["p".to_string()]);
}

#[tokio::test]
#[serial]
async fn test_back_from_review_returns_to_notes_and_back_is_noop_at_photos() {
    let test = WizardTest::new().await;
    test.drive_to_review().await;

    wizard::handle_back(&test.bot, &test.deps, CHAT, USER).await.unwrap();
    assert_eq!(test.step(), Some(Step::AwaitingNotes));

    // Walk all the way down; back at the first step is a no-op
    for _ in 0..10 {
        wizard::handle_back(&test.bot, &test.deps, CHAT, USER).await.unwrap();
    }
    assert_eq!(test.step(), Some(Step::AwaitingPhotos));
}

// ==================== Edit shortcuts ====================

#[tokio::test]
#[serial]
async fn test_edit_field_returns_to_review_with_others_unchanged() {
    let test = WizardTest::new().await;
    test.drive_to_review().await;

    wizard::handle_edit(&test.bot, &test.deps, CHAT, USER, EditField::Amount).await.unwrap();
    let session = test.deps.sessions.get(USER).unwrap();
    assert_eq!(session.step, Step::AwaitingAmount);
    assert_eq!(session.mode, WizardMode::EditingFrom(Step::Reviewing));

    wizard::handle_text(&test.bot, &test.deps, CHAT, USER, "9900").await.unwrap();
    let session = test.deps.sessions.get(USER).unwrap();
    assert_eq!(session.step, Step::Reviewing);
    assert_eq!(session.mode, WizardMode::Forward);
    assert_eq!(session.amount_total, Some(9900.0));
    // Everything else untouched
    assert_eq!(session.customer_name.as_deref(), Some("محمد العربي"));
    assert_eq!(session.phone.as_deref(), Some("0661234567"));
    assert_eq!(session.wilaya.as_deref(), Some("رقان"));
    assert_eq!(session.notes.as_deref(), Some("التوصيل مساءً"));
}

#[tokio::test]
#[serial]
async fn test_invalid_input_while_editing_stays_in_edit_mode() {
    let test = WizardTest::new().await;
    test.drive_to_review().await;

    wizard::handle_edit(&test.bot, &test.deps, CHAT, USER, EditField::Phone).await.unwrap();
    wizard::handle_text(&test.bot, &test.deps, CHAT, USER, "nope").await.unwrap();

    let session = test.deps.sessions.get(USER).unwrap();
    assert_eq!(session.step, Step::AwaitingPhone);
    assert_eq!(session.mode, WizardMode::EditingFrom(Step::Reviewing));
    assert_eq!(session.phone.as_deref(), Some("0661234567")); // old value kept
}

// ==================== Submission ====================

#[tokio::test]
#[serial]
async fn test_successful_submission_creates_order_and_destroys_session() {
    let test = WizardTest::new().await;
    test.drive_to_review().await;

    let outcome = wizard::handle_confirm(&test.bot, &test.deps, CHAT, USER).await.unwrap();
    assert_eq!(outcome, ConfirmOutcome::Submitted);
    assert!(test.deps.sessions.get(USER).is_none());

    let orders = test.store.fetch_all_orders().await.unwrap();
    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    assert_eq!(order.status, OrderStatus::Preparing);
    assert_eq!(order.wilaya.as_deref(), Some("رقان"));
    assert_eq!(order.amount_total, Some(4500.0));
    // Photo links are the hosted URLs, one per unique photo
    assert_eq!(order.photo_links.len(), 2);
    assert!(order.photo_links[0].starts_with("https://cdn.test/orders/"));
    assert!(order.order_id.ends_with("-001"));
}

// ==================== Duplicate confirm ====================

#[tokio::test]
#[serial]
async fn test_confirm_while_submitting_is_rejected() {
    let test = WizardTest::new().await;
    test.drive_to_review().await;

    // Simulate a first confirm still in flight
    let mut session = test.deps.sessions.get(USER).unwrap();
    session.step = Step::Submitting;
    test.deps.sessions.set(USER, session);

    let outcome = wizard::handle_confirm(&test.bot, &test.deps, CHAT, USER).await.unwrap();
    assert_eq!(outcome, ConfirmOutcome::AlreadyProcessing);

    // The rejected tap created nothing
    assert!(test.store.fetch_all_orders().await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn test_two_sequential_confirms_create_exactly_one_order() {
    let test = WizardTest::new().await;
    test.drive_to_review().await;

    let first = wizard::handle_confirm(&test.bot, &test.deps, CHAT, USER).await.unwrap();
    assert_eq!(first, ConfirmOutcome::Submitted);

    let second = wizard::handle_confirm(&test.bot, &test.deps, CHAT, USER).await.unwrap();
    assert_eq!(second, ConfirmOutcome::NoSession);

    assert_eq!(test.store.fetch_all_orders().await.unwrap().len(), 1);
}

// ==================== Failure recovery ====================

#[tokio::test]
#[serial]
async fn test_persistence_failure_reverts_to_review_and_retry_succeeds() {
    let test = WizardTest::new().await;
    test.drive_to_review().await;

    test.store.fail_create.store(true, Ordering::SeqCst);
    let outcome = wizard::handle_confirm(&test.bot, &test.deps, CHAT, USER).await.unwrap();
    assert_eq!(outcome, ConfirmOutcome::Failed);

    // Back on the review screen, with the successful upload retained
    let session = test.deps.sessions.get(USER).unwrap();
    assert_eq!(session.step, Step::Reviewing);
    assert_eq!(session.uploaded_photos.len(), 2);
    assert!(test.store.fetch_all_orders().await.unwrap().is_empty());

    // Retry re-runs the full sequence and succeeds
    test.store.fail_create.store(false, Ordering::SeqCst);
    let outcome = wizard::handle_confirm(&test.bot, &test.deps, CHAT, USER).await.unwrap();
    assert_eq!(outcome, ConfirmOutcome::Submitted);
    assert_eq!(test.store.fetch_all_orders().await.unwrap().len(), 1);
    assert!(test.deps.sessions.get(USER).is_none());
}

// ==================== Cancel ====================

#[tokio::test]
#[serial]
async fn test_cancel_destroys_session_and_later_events_are_noops() {
    let test = WizardTest::new().await;
    wizard::start_wizard(&test.bot, &test.deps, CHAT, USER).await.unwrap();
    wizard::finalize_photo_batch(&test.bot, &test.deps, CHAT, USER, vec!["p".to_string()]).await.unwrap();

    wizard::handle_cancel(&test.bot, &test.deps, CHAT, USER).await.unwrap();
    assert!(test.deps.sessions.get(USER).is_none());

    // Text after cancel is silently ignored
    wizard::handle_text(&test.bot, &test.deps, CHAT, USER, "أحمد").await.unwrap();
    assert!(test.deps.sessions.get(USER).is_none());
}

// ==================== Album scenario ====================

#[tokio::test]
#[serial]
async fn test_album_of_two_photos_delivered_as_one_batch() {
    let test = WizardTest::new().await;
    wizard::start_wizard(&test.bot, &test.deps, CHAT, USER).await.unwrap();

    for file_id in ["alb-1", "alb-2"] {
        let bot = test.bot.clone();
        let deps = test.deps.clone();
        test.deps
            .media_groups
            .push("album-77".to_string(), file_id.to_string(), move |batch| async move {
                let _ = wizard::finalize_photo_batch(&bot, &deps, CHAT, USER, batch).await;
            });
    }

    // Still buffering inside the debounce window
    assert_eq!(test.step(), Some(Step::AwaitingPhotos));

    tokio::time::sleep(std::time::Duration::from_millis(900)).await;

    let session = test.deps.sessions.get(USER).unwrap();
    assert_eq!(session.step, Step::AwaitingCustomerName);
    assert_eq!(session.photo_file_ids, vec!["alb-1".to_string(), "alb-2".to_string()]);
}
