//! Schema routing tests using teloxide_tests
//!
//! These drive the real dispatcher tree with a mock bot and assert on the
//! messages the bot sends back.
//!
//! Run with: cargo test --test schema_routing_test

use serial_test::serial;
use std::sync::Arc;
use tempfile::NamedTempFile;
use teloxide_tests::{MockBot, MockMessageText};

use async_trait::async_trait;
use tawsilabot::core::error::AppResult;
use tawsilabot::hosting::{HostedPhoto, PhotoHost};
use tawsilabot::storage::orders::OrderStore;
use tawsilabot::storage::{create_pool, SqliteOrderStore};
use tawsilabot::telegram::wizard::media_group::MediaGroupAggregator;
use tawsilabot::telegram::wizard::session::SessionStore;
use tawsilabot::telegram::{schema, texts, HandlerDeps};

struct NoopPhotoHost;

#[async_trait]
impl PhotoHost for NoopPhotoHost {
    async fn upload(&self, _source_url: &str, folder: &str) -> AppResult<HostedPhoto> {
        Ok(HostedPhoto {
            secure_url: format!("https://cdn.test/{folder}/photo.jpg"),
            public_id: format!("{folder}/photo"),
        })
    }
}

fn test_deps() -> (HandlerDeps, NamedTempFile) {
    let db_file = NamedTempFile::new().expect("Failed to create temp db");
    let pool = Arc::new(create_pool(db_file.path().to_str().unwrap()).expect("Failed to create pool"));
    let store: Arc<dyn OrderStore> = Arc::new(SqliteOrderStore::new(pool));

    let deps = HandlerDeps::new(
        Arc::new(SessionStore::new()),
        Arc::new(MediaGroupAggregator::new(std::time::Duration::from_millis(600))),
        store,
        Arc::new(NoopPhotoHost),
    );
    (deps, db_file)
}

#[tokio::test]
#[serial]
async fn test_start_command_sends_welcome_with_menu() {
    let (deps, _db) = test_deps();
    let message = MockMessageText::new().text("/start");
    let mut bot = MockBot::new(message, schema(deps));

    bot.dispatch().await;

    let responses = bot.get_responses();
    let sent = &responses.sent_messages;
    assert_eq!(sent.len(), 1, "Should send exactly one message");
    assert_eq!(sent[0].text(), Some(texts::WELCOME));
}

#[tokio::test]
#[serial]
async fn test_neworder_command_starts_wizard() {
    let (deps, _db) = test_deps();
    let message = MockMessageText::new().text("/neworder");
    let mut bot = MockBot::new(message, schema(deps.clone()));

    bot.dispatch().await;

    let responses = bot.get_responses();
    let sent = &responses.sent_messages;
    assert_eq!(sent.len(), 1);
    let text = sent[0].text().expect("Message should have text");
    assert!(text.contains("صور المنتج"), "Should ask for product photos");
    assert!(sent[0].reply_markup().is_some(), "Prompt should carry the nav keyboard");
}

#[tokio::test]
#[serial]
async fn test_second_neworder_is_refused_while_wizard_active() {
    let (deps, _db) = test_deps();
    let messages = vec![
        MockMessageText::new().text("/neworder"),
        MockMessageText::new().text("/neworder"),
    ];
    let mut bot = MockBot::new(messages, schema(deps));

    bot.dispatch().await;

    let responses = bot.get_responses();
    let texts_sent: Vec<_> = responses.sent_messages.iter().filter_map(|m| m.text()).collect();
    assert!(
        texts_sent.iter().any(|t| t.contains("صور المنتج")),
        "First /neworder should start the wizard"
    );
    assert!(
        texts_sent.iter().any(|t| *t == texts::WIZARD_ALREADY_ACTIVE),
        "Second /neworder should be refused while one is active"
    );
}

#[tokio::test]
#[serial]
async fn test_help_menu_button_replies_with_help() {
    let (deps, _db) = test_deps();
    let message = MockMessageText::new().text(texts::HELP);
    let mut bot = MockBot::new(message, schema(deps));

    bot.dispatch().await;

    let responses = bot.get_responses();
    assert_eq!(responses.sent_messages.len(), 1);
    assert_eq!(responses.sent_messages[0].text(), Some(texts::HELP_TEXT));
}

#[tokio::test]
#[serial]
async fn test_stray_text_without_session_is_ignored() {
    let (deps, _db) = test_deps();
    let message = MockMessageText::new().text("مرحبا");
    let mut bot = MockBot::new(message, schema(deps));

    bot.dispatch().await;

    let responses = bot.get_responses();
    assert!(responses.sent_messages.is_empty(), "No wizard, no reply");
}
