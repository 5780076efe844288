//! Dispatcher schema and handler chain builders

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use super::callbacks::handle_callback;
use super::types::{HandlerDeps, HandlerError};
use crate::telegram::bot::Command;
use crate::telegram::wizard::session::Step;
use crate::telegram::{menu, orders, stats, texts, wizard};

/// Creates the main dispatcher schema for the Telegram bot.
///
/// This function returns a handler tree that can be used with teloxide's
/// Dispatcher. The same schema is used in production and in integration
/// tests.
///
/// # Arguments
/// * `deps` - Handler dependencies (session store, media-group
///   aggregator, order store, photo host)
///
/// # Returns
/// The complete handler tree for the bot
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_commands = deps.clone();
    let deps_menu_text = deps.clone();
    let deps_photos = deps.clone();
    let deps_text = deps.clone();
    let deps_callback = deps;

    dptree::entry()
        // Commands
        .branch(command_handler(deps_commands))
        // Order photos (albums and singles)
        .branch(photo_handler(deps_photos))
        // Main-menu reply-keyboard buttons (plain text matches)
        .branch(menu_text_handler(deps_menu_text))
        // Free text routed into the wizard / payment steps
        .branch(text_handler(deps_text))
        // Callback query handler
        .branch(callback_handler(deps_callback))
}

/// Handler for bot commands (/start, /neworder, /help)
fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                log::info!("Received command: {:?} from chat {}", cmd, msg.chat.id);
                let chat = msg.chat.id;

                match cmd {
                    Command::Start => {
                        bot.send_message(chat, texts::WELCOME)
                            .reply_markup(menu::main_menu_keyboard())
                            .await?;
                    }
                    Command::NewOrder => {
                        let Some(user) = msg.from.as_ref().map(|u| u.id) else {
                            return Ok(());
                        };
                        if deps.sessions.contains(user) {
                            bot.send_message(chat, texts::WIZARD_ALREADY_ACTIVE).await?;
                        } else if let Err(e) = wizard::start_wizard(&bot, &deps, chat, user).await {
                            log::error!("Failed to start wizard for user {}: {}", user, e);
                        }
                    }
                    Command::Help => {
                        bot.send_message(chat, texts::HELP_TEXT).await?;
                    }
                }
                Ok(())
            }
        },
    ))
}

/// Handler for the persistent main-menu buttons, which arrive as plain
/// text equal to the button label.
fn menu_text_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| {
            msg.text()
                .map(|text| {
                    matches!(
                        text,
                        texts::NEW_ORDER | texts::MY_ORDERS | texts::STATISTICS | texts::HELP
                    )
                })
                .unwrap_or(false)
        })
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                let Some(user) = msg.from.as_ref().map(|u| u.id) else {
                    return Ok(());
                };
                let chat = msg.chat.id;

                match msg.text() {
                    Some(texts::NEW_ORDER) => {
                        if deps.sessions.contains(user) {
                            bot.send_message(chat, texts::WIZARD_ALREADY_ACTIVE).await?;
                        } else if let Err(e) = wizard::start_wizard(&bot, &deps, chat, user).await {
                            log::error!("Failed to start wizard for user {}: {}", user, e);
                        }
                    }
                    Some(texts::MY_ORDERS) => {
                        if let Err(e) = orders::handle_my_orders(&bot, &deps, chat, user.0).await {
                            log::error!("Failed to list orders: {}", e);
                            bot.send_message(chat, "حدث خطأ أثناء جلب الطلبات. يرجى المحاولة مرة أخرى.").await?;
                        }
                    }
                    Some(texts::STATISTICS) => {
                        if let Err(e) = stats::show_statistics_menu(&bot, chat, user.0).await {
                            log::error!("Failed to show statistics menu: {}", e);
                        }
                    }
                    Some(texts::HELP) => {
                        bot.send_message(chat, texts::HELP_TEXT).await?;
                    }
                    _ => {}
                }
                Ok(())
            }
        })
}

/// Handler for incoming photos.
///
/// Album photos are buffered by the media-group aggregator and delivered
/// as one batch after the debounce window; single photos go straight to
/// the wizard as a one-element batch.
fn photo_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.photo().is_some())
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                let Some(user) = msg.from.as_ref().map(|u| u.id) else {
                    return Ok(());
                };
                let chat = msg.chat.id;

                // Buffering is pointless unless this user is collecting
                // photos; the aggregator callback re-validates anyway.
                let awaiting = deps
                    .sessions
                    .get(user)
                    .map(|session| session.step == Step::AwaitingPhotos)
                    .unwrap_or(false);
                if !awaiting {
                    return Ok(());
                }

                let Some(largest) = msg.photo().and_then(|photos| photos.last()) else {
                    return Ok(());
                };
                let file_id = largest.file.id.0.clone();

                match msg.media_group_id() {
                    Some(album_id) => {
                        let album_id = album_id.0.clone();
                        let bot = bot.clone();
                        let deps_inner = deps.clone();
                        deps.media_groups.push(album_id, file_id, move |batch| async move {
                            if let Err(e) = wizard::finalize_photo_batch(&bot, &deps_inner, chat, user, batch).await {
                                log::error!("Failed to finalize media group for user {}: {}", user, e);
                            }
                        });
                    }
                    None => {
                        if let Err(e) = wizard::finalize_photo_batch(&bot, &deps, chat, user, vec![file_id]).await {
                            log::error!("Failed to handle photo for user {}: {}", user, e);
                        }
                    }
                }
                Ok(())
            }
        })
}

/// Handler for free text: wizard field input or payment amounts,
/// depending on the session step.
fn text_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.text().is_some())
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                let Some(user) = msg.from.as_ref().map(|u| u.id) else {
                    return Ok(());
                };
                let Some(text) = msg.text() else {
                    return Ok(());
                };
                let chat = msg.chat.id;

                let step = deps.sessions.get(user).map(|session| session.step);
                let result = match step {
                    Some(Step::AwaitingPaymentAmount) => {
                        stats::handle_payment_amount_input(&bot, &deps, chat, user, text).await
                    }
                    Some(Step::AwaitingPaymentEdit) => {
                        stats::handle_payment_edit_input(&bot, &deps, chat, user, text).await
                    }
                    Some(_) => wizard::handle_text(&bot, &deps, chat, user, text).await,
                    // No active wizard: a deliberate no-op
                    None => Ok(()),
                };

                if let Err(e) = result {
                    log::error!("Error handling text from user {}: {}", user, e);
                }
                Ok(())
            }
        })
}

/// Handler for callback queries (inline keyboard buttons)
fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move {
            handle_callback(bot, q, deps).await;
            Ok(())
        }
    })
}
