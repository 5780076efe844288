//! Order wizard state machine
//!
//! Owns the per-user dialogue that collects an order: photos → name →
//! phone → wilaya → address → amount → notes → review → submit. Every
//! handler re-fetches the session from the store at entry and writes the
//! mutated copy back before returning, so nothing holds state across the
//! awaits in between.
//!
//! Prompt discipline: there is at most one live wizard message per user,
//! edited in place across steps; when the edit fails (stale or deleted
//! message) a fresh message is sent and adopted. Prompt display is
//! best-effort relative to forward progress — those failures are logged,
//! never propagated.

pub mod media_group;
pub mod session;
pub mod submit;

use teloxide::prelude::*;
use teloxide::types::{FileId, InlineKeyboardMarkup, InputFile, InputMedia, InputMediaPhoto, MessageId, ParseMode, ReplyMarkup};

use crate::core::config;
use crate::core::error::AppResult;
use crate::core::validation;
use crate::telegram::handlers::types::HandlerDeps;
use crate::telegram::menu;
use crate::telegram::texts;

use self::media_group::dedup_preserving_order;
use self::session::{Session, Step, SubmitGate, WizardMode};
use self::submit::submit_order;

/// Review-screen fields reachable through an edit shortcut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    Name,
    Phone,
    Wilaya,
    Address,
    Amount,
    Notes,
}

impl EditField {
    /// Parses the `order:edit:<field>` callback suffix.
    pub fn from_callback(raw: &str) -> Option<Self> {
        match raw {
            "name" => Some(Self::Name),
            "phone" => Some(Self::Phone),
            "wilaya" => Some(Self::Wilaya),
            "address" => Some(Self::Address),
            "amount" => Some(Self::Amount),
            "notes" => Some(Self::Notes),
            _ => None,
        }
    }

    fn step(self) -> Step {
        match self {
            Self::Name => Step::AwaitingCustomerName,
            Self::Phone => Step::AwaitingPhone,
            Self::Wilaya => Step::AwaitingWilaya,
            Self::Address => Step::AwaitingAddress,
            Self::Amount => Step::AwaitingAmount,
            Self::Notes => Step::AwaitingNotes,
        }
    }
}

/// What a confirm attempt turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// Order created, session destroyed
    Submitted,
    /// Submission failed, session reverted to review for a retry
    Failed,
    /// A submission is already in flight; the tap was rejected
    AlreadyProcessing,
    /// No active wizard for this user
    NoSession,
}

// ==================== Message helpers ====================

/// Best-effort delete: the message may already be gone, which is fine.
pub(crate) async fn delete_message_best_effort(bot: &Bot, chat: ChatId, message_id: MessageId) -> bool {
    match bot.delete_message(chat, message_id).await {
        Ok(_) => true,
        Err(e) => {
            log::warn!("Failed to delete message {} (possibly already deleted): {}", message_id, e);
            false
        }
    }
}

/// Deletes the review photo album, if one is on screen.
async fn cleanup_review_artifacts(bot: &Bot, chat: ChatId, session: &mut Session) {
    for message_id in std::mem::take(&mut session.review_media_ids) {
        delete_message_best_effort(bot, chat, message_id).await;
    }
}

/// Idempotent cleanup before rendering a prompt step: whatever review
/// artifacts exist are removed so stale interactive messages never
/// accumulate.
async fn reset_to_prompt_state(bot: &Bot, chat: ChatId, session: &mut Session) {
    if session.step == Step::Reviewing || !session.review_media_ids.is_empty() {
        cleanup_review_artifacts(bot, chat, session).await;
        if let Some(message_id) = session.last_prompt_id.take() {
            delete_message_best_effort(bot, chat, message_id).await;
        }
    }
}

/// Edits the live wizard message in place, falling back to sending a new
/// one whose id is adopted. Never propagates a transport error.
async fn edit_wizard_message(bot: &Bot, chat: ChatId, session: &mut Session, text: &str, keyboard: InlineKeyboardMarkup) {
    if let Some(message_id) = session.last_prompt_id {
        match bot
            .edit_message_text(chat, message_id, text)
            .parse_mode(ParseMode::Markdown)
            .reply_markup(keyboard.clone())
            .await
        {
            Ok(_) => return,
            Err(e) => log::warn!("Failed to edit wizard message, sending a new one: {}", e),
        }
    }

    match bot
        .send_message(chat, text)
        .parse_mode(ParseMode::Markdown)
        .reply_markup(keyboard)
        .await
    {
        Ok(message) => session.last_prompt_id = Some(message.id),
        Err(e) => log::error!("Failed to send wizard message: {}", e),
    }
}

/// Prompt text + keyboard for the given prompt step.
fn prompt_for(step: Step) -> Option<(String, InlineKeyboardMarkup)> {
    match step {
        Step::AwaitingPhotos => Some((texts::WIZARD_SEND_PHOTOS.to_string(), menu::wizard_nav_keyboard())),
        Step::AwaitingCustomerName => Some((
            format!("{}\n\n{}", texts::PHOTOS_RECEIVED, texts::ASK_CUSTOMER_NAME),
            menu::wizard_nav_keyboard(),
        )),
        Step::AwaitingPhone => Some((texts::ASK_PHONE.to_string(), menu::wizard_nav_keyboard())),
        Step::AwaitingWilaya => Some((texts::ASK_WILAYA.to_string(), menu::wilayas_keyboard())),
        Step::AwaitingAddress => Some((texts::ASK_ADDRESS.to_string(), menu::optional_step_keyboard())),
        Step::AwaitingAmount => Some((texts::ASK_AMOUNT.to_string(), menu::wizard_nav_keyboard())),
        Step::AwaitingNotes => Some((texts::ASK_NOTES.to_string(), menu::optional_step_keyboard())),
        _ => None,
    }
}

async fn transition_to_step(bot: &Bot, chat: ChatId, session: &mut Session, step: Step) {
    reset_to_prompt_state(bot, chat, session).await;
    session.step = step;
    if let Some((text, keyboard)) = prompt_for(step) {
        edit_wizard_message(bot, chat, session, &text, keyboard).await;
    }
}

/// After a field was filled: continue forward, or jump back to where an
/// edit shortcut came from.
async fn advance_after_input(bot: &Bot, chat: ChatId, session: &mut Session) {
    match session.mode {
        WizardMode::EditingFrom(return_step) => {
            session.mode = WizardMode::Forward;
            if return_step == Step::Reviewing {
                show_review(bot, chat, session).await;
            } else {
                transition_to_step(bot, chat, session, return_step).await;
            }
        }
        WizardMode::Forward => match session.step.forward_target() {
            Some(Step::Reviewing) => show_review(bot, chat, session).await,
            Some(next) => transition_to_step(bot, chat, session, next).await,
            None => {}
        },
    }
}

/// Renders the review screen: photo album with the summary caption, then
/// the confirm/edit keyboard.
async fn show_review(bot: &Bot, chat: ChatId, session: &mut Session) {
    cleanup_review_artifacts(bot, chat, session).await;
    if let Some(message_id) = session.last_prompt_id.take() {
        delete_message_best_effort(bot, chat, message_id).await;
    }

    session.step = Step::Reviewing;

    let details = menu::OrderDetails {
        customer_name: session.customer_name.as_deref(),
        phone: session.phone.as_deref(),
        wilaya: session.wilaya.as_deref(),
        address: session.address.as_deref(),
        amount_total: session.amount_total,
        notes: session.notes.as_deref(),
        photo_count: session.photo_file_ids.len(),
    };
    let caption = menu::format_order_message(&details, None, None);

    // send_media_group requires 2-10 items; a single photo goes out via
    // send_photo with the same caption
    if session.photo_file_ids.len() == 1 {
        let file = InputFile::file_id(FileId(session.photo_file_ids[0].clone()));
        match bot
            .send_photo(chat, file)
            .caption(caption)
            .parse_mode(ParseMode::Markdown)
            .await
        {
            Ok(message) => session.review_media_ids = vec![message.id],
            Err(e) => log::error!("Failed to send review photo: {}", e),
        }
    } else {
        let mut media: Vec<InputMedia> = Vec::new();
        for (index, file_id) in session.photo_file_ids.iter().take(config::wizard::MAX_PHOTOS).enumerate() {
            let mut item = InputMediaPhoto::new(InputFile::file_id(FileId(file_id.clone())));
            if index == 0 {
                item = item.caption(caption.clone()).parse_mode(ParseMode::Markdown);
            }
            media.push(InputMedia::Photo(item));
        }

        match bot.send_media_group(chat, media).await {
            Ok(messages) => session.review_media_ids = messages.iter().map(|m| m.id).collect(),
            Err(e) => log::error!("Failed to send review media group: {}", e),
        }
    }

    match bot
        .send_message(chat, texts::REVIEW_QUESTION)
        .reply_markup(menu::review_keyboard())
        .await
    {
        Ok(message) => session.last_prompt_id = Some(message.id),
        Err(e) => log::error!("Failed to send review summary: {}", e),
    }
}

// ==================== Public wizard API ====================

/// Starts a fresh wizard, clearing any leftover session artifacts first.
/// The caller is responsible for refusing to start while a wizard is
/// already active (the "finish or cancel first" notice).
pub async fn start_wizard(bot: &Bot, deps: &HandlerDeps, chat: ChatId, user: UserId) -> AppResult<()> {
    if let Some(mut existing) = deps.sessions.remove(user) {
        cleanup_review_artifacts(bot, chat, &mut existing).await;
        if let Some(message_id) = existing.last_prompt_id.take() {
            delete_message_best_effort(bot, chat, message_id).await;
        }
    }

    log::info!("Starting new order wizard for user {}", user);

    let message = bot
        .send_message(chat, texts::WIZARD_SEND_PHOTOS)
        .parse_mode(ParseMode::Markdown)
        .reply_markup(menu::wizard_nav_keyboard())
        .await?;

    let mut session = Session::new();
    session.last_prompt_id = Some(message.id);
    deps.sessions.set(user, session);
    Ok(())
}

/// Accepts a finalized photo batch from the aggregator (or a single
/// photo delivered directly). No-op unless the user is at the photo step.
pub async fn finalize_photo_batch(
    bot: &Bot,
    deps: &HandlerDeps,
    chat: ChatId,
    user: UserId,
    file_ids: Vec<String>,
) -> AppResult<()> {
    let Some(mut session) = deps.sessions.get(user) else {
        return Ok(());
    };
    if session.step != Step::AwaitingPhotos {
        return Ok(());
    }

    let unique = dedup_preserving_order(file_ids);

    if unique.is_empty() {
        edit_wizard_message(bot, chat, &mut session, texts::NO_PHOTOS, menu::wizard_nav_keyboard()).await;
        deps.sessions.set(user, session);
        return Ok(());
    }

    if unique.len() > config::wizard::MAX_PHOTOS {
        session.photo_file_ids.clear();
        edit_wizard_message(bot, chat, &mut session, texts::TOO_MANY_PHOTOS, menu::wizard_nav_keyboard()).await;
        deps.sessions.set(user, session);
        return Ok(());
    }

    session.photo_file_ids = unique;
    transition_to_step(bot, chat, &mut session, Step::AwaitingCustomerName).await;
    deps.sessions.set(user, session);
    Ok(())
}

/// Routes free-form text into the current step. Validation failures
/// re-display the step with an inline error and change nothing else.
pub async fn handle_text(bot: &Bot, deps: &HandlerDeps, chat: ChatId, user: UserId, text: &str) -> AppResult<()> {
    let Some(mut session) = deps.sessions.get(user) else {
        return Ok(());
    };
    let text = text.trim();
    if text.is_empty() {
        return Ok(());
    }

    match session.step {
        Step::AwaitingCustomerName => {
            session.customer_name = Some(text.to_string());
            advance_after_input(bot, chat, &mut session).await;
        }
        Step::AwaitingPhone => {
            if !validation::is_valid_phone(text) {
                edit_wizard_message(bot, chat, &mut session, texts::INVALID_PHONE, menu::wizard_nav_keyboard()).await;
                deps.sessions.set(user, session);
                return Ok(());
            }
            session.phone = Some(text.to_string());
            advance_after_input(bot, chat, &mut session).await;
        }
        // The wilaya step is button-driven; text there is ignored.
        Step::AwaitingAddress => {
            session.address = Some(text.to_string());
            advance_after_input(bot, chat, &mut session).await;
        }
        Step::AwaitingAmount => {
            let Some(amount) = validation::parse_amount(text) else {
                edit_wizard_message(bot, chat, &mut session, texts::INVALID_AMOUNT, menu::wizard_nav_keyboard()).await;
                deps.sessions.set(user, session);
                return Ok(());
            };
            session.amount_total = Some(amount);
            advance_after_input(bot, chat, &mut session).await;
        }
        Step::AwaitingNotes => {
            session.notes = Some(text.to_string());
            advance_after_input(bot, chat, &mut session).await;
        }
        _ => return Ok(()),
    }

    deps.sessions.set(user, session);
    Ok(())
}

/// Wilaya picked from the inline keyboard.
pub async fn handle_wilaya_selected(
    bot: &Bot,
    deps: &HandlerDeps,
    chat: ChatId,
    user: UserId,
    wilaya: &str,
) -> AppResult<()> {
    let Some(mut session) = deps.sessions.get(user) else {
        return Ok(());
    };
    if session.step != Step::AwaitingWilaya {
        return Ok(());
    }

    session.wilaya = Some(wilaya.to_string());
    advance_after_input(bot, chat, &mut session).await;
    deps.sessions.set(user, session);
    Ok(())
}

/// One step back in the linear order. No-op at the first step.
pub async fn handle_back(bot: &Bot, deps: &HandlerDeps, chat: ChatId, user: UserId) -> AppResult<()> {
    let Some(mut session) = deps.sessions.get(user) else {
        return Ok(());
    };
    let Some(previous) = session.step.back_target() else {
        return Ok(());
    };

    transition_to_step(bot, chat, &mut session, previous).await;
    deps.sessions.set(user, session);
    Ok(())
}

/// Skip on an optional step: clears the field and advances exactly as a
/// normal submission would.
pub async fn handle_skip(bot: &Bot, deps: &HandlerDeps, chat: ChatId, user: UserId) -> AppResult<()> {
    let Some(mut session) = deps.sessions.get(user) else {
        return Ok(());
    };

    match session.step {
        Step::AwaitingAddress => session.address = None,
        Step::AwaitingNotes => session.notes = None,
        _ => return Ok(()),
    }

    advance_after_input(bot, chat, &mut session).await;
    deps.sessions.set(user, session);
    Ok(())
}

/// Cancels the wizard: destroys the session and cleans the screen.
pub async fn handle_cancel(bot: &Bot, deps: &HandlerDeps, chat: ChatId, user: UserId) -> AppResult<()> {
    if let Some(mut session) = deps.sessions.remove(user) {
        cleanup_review_artifacts(bot, chat, &mut session).await;
        if let Some(message_id) = session.last_prompt_id.take() {
            delete_message_best_effort(bot, chat, message_id).await;
        }
    }

    bot.send_message(chat, texts::ORDER_CANCELED)
        .reply_markup(menu::main_menu_keyboard())
        .await?;
    Ok(())
}

/// Edit shortcut from the review screen: jump to one field's prompt, to
/// return straight to review after the next valid input.
pub async fn handle_edit(bot: &Bot, deps: &HandlerDeps, chat: ChatId, user: UserId, field: EditField) -> AppResult<()> {
    let Some(mut session) = deps.sessions.get(user) else {
        return Ok(());
    };
    if session.step != Step::Reviewing {
        return Ok(());
    }

    session.mode = WizardMode::EditingFrom(Step::Reviewing);
    transition_to_step(bot, chat, &mut session, field.step()).await;
    deps.sessions.set(user, session);
    Ok(())
}

/// Confirm from the review screen.
///
/// Exactly one attempt can be in flight: the session is atomically moved
/// to `Submitting` before any await, and a duplicate tap is rejected
/// without side effects. On failure the session reverts to review with
/// the full review screen re-rendered, so the UI is never left half
/// submitted.
pub async fn handle_confirm(bot: &Bot, deps: &HandlerDeps, chat: ChatId, user: UserId) -> AppResult<ConfirmOutcome> {
    let (gate, snapshot) = deps.sessions.try_begin_submit(user);
    match gate {
        SubmitGate::NoSession => return Ok(ConfirmOutcome::NoSession),
        SubmitGate::AlreadySubmitting => {
            log::warn!("Duplicate order confirmation from user {}", user);
            return Ok(ConfirmOutcome::AlreadyProcessing);
        }
        SubmitGate::Started => {}
    }
    let Some(mut session) = snapshot else {
        return Ok(ConfirmOutcome::NoSession);
    };
    session.step = Step::Submitting;

    cleanup_review_artifacts(bot, chat, &mut session).await;
    if let Some(message_id) = session.last_prompt_id.take() {
        delete_message_best_effort(bot, chat, message_id).await;
    }

    let processing_id = match bot
        .send_message(chat, texts::PROCESSING_ORDER)
        .reply_markup(ReplyMarkup::kb_remove())
        .await
    {
        Ok(message) => Some(message.id),
        Err(e) => {
            log::warn!("Failed to send processing notice: {}", e);
            None
        }
    };

    log::info!(
        "Submitting order for user {} ({} photo(s), wilaya {:?})",
        user,
        session.photo_file_ids.len(),
        session.wilaya
    );

    match submit_order(bot, &deps.store, &deps.photo_host, &mut session).await {
        Ok(order_id) => {
            if let Some(message_id) = processing_id {
                delete_message_best_effort(bot, chat, message_id).await;
            }
            deps.sessions.remove(user);
            log::info!("Order {} submitted by user {}", order_id, user);
            bot.send_message(chat, texts::ORDER_CONFIRMED)
                .reply_markup(menu::main_menu_keyboard())
                .await?;
            Ok(ConfirmOutcome::Submitted)
        }
        Err(e) => {
            log::error!("Failed to process order submission for user {}: {}", user, e);

            // 1. drop the "processing…" notice
            if let Some(message_id) = processing_id {
                delete_message_best_effort(bot, chat, message_id).await;
            }
            // 2. back to review so the user can retry
            session.step = Step::Reviewing;
            // 3. localized retry instruction, never the raw error
            if let Err(e) = bot.send_message(chat, texts::SUBMIT_FAILED_RETRY).await {
                log::error!("Failed to send retry notice: {}", e);
            }
            // 4. full review screen again (album + summary + buttons)
            show_review(bot, chat, &mut session).await;
            deps.sessions.set(user, session);
            Ok(ConfirmOutcome::Failed)
        }
    }
}
