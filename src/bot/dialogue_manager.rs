//! Dialogue Manager module: runs the conversation state machine for an
//! update, renders the resulting effect and applies completed admin commands.

use anyhow::Result;
use rand::Rng;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::{MessageId, User};
use teloxide::{ApiError, RequestError};
use tracing::{debug, error, info, warn};

use crate::catalog::{parse_car_rows, parse_mobile_rows, search, CatalogKind, ImportError, ImportSummary, Upsert};
use crate::config::RecoveryConfig;
use crate::conversation::{advance, AdminCommand, Effect, FlowContext, Input};
use crate::dialogue::{AdminFlow, BotDialogue, ConversationState};
use crate::localization::{t_args_lang, t_lang};
use crate::store::{AdminAction, AdminRole, Sponsor, StoreError, SupportConfig};

use super::ui_builder::{
    admin_notice_screen, estimate_brands_screen, estimate_conditions_screen, estimate_mileage_screen,
    estimate_models_screen, estimate_result_screen, estimate_years_screen, main_menu_screen,
    notice_screen, prompt_screen, search_results_screen, Screen,
};
use super::{HandlerResult, SharedContext};

/// Where a screen is rendered: the chat, and the message to edit when the
/// update came from one of our buttons
#[derive(Clone, Copy, Debug)]
pub struct Target {
    pub chat_id: ChatId,
    pub message_id: Option<MessageId>,
}

impl Target {
    pub fn new(chat_id: ChatId) -> Self {
        Self {
            chat_id,
            message_id: None,
        }
    }

    pub fn editing(chat_id: ChatId, message_id: MessageId) -> Self {
        Self {
            chat_id,
            message_id: Some(message_id),
        }
    }
}

/// The Telegram user behind an update
#[derive(Clone, Debug)]
pub struct Caller {
    pub user_id: i64,
    pub first_name: String,
    pub language_code: Option<String>,
}

impl Caller {
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: i64::try_from(user.id.0).unwrap_or(i64::MAX),
            first_name: user.first_name.clone(),
            language_code: user.language_code.clone(),
        }
    }

    pub fn lang(&self) -> Option<&str> {
        self.language_code.as_deref()
    }
}

/// Edit the target message when there is one, otherwise send a new message
pub async fn show(bot: &Bot, target: Target, screen: Screen) -> HandlerResult {
    if let Some(message_id) = target.message_id {
        match bot
            .edit_message_text(target.chat_id, message_id, screen.text.clone())
            .reply_markup(screen.keyboard.clone())
            .await
        {
            Ok(_) | Err(RequestError::Api(ApiError::MessageNotModified)) => return Ok(()),
            Err(e) => {
                debug!(chat_id = %target.chat_id, error = %e, "Could not edit message, sending a new one");
            }
        }
    }

    bot.send_message(target.chat_id, screen.text)
        .reply_markup(screen.keyboard)
        .await?;
    Ok(())
}

/// Main menu for `caller`, with `text` above it
pub async fn show_main_menu(
    bot: &Bot,
    ctx: &SharedContext,
    caller: &Caller,
    target: Target,
    text: String,
) -> HandlerResult {
    let owner_id = ctx.owner_id();
    let screen = ctx
        .store
        .read(|data| {
            let is_admin = data.is_admin(caller.user_id, owner_id);
            main_menu_screen(text, data, is_admin, caller.lang())
        })
        .await;
    show(bot, target, screen).await
}

async fn store_state(dialogue: &BotDialogue, state: ConversationState) -> Result<()> {
    if state.is_idle() {
        dialogue.exit().await?;
    } else {
        dialogue.update(state).await?;
    }
    Ok(())
}

/// Feed one input to the user's conversation and render the outcome
pub async fn drive(
    bot: &Bot,
    ctx: &SharedContext,
    dialogue: &BotDialogue,
    caller: &Caller,
    target: Target,
    input: Input,
) -> HandlerResult {
    let state = dialogue.get_or_default().await?;
    let transition = ctx
        .store
        .read(|data| {
            advance(
                state,
                input,
                FlowContext {
                    catalog: &data.car_db,
                    estimator: &ctx.estimator,
                },
            )
        })
        .await;

    debug!(
        user_id = caller.user_id,
        phase = ?transition.state.phase(),
        "Conversation advanced"
    );

    store_state(dialogue, transition.state).await?;
    render_effect(bot, ctx, caller, target, transition.effect).await
}

async fn render_effect(
    bot: &Bot,
    ctx: &SharedContext,
    caller: &Caller,
    target: Target,
    effect: Effect,
) -> HandlerResult {
    let lang = caller.lang();

    let screen = match effect {
        Effect::ShowBrands { brands } => estimate_brands_screen(&brands, false, lang),
        Effect::BrandNotFound { brands } => estimate_brands_screen(&brands, true, lang),
        Effect::ShowModels { brand, models } => estimate_models_screen(&brand, &models, false, lang),
        Effect::ModelNotFound { brand, models } => estimate_models_screen(&brand, &models, true, lang),
        Effect::ShowYears { years } => estimate_years_screen(&years, lang),
        Effect::AskMileage => estimate_mileage_screen(false, lang),
        Effect::InvalidMileage => estimate_mileage_screen(true, lang),
        Effect::ShowConditions => estimate_conditions_screen(lang),
        Effect::Estimated(estimate) => {
            info!(
                user_id = caller.user_id,
                brand = %estimate.brand,
                model = %estimate.model,
                year = estimate.year,
                price = estimate.price,
                "Estimate computed"
            );
            estimate_result_screen(&estimate, lang)
        }
        Effect::CatalogChanged { brand, model } => notice_screen(
            t_args_lang(
                "estimate-catalog-changed",
                &[("brand", &brand), ("model", &model)],
                lang,
            ),
            lang,
        ),
        Effect::Expired => notice_screen(t_lang("flow-expired", lang), lang),
        Effect::AskField { flow, step } => prompt_screen(field_prompt(&flow, step, lang), lang),
        Effect::InvalidField { flow, step, error } => prompt_screen(
            format!(
                "{}\n\n{}",
                t_lang(error.message_key(), lang),
                field_prompt(&flow, step, lang)
            ),
            lang,
        ),
        Effect::AdminCompleted(command) => {
            return apply_admin_command(bot, ctx, caller, target, command).await;
        }
        Effect::AskSearchQuery => prompt_screen(t_lang("search-prompt", lang), lang),
        Effect::Search { query } => {
            let hits = ctx
                .store
                .read(|data| search(&data.car_db, &data.mobile_db, &query))
                .await;
            debug!(user_id = caller.user_id, query = %query, hits = hits.len(), "Search");
            search_results_screen(&query, &hits, lang)
        }
        Effect::AskCatalogFile { kind } => prompt_screen(t_lang(import_prompt_key(kind), lang), lang),
        Effect::Cancelled => {
            return show_main_menu(bot, ctx, caller, target, t_lang("main-menu-title", lang)).await;
        }
        Effect::Ignored => {
            return show_main_menu(bot, ctx, caller, target, t_lang("use-menu-hint", lang)).await;
        }
    };

    show(bot, target, screen).await
}

fn field_prompt(flow: &AdminFlow, step: usize, language_code: Option<&str>) -> String {
    match flow.fields().get(step) {
        Some(field) => match flow {
            AdminFlow::EditMenuLabel { key } | AdminFlow::EditMenuUrl { key } => {
                t_args_lang(field.prompt_key, &[("key", key)], language_code)
            }
            _ => t_lang(field.prompt_key, language_code),
        },
        None => t_lang("flow-expired", language_code),
    }
}

fn import_prompt_key(kind: CatalogKind) -> &'static str {
    match kind {
        CatalogKind::Cars => "import-cars-prompt",
        CatalogKind::Mobiles => "import-mobiles-prompt",
    }
}

/// Permission needed to apply a completed admin command
pub fn command_action(command: &AdminCommand) -> AdminAction {
    match command {
        AdminCommand::AddAdmin { .. } => AdminAction::ManageAdmins,
        AdminCommand::SetSponsor { .. } => AdminAction::Sponsor,
        AdminCommand::Broadcast { .. } => AdminAction::Broadcast,
        AdminCommand::SetMenuLabel { .. } | AdminCommand::SetMenuUrl { .. } => AdminAction::ManageMenus,
        AdminCommand::SetSupport { .. } => AdminAction::SetSupport,
        AdminCommand::SetChannelUrl { .. } => AdminAction::ChannelSettings,
        AdminCommand::AddCar(_) => AdminAction::AddCar,
    }
}

async fn apply_admin_command(
    bot: &Bot,
    ctx: &SharedContext,
    caller: &Caller,
    target: Target,
    command: AdminCommand,
) -> HandlerResult {
    let lang = caller.lang();
    let owner_id = ctx.owner_id();
    let action = command_action(&command);

    let allowed = ctx
        .store
        .read(|data| data.has_permission(caller.user_id, owner_id, action))
        .await;
    if !allowed {
        warn!(user_id = caller.user_id, action = ?action, "Admin command rejected, permission revoked");
        return show(bot, target, notice_screen(t_lang("admin-denied", lang), lang)).await;
    }

    info!(user_id = caller.user_id, command = ?command, "Applying admin command");

    let outcome: Result<String, StoreError> = match command {
        AdminCommand::AddAdmin { user_id } => ctx
            .store
            .update(|data| data.add_admin(user_id, AdminRole::Editor))
            .await
            .map(|_| t_args_lang("admin-added", &[("id", &user_id.to_string())], lang)),
        AdminCommand::SetSponsor { name, url } => ctx
            .store
            .update(|data| {
                data.sponsor = Sponsor {
                    name: Some(name),
                    url: Some(url),
                }
            })
            .await
            .map(|_| t_lang("sponsor-saved", lang)),
        AdminCommand::Broadcast { text } => {
            return run_broadcast(bot, ctx, caller, target, &text).await;
        }
        AdminCommand::SetMenuLabel { key, label } => ctx
            .store
            .update(|data| data.menu_config.get_mut(&key).map(|item| item.label = label).is_some())
            .await
            .map(|found| menu_outcome(found, "menu-label-saved", lang)),
        AdminCommand::SetMenuUrl { key, url } => ctx
            .store
            .update(|data| data.menu_config.get_mut(&key).map(|item| item.url = Some(url)).is_some())
            .await
            .map(|found| menu_outcome(found, "menu-url-saved", lang)),
        AdminCommand::SetSupport { contact } => ctx
            .store
            .update(|data| data.support_config = SupportConfig::from_input(&contact))
            .await
            .map(|_| t_lang("support-saved", lang)),
        AdminCommand::SetChannelUrl { url } => ctx
            .store
            .update(|data| data.menu_config.get_mut("channel").map(|item| item.url = Some(url)).is_some())
            .await
            .map(|found| menu_outcome(found, "channel-url-saved", lang)),
        AdminCommand::AddCar(row) => ctx
            .store
            .update(|data| data.car_db.upsert_variant(&row))
            .await
            .map(|upsert| {
                let key = match upsert {
                    Upsert::Created => "car-added",
                    Upsert::Updated => "car-updated",
                };
                t_args_lang(
                    key,
                    &[("brand", &row.brand), ("model", &row.model), ("variant", &row.variant)],
                    lang,
                )
            }),
    };

    let text = match outcome {
        Ok(text) => text,
        Err(e) => {
            error!(user_id = caller.user_id, error = %e, "Failed to save admin change");
            t_lang("save-failed", lang)
        }
    };
    show(bot, target, admin_notice_screen(text, lang)).await
}

fn menu_outcome(found: bool, saved_key: &str, language_code: Option<&str>) -> String {
    if found {
        t_lang(saved_key, language_code)
    } else {
        t_lang("menu-item-missing", language_code)
    }
}

/// Delivery counts of a broadcast
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub sent: usize,
    pub failed: usize,
}

/// Exponential backoff for retry `attempt` (0-based), capped, plus jitter
pub fn retry_delay(attempt: u32, recovery: &RecoveryConfig, jitter_ms: u64) -> Duration {
    let exponential = recovery
        .base_retry_delay_ms
        .saturating_mul(1u64 << attempt.min(16));
    Duration::from_millis(exponential.min(recovery.max_retry_delay_ms) + jitter_ms)
}

/// Errors that retrying cannot fix
fn is_permanent(err: &RequestError) -> bool {
    matches!(
        err,
        RequestError::Api(ApiError::BotBlocked | ApiError::UserDeactivated | ApiError::ChatNotFound)
    )
}

async fn send_with_retry(bot: &Bot, chat_id: ChatId, text: &str, recovery: &RecoveryConfig) -> Result<(), RequestError> {
    let mut attempt = 0;
    loop {
        match bot.send_message(chat_id, text).await {
            Ok(_) => return Ok(()),
            Err(e) if is_permanent(&e) || attempt >= recovery.max_retries => return Err(e),
            Err(RequestError::RetryAfter(after)) => {
                debug!(chat_id = %chat_id, "Rate limited during broadcast");
                tokio::time::sleep(after.duration()).await;
            }
            Err(e) => {
                let jitter = rand::thread_rng().gen_range(0..=recovery.base_retry_delay_ms / 2);
                let delay = retry_delay(attempt, recovery, jitter);
                warn!(chat_id = %chat_id, attempt, error = %e, delay_ms = delay.as_millis() as u64, "Send failed, retrying");
                tokio::time::sleep(delay).await;
            }
        }
        attempt += 1;
    }
}

/// Send `text` to every user, one at a time
pub async fn broadcast(bot: &Bot, users: &[i64], text: &str, recovery: &RecoveryConfig) -> BroadcastReport {
    let mut report = BroadcastReport::default();
    let pause = Duration::from_millis(recovery.send_interval_ms);

    for user_id in users {
        match send_with_retry(bot, ChatId(*user_id), text, recovery).await {
            Ok(()) => report.sent += 1,
            Err(e) => {
                debug!(user_id, error = %e, "Broadcast delivery failed");
                report.failed += 1;
            }
        }
        tokio::time::sleep(pause).await;
    }

    report
}

/// Run `broadcast` in its own task so the caller's handler returns at once
pub fn spawn_broadcast(
    bot: Bot,
    users: Vec<i64>,
    text: String,
    recovery: RecoveryConfig,
) -> tokio::task::JoinHandle<BroadcastReport> {
    tokio::spawn(async move { broadcast(&bot, &users, &text, &recovery).await })
}

async fn run_broadcast(bot: &Bot, ctx: &SharedContext, caller: &Caller, target: Target, text: &str) -> HandlerResult {
    let lang = caller.lang();
    let users = ctx.store.read(|data| data.users().to_vec()).await;

    info!(user_id = caller.user_id, recipients = users.len(), "Broadcast started");
    bot.send_message(
        target.chat_id,
        t_args_lang("broadcast-started", &[("count", &users.len().to_string())], lang),
    )
    .await?;

    let delivery = spawn_broadcast(bot.clone(), users, text.to_string(), ctx.config.recovery.clone());
    let bot = bot.clone();
    let language_code = caller.language_code.clone();
    tokio::spawn(async move {
        let report = match delivery.await {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, "Broadcast task failed");
                return;
            }
        };
        info!(sent = report.sent, failed = report.failed, "Broadcast finished");

        let lang = language_code.as_deref();
        let summary = t_args_lang(
            "broadcast-done",
            &[
                ("sent", &report.sent.to_string()),
                ("failed", &report.failed.to_string()),
            ],
            lang,
        );
        if let Err(e) = show(&bot, Target::new(target.chat_id), admin_notice_screen(summary, lang)).await {
            error!(chat_id = %target.chat_id, error = %e, "Could not report broadcast result");
        }
    });
    Ok(())
}

/// Why an uploaded catalog file was not applied
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Parse an uploaded file and merge it into the catalog of `kind`
pub async fn import_catalog(ctx: &SharedContext, kind: CatalogKind, bytes: &[u8]) -> Result<ImportSummary, UploadError> {
    let summary = match kind {
        CatalogKind::Cars => {
            let rows = parse_car_rows(bytes)?;
            ctx.store.update(|data| data.car_db.import_rows(&rows)).await?
        }
        CatalogKind::Mobiles => {
            let rows = parse_mobile_rows(bytes)?;
            ctx.store.update(|data| data.mobile_db.import_rows(&rows)).await?
        }
    };
    Ok(summary)
}

/// Text reporting an import result
pub fn import_report(result: &Result<ImportSummary, UploadError>, language_code: Option<&str>) -> String {
    match result {
        Ok(summary) => t_args_lang(
            "import-done",
            &[
                ("created", &summary.created.to_string()),
                ("updated", &summary.updated.to_string()),
                ("rejected", &summary.rejected.to_string()),
            ],
            language_code,
        ),
        Err(UploadError::Import(e)) => t_args_lang("import-failed", &[("error", &e.to_string())], language_code),
        Err(UploadError::Store(_)) => t_lang("save-failed", language_code),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_grows_and_caps() {
        let recovery = RecoveryConfig::default();
        assert_eq!(retry_delay(0, &recovery, 0), Duration::from_millis(500));
        assert_eq!(retry_delay(1, &recovery, 0), Duration::from_millis(1000));
        assert_eq!(retry_delay(2, &recovery, 7), Duration::from_millis(2007));
        assert_eq!(retry_delay(10, &recovery, 0), Duration::from_millis(10_000));
        assert_eq!(retry_delay(u32::MAX, &recovery, 0), Duration::from_millis(10_000));
    }

    #[test]
    fn test_permanent_errors_are_not_retried() {
        assert!(is_permanent(&RequestError::Api(ApiError::BotBlocked)));
        assert!(!is_permanent(&RequestError::Api(ApiError::MessageNotModified)));
    }

    #[tokio::test]
    async fn test_broadcast_runs_in_background_and_counts_failures() -> Result<()> {
        let bot = Bot::new("123:test").set_api_url(reqwest::Url::parse("http://127.0.0.1:1")?);
        let recovery = RecoveryConfig {
            max_retries: 0,
            send_interval_ms: 0,
            ..Default::default()
        };

        let handle = spawn_broadcast(bot, vec![111, 222], "hello".to_string(), recovery);
        let report = handle.await?;

        assert_eq!(report, BroadcastReport { sent: 0, failed: 2 });
        Ok(())
    }
}
