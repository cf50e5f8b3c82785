//! Message Handler module for processing incoming Telegram messages

use anyhow::{Context, Result};
use teloxide::prelude::*;
use teloxide::types::{Document, FileId};
use teloxide::utils::command::BotCommands;
use tracing::{debug, error, info, warn};

use crate::conversation::Input;
use crate::dialogue::{BotDialogue, ConversationState};
use crate::localization::{t_args_lang, t_lang};
use crate::store::AdminAction;

use super::dialogue_manager::{
    drive, import_catalog, import_report, show, show_main_menu, Caller, Target,
};
use super::ui_builder::{admin_notice_screen, admin_panel_screen, notice_screen, welcome_text};
use super::{Command, HandlerResult, SharedContext};

/// Largest catalog file accepted for import
pub const MAX_IMPORT_FILE_BYTES: u32 = 5 * 1024 * 1024;

/// Download a file the user sent to the bot
pub async fn download_file(bot: &Bot, file_id: FileId) -> Result<Vec<u8>> {
    let file = bot.get_file(file_id).await?;
    let url = format!(
        "https://api.telegram.org/file/bot{}/{}",
        bot.token(),
        file.path
    );

    let response = reqwest::get(&url)
        .await
        .context("Failed to reach Telegram file endpoint")?
        .error_for_status()?;
    let bytes = response.bytes().await?;

    Ok(bytes.to_vec())
}

/// Handle `/start`, `/admin`, `/id` and `/help`
pub async fn command_handler(
    bot: Bot,
    msg: Message,
    cmd: Command,
    dialogue: BotDialogue,
    ctx: SharedContext,
) -> HandlerResult {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let caller = Caller::from_user(user);
    let lang = caller.lang();
    let target = Target::new(msg.chat.id);

    debug!(user_id = caller.user_id, command = ?cmd, "Received command");

    match cmd {
        Command::Start => {
            match ctx.store.update(|data| data.register_user(caller.user_id)).await {
                Ok(true) => info!(user_id = caller.user_id, "New user registered"),
                Ok(false) => {}
                Err(e) => error!(user_id = caller.user_id, error = %e, "Failed to register user"),
            }
            dialogue.exit().await?;
            show_main_menu(&bot, &ctx, &caller, target, welcome_text(&caller.first_name, lang)).await?;
        }
        Command::Admin => {
            let owner_id = ctx.owner_id();
            let role = ctx.store.read(|data| data.role_of(caller.user_id, owner_id)).await;
            match role {
                Some(role) => {
                    dialogue.exit().await?;
                    show(&bot, target, admin_panel_screen(role, lang)).await?;
                }
                None => {
                    warn!(user_id = caller.user_id, "Non-admin requested the admin panel");
                    bot.send_message(msg.chat.id, t_lang("admin-denied", lang)).await?;
                }
            }
        }
        Command::Id => {
            bot.send_message(
                msg.chat.id,
                t_args_lang("your-id", &[("id", &caller.user_id.to_string())], lang),
            )
            .await?;
        }
        Command::Help => {
            let text = format!(
                "{}\n\n{}",
                Command::descriptions(),
                t_lang("help-text", lang)
            );
            bot.send_message(msg.chat.id, text).await?;
        }
    }

    Ok(())
}

async fn handle_document_message(
    bot: &Bot,
    document: &Document,
    dialogue: &BotDialogue,
    ctx: &SharedContext,
    caller: &Caller,
    target: Target,
) -> HandlerResult {
    let lang = caller.lang();

    let ConversationState::AwaitingCatalogFile { kind } = dialogue.get_or_default().await? else {
        debug!(user_id = caller.user_id, "Document received outside an import");
        return show(bot, target, notice_screen(t_lang("document-unexpected", lang), lang)).await;
    };

    let owner_id = ctx.owner_id();
    let allowed = ctx
        .store
        .read(|data| data.has_permission(caller.user_id, owner_id, AdminAction::ImportCatalog))
        .await;
    if !allowed {
        warn!(user_id = caller.user_id, "Catalog upload rejected, permission revoked");
        dialogue.exit().await?;
        return show(bot, target, notice_screen(t_lang("admin-denied", lang), lang)).await;
    }

    if document.file.size > MAX_IMPORT_FILE_BYTES {
        bot.send_message(target.chat_id, t_lang("import-too-large", lang)).await?;
        return Ok(());
    }

    let bytes = match download_file(bot, document.file.id.clone()).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(user_id = caller.user_id, error = %e, "Failed to download catalog file");
            bot.send_message(target.chat_id, t_lang("import-download-failed", lang)).await?;
            return Ok(());
        }
    };

    let result = import_catalog(ctx, kind, &bytes).await;
    match &result {
        Ok(summary) => info!(
            user_id = caller.user_id,
            kind = ?kind,
            created = summary.created,
            updated = summary.updated,
            rejected = summary.rejected,
            "Catalog imported"
        ),
        Err(e) => warn!(user_id = caller.user_id, kind = ?kind, error = %e, "Catalog import failed"),
    }

    dialogue.exit().await?;
    show(bot, target, admin_notice_screen(import_report(&result, lang), lang)).await
}

/// Handle every non-command message
pub async fn message_handler(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
    ctx: SharedContext,
) -> HandlerResult {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let caller = Caller::from_user(user);
    let target = Target::new(msg.chat.id);

    if let Some(text) = msg.text() {
        debug!(user_id = caller.user_id, "Received text message");
        drive(&bot, &ctx, &dialogue, &caller, target, Input::Text(text.to_string())).await?;
    } else if let Some(document) = msg.document() {
        debug!(user_id = caller.user_id, "Received document");
        handle_document_message(&bot, document, &dialogue, &ctx, &caller, target).await?;
    } else {
        debug!(user_id = caller.user_id, "Received unsupported message type");
        bot.send_message(msg.chat.id, t_lang("unsupported-message", caller.lang()))
            .await?;
    }

    Ok(())
}
