//! Callback Handler module for processing inline keyboard callback queries

use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use tracing::{debug, error, info, warn};

use crate::backup::send_backup;
use crate::conversation::Input;
use crate::dialogue::{AdminFlow, BotDialogue};
use crate::localization::t_lang;
use crate::store::{AdminAction, AdminRole};

use super::callback_data::CallbackAction;
use super::dialogue_manager::{drive, show, show_main_menu, Caller, Target};
use super::ui_builder::{
    admin_notice_screen, admin_panel_screen, admins_screen, backup_screen, channel_screen,
    menu_item_screen, menus_screen, mobile_brands_screen, mobile_detail_screen,
    mobile_models_screen, notice_screen, price_brands_screen, price_detail_screen,
    price_models_screen, price_variants_screen, sponsor_screen, support_screen, Screen,
};
use super::{HandlerResult, SharedContext};

/// Handle callback queries from inline keyboards
///
/// The query is always answered, even when handling fails, so the client
/// stops showing its loading indicator.
pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    dialogue: BotDialogue,
    ctx: SharedContext,
) -> HandlerResult {
    let caller = Caller::from_user(&q.from);
    let target = match &q.message {
        Some(message) => Target::editing(message.chat().id, message.id()),
        None => Target::new(ChatId(caller.user_id)),
    };

    let data = q.data.as_deref().unwrap_or_default();
    debug!(user_id = caller.user_id, data, "Received callback query");

    let result = match CallbackAction::parse(data) {
        Some(action) => handle_action(&bot, &ctx, &dialogue, &caller, target, action).await,
        None => {
            warn!(user_id = caller.user_id, data, "Unknown callback data");
            Ok(Some(t_lang("callback-unknown", caller.lang())))
        }
    };

    let mut answer = bot.answer_callback_query(q.id.clone());
    match &result {
        Ok(Some(notice)) => answer = answer.text(notice.clone()),
        Ok(None) => {}
        Err(e) => {
            error!(user_id = caller.user_id, error = %e, "Callback handling failed");
            answer = answer.text(t_lang("error-generic", caller.lang()));
        }
    }
    answer.await?;

    result.map(|_| ())
}

/// Run one action; `Ok(Some(text))` is shown as a toast on the button press
async fn handle_action(
    bot: &Bot,
    ctx: &SharedContext,
    dialogue: &BotDialogue,
    caller: &Caller,
    target: Target,
    action: CallbackAction,
) -> anyhow::Result<Option<String>> {
    let lang = caller.lang();

    let screen: Screen = match action {
        CallbackAction::MainMenu => {
            drive(bot, ctx, dialogue, caller, target, Input::Cancel).await?;
            return Ok(None);
        }
        CallbackAction::Cancel => {
            drive(bot, ctx, dialogue, caller, target, Input::Cancel).await?;
            return Ok(Some(t_lang("cancelled", lang)));
        }
        CallbackAction::Estimate => return drive_input(bot, ctx, dialogue, caller, target, Input::StartEstimate).await,
        CallbackAction::EstimateBrand(brand) => {
            return drive_input(bot, ctx, dialogue, caller, target, Input::SelectBrand(brand)).await;
        }
        CallbackAction::EstimateModel(model) => {
            return drive_input(bot, ctx, dialogue, caller, target, Input::SelectModel(model)).await;
        }
        CallbackAction::EstimateYear(year) => {
            return drive_input(bot, ctx, dialogue, caller, target, Input::SelectYear(year)).await;
        }
        CallbackAction::EstimateCondition(index) => {
            return drive_input(bot, ctx, dialogue, caller, target, Input::SelectCondition(index)).await;
        }
        CallbackAction::Search => return drive_input(bot, ctx, dialogue, caller, target, Input::StartSearch).await,
        CallbackAction::Support => ctx.store.read(|data| support_screen(&data.support_config, lang)).await,

        CallbackAction::Prices => ctx.store.read(|data| price_brands_screen(&data.car_db, lang)).await,
        CallbackAction::PriceBrand(brand) => {
            match ctx.store.read(|data| price_models_screen(&data.car_db, &brand, lang)).await {
                Some(screen) => screen,
                None => return stale_listing(bot, ctx, caller, target).await,
            }
        }
        CallbackAction::PriceModel { brand, model } => {
            match ctx
                .store
                .read(|data| price_variants_screen(&data.car_db, &brand, model, lang))
                .await
            {
                Some(screen) => screen,
                None => return stale_listing(bot, ctx, caller, target).await,
            }
        }
        CallbackAction::PriceVariant {
            brand,
            model,
            variant,
        } => {
            match ctx
                .store
                .read(|data| price_detail_screen(&data.car_db, &brand, model, variant, lang))
                .await
            {
                Some(screen) => screen,
                None => return stale_listing(bot, ctx, caller, target).await,
            }
        }
        CallbackAction::Mobiles => ctx.store.read(|data| mobile_brands_screen(&data.mobile_db, lang)).await,
        CallbackAction::MobileBrand(brand) => {
            match ctx.store.read(|data| mobile_models_screen(&data.mobile_db, &brand, lang)).await {
                Some(screen) => screen,
                None => return stale_listing(bot, ctx, caller, target).await,
            }
        }
        CallbackAction::MobileModel { brand, model } => {
            match ctx
                .store
                .read(|data| mobile_detail_screen(&data.mobile_db, &brand, model, lang))
                .await
            {
                Some(screen) => screen,
                None => return stale_listing(bot, ctx, caller, target).await,
            }
        }

        admin_action => return handle_admin_action(bot, ctx, dialogue, caller, target, admin_action).await,
    };

    show(bot, target, screen).await?;
    Ok(None)
}

async fn drive_input(
    bot: &Bot,
    ctx: &SharedContext,
    dialogue: &BotDialogue,
    caller: &Caller,
    target: Target,
    input: Input,
) -> anyhow::Result<Option<String>> {
    drive(bot, ctx, dialogue, caller, target, input).await?;
    Ok(None)
}

/// A browse button pointing at an entry that no longer exists
async fn stale_listing(
    bot: &Bot,
    ctx: &SharedContext,
    caller: &Caller,
    target: Target,
) -> anyhow::Result<Option<String>> {
    show_main_menu(bot, ctx, caller, target, t_lang("main-menu-title", caller.lang())).await?;
    Ok(Some(t_lang("listing-outdated", caller.lang())))
}

/// Permission each admin screen or button requires
fn required_permission(action: &CallbackAction) -> Option<AdminAction> {
    use CallbackAction::*;

    let permission = match action {
        AdminHome => return None,
        AdminMenus | EditMenu(_) | ToggleMenu(_) | SetMenuLabel(_) | SetMenuUrl(_) => AdminAction::ManageMenus,
        Channel | ToggleChannel | SetChannelUrl => AdminAction::ChannelSettings,
        AddCar => AdminAction::AddCar,
        Import(_) => AdminAction::ImportCatalog,
        SetSupport => AdminAction::SetSupport,
        Admins | AddAdmin | RemoveAdmin(_) | CycleRole(_) => AdminAction::ManageAdmins,
        Backup | BackupNow | BackupInterval(_) => AdminAction::Backup,
        Sponsor | SetSponsor | ClearSponsor => AdminAction::Sponsor,
        Broadcast => AdminAction::Broadcast,
        _ => return None,
    };
    Some(permission)
}

async fn start_flow(
    bot: &Bot,
    ctx: &SharedContext,
    dialogue: &BotDialogue,
    caller: &Caller,
    target: Target,
    flow: AdminFlow,
) -> anyhow::Result<Option<String>> {
    drive_input(bot, ctx, dialogue, caller, target, Input::StartAdminFlow(flow)).await
}

async fn handle_admin_action(
    bot: &Bot,
    ctx: &SharedContext,
    dialogue: &BotDialogue,
    caller: &Caller,
    target: Target,
    action: CallbackAction,
) -> anyhow::Result<Option<String>> {
    let lang = caller.lang();
    let owner_id = ctx.owner_id();

    let Some(role) = ctx.store.read(|data| data.role_of(caller.user_id, owner_id)).await else {
        warn!(user_id = caller.user_id, action = ?action, "Non-admin pressed an admin button");
        return Ok(Some(t_lang("admin-denied", lang)));
    };

    if let Some(permission) = required_permission(&action) {
        if !role.allows(permission) {
            warn!(user_id = caller.user_id, role = role.as_str(), action = ?action, "Admin action not allowed for role");
            return Ok(Some(t_lang("admin-denied", lang)));
        }
    }

    let screen = match action {
        CallbackAction::AdminHome => admin_panel_screen(role, lang),

        CallbackAction::AdminMenus => ctx.store.read(|data| menus_screen(&data.menu_config, lang)).await,
        CallbackAction::EditMenu(key) => {
            match ctx
                .store
                .read(|data| data.menu_config.get(&key).map(|item| menu_item_screen(&key, item, lang)))
                .await
            {
                Some(screen) => screen,
                None => return Ok(Some(t_lang("menu-item-missing", lang))),
            }
        }
        CallbackAction::ToggleMenu(key) => {
            let toggled = ctx.store.update(|data| data.menu_config.toggle(&key)).await?;
            if toggled.is_none() {
                return Ok(Some(t_lang("menu-item-missing", lang)));
            }
            info!(user_id = caller.user_id, menu_key = %key, active = ?toggled, "Menu item toggled");
            let screen = ctx
                .store
                .read(|data| data.menu_config.get(&key).map(|item| menu_item_screen(&key, item, lang)))
                .await;
            if let Some(screen) = screen {
                show(bot, target, screen).await?;
            }
            return Ok(Some(t_lang("saved", lang)));
        }
        CallbackAction::SetMenuLabel(key) => {
            return start_flow(bot, ctx, dialogue, caller, target, AdminFlow::EditMenuLabel { key }).await;
        }
        CallbackAction::SetMenuUrl(key) => {
            return start_flow(bot, ctx, dialogue, caller, target, AdminFlow::EditMenuUrl { key }).await;
        }

        CallbackAction::Channel => ctx.store.read(|data| channel_screen(data.menu_config.get("channel"), lang)).await,
        CallbackAction::ToggleChannel => {
            let toggled = ctx.store.update(|data| data.menu_config.toggle("channel")).await?;
            info!(user_id = caller.user_id, active = ?toggled, "Channel button toggled");
            let screen = ctx
                .store
                .read(|data| channel_screen(data.menu_config.get("channel"), lang))
                .await;
            show(bot, target, screen).await?;
            return Ok(Some(t_lang("saved", lang)));
        }
        CallbackAction::SetChannelUrl => {
            return start_flow(bot, ctx, dialogue, caller, target, AdminFlow::SetChannelUrl).await;
        }

        CallbackAction::AddCar => return start_flow(bot, ctx, dialogue, caller, target, AdminFlow::AddCar).await,
        CallbackAction::Import(kind) => {
            return drive_input(bot, ctx, dialogue, caller, target, Input::StartCatalogUpload(kind)).await;
        }
        CallbackAction::SetSupport => {
            return start_flow(bot, ctx, dialogue, caller, target, AdminFlow::SetSupport).await;
        }

        CallbackAction::Admins => ctx.store.read(|data| admins_screen(data, lang)).await,
        CallbackAction::AddAdmin => return start_flow(bot, ctx, dialogue, caller, target, AdminFlow::AddAdmin).await,
        CallbackAction::RemoveAdmin(user_id) => {
            let removed = ctx.store.update(|data| data.remove_admin(user_id)).await?;
            info!(user_id = caller.user_id, removed_admin = user_id, removed, "Admin removed");
            let screen = ctx.store.read(|data| admins_screen(data, lang)).await;
            show(bot, target, screen).await?;
            return Ok(Some(t_lang("saved", lang)));
        }
        CallbackAction::CycleRole(user_id) => {
            let role: Option<AdminRole> = ctx.store.update(|data| data.cycle_role(user_id)).await?;
            info!(user_id = caller.user_id, admin = user_id, role = ?role, "Admin role changed");
            let screen = ctx.store.read(|data| admins_screen(data, lang)).await;
            show(bot, target, screen).await?;
            return Ok(Some(t_lang("saved", lang)));
        }

        CallbackAction::Backup => ctx.store.read(|data| backup_screen(data.backup_interval, lang)).await,
        CallbackAction::BackupNow => {
            return match send_backup(bot, &ctx.store, target.chat_id).await {
                Ok(()) => Ok(Some(t_lang("backup-sent", lang))),
                Err(e) => {
                    error!(user_id = caller.user_id, error = %e, "Manual backup failed");
                    Ok(Some(t_lang("backup-failed", lang)))
                }
            };
        }
        CallbackAction::BackupInterval(hours) => {
            ctx.store.update(|data| data.backup_interval = hours).await?;
            info!(user_id = caller.user_id, hours, "Backup interval changed");
            let screen = backup_screen(hours, lang);
            show(bot, target, screen).await?;
            return Ok(Some(t_lang("saved", lang)));
        }

        CallbackAction::Sponsor => ctx.store.read(|data| sponsor_screen(&data.sponsor, lang)).await,
        CallbackAction::SetSponsor => return start_flow(bot, ctx, dialogue, caller, target, AdminFlow::SetSponsor).await,
        CallbackAction::ClearSponsor => {
            ctx.store.update(|data| data.sponsor = Default::default()).await?;
            info!(user_id = caller.user_id, "Sponsor cleared");
            admin_notice_screen(t_lang("sponsor-cleared", lang), lang)
        }

        CallbackAction::Broadcast => return start_flow(bot, ctx, dialogue, caller, target, AdminFlow::Broadcast).await,

        other => {
            debug!(action = ?other, "Non-admin action routed to admin handler");
            notice_screen(t_lang("callback-unknown", lang), lang)
        }
    };

    show(bot, target, screen).await?;
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogKind;

    #[test]
    fn test_every_admin_button_is_gated() {
        let gated = [
            CallbackAction::AdminMenus,
            CallbackAction::ToggleChannel,
            CallbackAction::Import(CatalogKind::Cars),
            CallbackAction::RemoveAdmin(5),
            CallbackAction::BackupNow,
            CallbackAction::ClearSponsor,
            CallbackAction::Broadcast,
        ];
        for action in gated {
            assert!(required_permission(&action).is_some(), "{action:?}");
        }
        assert_eq!(required_permission(&CallbackAction::AdminHome), None);
    }

    #[test]
    fn test_editor_cannot_manage_admins() {
        let permission = required_permission(&CallbackAction::CycleRole(7)).unwrap();
        assert!(!AdminRole::Editor.allows(permission));
        assert!(AdminRole::Full.allows(permission));
    }
}
