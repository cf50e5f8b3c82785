//! UI Builder module for creating keyboards and formatting messages

use reqwest::Url;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, WebAppInfo};
use tracing::warn;

use crate::catalog::{CarCatalog, CatalogKind, MobileCatalog, SearchHit};
use crate::conversation::Estimate;
use crate::estimator::CONDITION_CODES;
use crate::localization::{t_args_lang, t_lang};
use crate::menu::{MenuConfig, MenuItem, MenuKind};
use crate::store::{AdminAction, AdminRole, BotData, Sponsor, SupportConfig, SupportMode};

use super::callback_data::CallbackAction;

/// Main menu rows, by menu key
const MAIN_MENU_ROWS: [&[&str]; 4] = [
    &["calc", "market"],
    &["prices", "estimate"],
    &["mobile_webapp", "mobile_list"],
    &["search", "support"],
];

/// Text plus inline keyboard, rendered either as a new message or an edit
#[derive(Clone, Debug)]
pub struct Screen {
    pub text: String,
    pub keyboard: InlineKeyboardMarkup,
}

impl Screen {
    pub fn new(text: impl Into<String>, rows: Vec<Vec<InlineKeyboardButton>>) -> Self {
        Self {
            text: text.into(),
            keyboard: InlineKeyboardMarkup::new(rows),
        }
    }
}

/// Callback button, skipped when its payload is too long for Telegram
pub fn callback_button(label: impl Into<String>, action: CallbackAction) -> Option<InlineKeyboardButton> {
    match action.to_data() {
        Some(data) => Some(InlineKeyboardButton::callback(label, data)),
        None => {
            warn!(action = ?action, "Callback data too long, button skipped");
            None
        }
    }
}

fn back_row(label_key: &str, action: CallbackAction, language_code: Option<&str>) -> Vec<InlineKeyboardButton> {
    callback_button(t_lang(label_key, language_code), action)
        .into_iter()
        .collect()
}

fn main_menu_row(language_code: Option<&str>) -> Vec<InlineKeyboardButton> {
    back_row("button-main-menu", CallbackAction::MainMenu, language_code)
}

fn cancel_row(language_code: Option<&str>) -> Vec<InlineKeyboardButton> {
    back_row("button-cancel", CallbackAction::Cancel, language_code)
}

/// Lay out buttons `per_row` at a time
pub fn chunk_buttons(buttons: Vec<InlineKeyboardButton>, per_row: usize) -> Vec<Vec<InlineKeyboardButton>> {
    buttons
        .chunks(per_row.max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}

/// Group digits in threes: `1234567` → `1,234,567`
pub fn format_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if value < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Catalog price with thousands separators, keeping up to two decimals
pub fn format_price(price: f64) -> String {
    let cents = (price * 100.0).round() as i64;
    let grouped = format_thousands(cents / 100);
    match (cents % 100).abs() {
        0 => grouped,
        f if f % 10 == 0 => format!("{grouped}.{}", f / 10),
        f => format!("{grouped}.{f:02}"),
    }
}

fn parse_url(key: &str, raw: Option<&str>) -> Option<Url> {
    let raw = raw?;
    match Url::parse(raw) {
        Ok(url) => Some(url),
        Err(e) => {
            warn!(menu_key = key, url = raw, error = %e, "Invalid menu URL, button skipped");
            None
        }
    }
}

fn internal_action(key: &str) -> Option<CallbackAction> {
    match key {
        "prices" => Some(CallbackAction::Prices),
        "estimate" => Some(CallbackAction::Estimate),
        "mobile_list" => Some(CallbackAction::Mobiles),
        "search" => Some(CallbackAction::Search),
        "support" => Some(CallbackAction::Support),
        _ => None,
    }
}

fn menu_button(key: &str, item: &MenuItem, support: &SupportConfig) -> Option<InlineKeyboardButton> {
    let label = item.label.clone();
    match item.kind {
        MenuKind::Webapp => parse_url(key, item.url.as_deref())
            .map(|url| InlineKeyboardButton::web_app(label, WebAppInfo { url })),
        MenuKind::Link => parse_url(key, item.url.as_deref()).map(|url| InlineKeyboardButton::url(label, url)),
        MenuKind::Internal => match internal_action(key) {
            Some(action) => callback_button(label, action),
            None => {
                warn!(menu_key = key, "Internal menu item has no handler");
                None
            }
        },
        MenuKind::Dynamic => {
            if support.mode == SupportMode::Link {
                if let Some(url) = parse_url(key, Some(&support.value)) {
                    return Some(InlineKeyboardButton::url(label, url));
                }
            }
            callback_button(label, CallbackAction::Support)
        }
    }
}

/// Main menu built from the active menu items
pub fn main_menu_keyboard(data: &BotData, is_admin: bool, language_code: Option<&str>) -> InlineKeyboardMarkup {
    let menu: &MenuConfig = &data.menu_config;
    let button = |key: &str| {
        menu.active(key)
            .and_then(|item| menu_button(key, item, &data.support_config))
    };

    let mut rows: Vec<Vec<InlineKeyboardButton>> = MAIN_MENU_ROWS
        .iter()
        .map(|keys| keys.iter().filter_map(|key| button(*key)).collect::<Vec<_>>())
        .filter(|row| !row.is_empty())
        .collect();

    if is_admin {
        rows.push(back_row("button-admin-panel", CallbackAction::AdminHome, language_code));
    }

    if let Some(channel) = button("channel") {
        rows.push(vec![channel]);
    }

    if let Some((name, url)) = data.sponsor.link() {
        match Url::parse(url) {
            Ok(url) => rows.push(vec![InlineKeyboardButton::url(format!("⭐ {name}"), url)]),
            Err(e) => warn!(url, error = %e, "Invalid sponsor URL, button skipped"),
        }
    }

    InlineKeyboardMarkup::new(rows)
}

pub fn main_menu_screen(text: String, data: &BotData, is_admin: bool, language_code: Option<&str>) -> Screen {
    Screen {
        text,
        keyboard: main_menu_keyboard(data, is_admin, language_code),
    }
}

pub fn welcome_text(first_name: &str, language_code: Option<&str>) -> String {
    let today = chrono::Local::now().format("%Y-%m-%d").to_string();
    t_args_lang(
        "welcome",
        &[("name", first_name), ("date", &today)],
        language_code,
    )
}

/// A text with just a way back to the main menu
pub fn notice_screen(text: String, language_code: Option<&str>) -> Screen {
    Screen::new(text, vec![main_menu_row(language_code)])
}

/// A prompt for typed input with a cancel button
pub fn prompt_screen(text: String, language_code: Option<&str>) -> Screen {
    Screen::new(text, vec![cancel_row(language_code)])
}

/// Result of an admin action, leading back to the admin panel
pub fn admin_notice_screen(text: String, language_code: Option<&str>) -> Screen {
    Screen::new(
        text,
        vec![
            back_row("button-admin-panel", CallbackAction::AdminHome, language_code),
            main_menu_row(language_code),
        ],
    )
}

// ---------------------------------------------------------------------------
// Price list browsing
// ---------------------------------------------------------------------------

pub fn price_brands_screen(catalog: &CarCatalog, language_code: Option<&str>) -> Screen {
    let brands = catalog.brands();
    if brands.is_empty() {
        return notice_screen(t_lang("catalog-empty", language_code), language_code);
    }

    let buttons = brands
        .into_iter()
        .filter_map(|brand| callback_button(brand.clone(), CallbackAction::PriceBrand(brand)))
        .collect();
    let mut rows = chunk_buttons(buttons, 2);
    rows.push(main_menu_row(language_code));
    Screen::new(t_lang("prices-choose-brand", language_code), rows)
}

pub fn price_models_screen(catalog: &CarCatalog, brand: &str, language_code: Option<&str>) -> Option<Screen> {
    let models = catalog.brand(brand)?.models.iter().enumerate();
    let buttons = models
        .filter_map(|(i, model)| {
            callback_button(
                model.name.clone(),
                CallbackAction::PriceModel {
                    brand: brand.to_string(),
                    model: i,
                },
            )
        })
        .collect();

    let mut rows = chunk_buttons(buttons, 2);
    rows.push(back_row("button-back", CallbackAction::Prices, language_code));
    Some(Screen::new(
        t_args_lang("prices-choose-model", &[("brand", brand)], language_code),
        rows,
    ))
}

pub fn price_variants_screen(
    catalog: &CarCatalog,
    brand: &str,
    model_index: usize,
    language_code: Option<&str>,
) -> Option<Screen> {
    let model = catalog.brand(brand)?.models.get(model_index)?;
    let buttons = model
        .variants
        .iter()
        .enumerate()
        .filter_map(|(i, variant)| {
            callback_button(
                variant.name.clone(),
                CallbackAction::PriceVariant {
                    brand: brand.to_string(),
                    model: model_index,
                    variant: i,
                },
            )
        })
        .collect();

    let mut rows = chunk_buttons(buttons, 1);
    rows.push(back_row(
        "button-back",
        CallbackAction::PriceBrand(brand.to_string()),
        language_code,
    ));
    Some(Screen::new(
        t_args_lang(
            "prices-choose-variant",
            &[("brand", brand), ("model", &model.name)],
            language_code,
        ),
        rows,
    ))
}

pub fn price_detail_screen(
    catalog: &CarCatalog,
    brand: &str,
    model_index: usize,
    variant_index: usize,
    language_code: Option<&str>,
) -> Option<Screen> {
    let model = catalog.brand(brand)?.models.get(model_index)?;
    let variant = model.variants.get(variant_index)?;
    let market = format_price(variant.market_price);
    let factory = format_price(variant.factory_price);

    let text = t_args_lang(
        "price-detail",
        &[
            ("brand", brand),
            ("model", &model.name),
            ("variant", &variant.name),
            ("market", &market),
            ("factory", &factory),
        ],
        language_code,
    );

    Some(Screen::new(
        text,
        vec![
            back_row(
                "button-back",
                CallbackAction::PriceModel {
                    brand: brand.to_string(),
                    model: model_index,
                },
                language_code,
            ),
            main_menu_row(language_code),
        ],
    ))
}

// ---------------------------------------------------------------------------
// Mobile list browsing
// ---------------------------------------------------------------------------

pub fn mobile_brands_screen(catalog: &MobileCatalog, language_code: Option<&str>) -> Screen {
    let brands = catalog.brands();
    if brands.is_empty() {
        return notice_screen(t_lang("catalog-empty", language_code), language_code);
    }

    let buttons = brands
        .into_iter()
        .map(|brand| {
            let label = catalog
                .brand(&brand)
                .and_then(|b| b.name.clone())
                .unwrap_or_else(|| brand.clone());
            (label, brand)
        })
        .filter_map(|(label, brand)| callback_button(label, CallbackAction::MobileBrand(brand)))
        .collect();
    let mut rows = chunk_buttons(buttons, 2);
    rows.push(main_menu_row(language_code));
    Screen::new(t_lang("mobiles-choose-brand", language_code), rows)
}

pub fn mobile_models_screen(catalog: &MobileCatalog, brand: &str, language_code: Option<&str>) -> Option<Screen> {
    let buttons = catalog
        .brand(brand)?
        .models
        .iter()
        .enumerate()
        .filter_map(|(i, model)| {
            callback_button(
                model.name.clone(),
                CallbackAction::MobileModel {
                    brand: brand.to_string(),
                    model: i,
                },
            )
        })
        .collect();

    let mut rows = chunk_buttons(buttons, 2);
    rows.push(back_row("button-back", CallbackAction::Mobiles, language_code));
    Some(Screen::new(
        t_args_lang("mobiles-choose-model", &[("brand", brand)], language_code),
        rows,
    ))
}

pub fn mobile_detail_screen(
    catalog: &MobileCatalog,
    brand: &str,
    model_index: usize,
    language_code: Option<&str>,
) -> Option<Screen> {
    let model = catalog.brand(brand)?.models.get(model_index)?;
    let storage = model
        .storage
        .clone()
        .unwrap_or_else(|| t_lang("mobile-storage-unknown", language_code));
    let price = format_price(model.price);

    let text = t_args_lang(
        "mobile-detail",
        &[
            ("brand", brand),
            ("model", &model.name),
            ("storage", &storage),
            ("price", &price),
        ],
        language_code,
    );

    Some(Screen::new(
        text,
        vec![
            back_row(
                "button-back",
                CallbackAction::MobileBrand(brand.to_string()),
                language_code,
            ),
            main_menu_row(language_code),
        ],
    ))
}

// ---------------------------------------------------------------------------
// Estimation flow
// ---------------------------------------------------------------------------

/// Brand buttons carry the brand's position so long names stay under the payload limit
pub fn estimate_brands_screen(brands: &[String], not_found: bool, language_code: Option<&str>) -> Screen {
    if brands.is_empty() {
        return notice_screen(t_lang("catalog-empty", language_code), language_code);
    }

    let text = if not_found {
        t_lang("estimate-brand-not-found", language_code)
    } else {
        t_lang("estimate-choose-brand", language_code)
    };
    let buttons = brands
        .iter()
        .enumerate()
        .filter_map(|(i, brand)| callback_button(brand.clone(), CallbackAction::EstimateBrand(i)))
        .collect();
    let mut rows = chunk_buttons(buttons, 2);
    rows.push(cancel_row(language_code));
    Screen::new(text, rows)
}

pub fn estimate_models_screen(
    brand: &str,
    models: &[String],
    not_found: bool,
    language_code: Option<&str>,
) -> Screen {
    let key = if not_found {
        "estimate-model-not-found"
    } else {
        "estimate-choose-model"
    };
    let text = t_args_lang(key, &[("brand", brand)], language_code);
    let buttons = models
        .iter()
        .enumerate()
        .filter_map(|(i, model)| callback_button(model.clone(), CallbackAction::EstimateModel(i)))
        .collect();
    let mut rows = chunk_buttons(buttons, 2);
    rows.push(cancel_row(language_code));
    Screen::new(text, rows)
}

pub fn estimate_years_screen(years: &[i32], language_code: Option<&str>) -> Screen {
    let buttons = years
        .iter()
        .filter_map(|year| callback_button(year.to_string(), CallbackAction::EstimateYear(*year)))
        .collect();
    let mut rows = chunk_buttons(buttons, 3);
    rows.push(cancel_row(language_code));
    Screen::new(t_lang("estimate-choose-year", language_code), rows)
}

pub fn estimate_mileage_screen(invalid: bool, language_code: Option<&str>) -> Screen {
    let key = if invalid {
        "estimate-invalid-mileage"
    } else {
        "estimate-ask-mileage"
    };
    prompt_screen(t_lang(key, language_code), language_code)
}

pub fn estimate_conditions_screen(language_code: Option<&str>) -> Screen {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = CONDITION_CODES
        .iter()
        .enumerate()
        .filter_map(|(i, code)| callback_button(t_lang(code.label_key, language_code), CallbackAction::EstimateCondition(i)))
        .map(|button| vec![button])
        .collect();
    rows.push(cancel_row(language_code));
    Screen::new(t_lang("estimate-choose-condition", language_code), rows)
}

pub fn estimate_result_screen(estimate: &Estimate, language_code: Option<&str>) -> Screen {
    let year = estimate.year.to_string();
    let mileage = format_thousands(i64::try_from(estimate.mileage).unwrap_or(i64::MAX));
    let condition = t_lang(estimate.condition_label_key, language_code);
    let price = format_thousands(estimate.price);

    let text = t_args_lang(
        "estimate-result",
        &[
            ("brand", &estimate.brand),
            ("model", &estimate.model),
            ("year", &year),
            ("mileage", &mileage),
            ("condition", &condition),
            ("price", &price),
        ],
        language_code,
    );

    let mut rows = Vec::new();
    rows.push(back_row("button-new-estimate", CallbackAction::Estimate, language_code));
    rows.push(main_menu_row(language_code));
    Screen::new(text, rows)
}

// ---------------------------------------------------------------------------
// Search and support
// ---------------------------------------------------------------------------

pub fn search_results_screen(query: &str, hits: &[SearchHit], language_code: Option<&str>) -> Screen {
    if hits.is_empty() {
        let mut screen = notice_screen(
            t_args_lang("search-no-results", &[("query", query)], language_code),
            language_code,
        );
        screen.keyboard = InlineKeyboardMarkup::new(vec![
            back_row("button-search-again", CallbackAction::Search, language_code),
            main_menu_row(language_code),
        ]);
        return screen;
    }

    let mut text = t_args_lang("search-results", &[("query", query)], language_code);
    for hit in hits {
        text.push('\n');
        match hit {
            SearchHit::Car { brand, model, variant } => text.push_str(&format!(
                "🚗 {brand} {model} {} : {}",
                variant.name,
                format_price(variant.market_price)
            )),
            SearchHit::Mobile { brand, model } => text.push_str(&format!(
                "📱 {brand} {}{} : {}",
                model.name,
                model
                    .storage
                    .as_deref()
                    .map(|s| format!(" ({s})"))
                    .unwrap_or_default(),
                format_price(model.price)
            )),
        }
    }

    Screen::new(
        text,
        vec![
            back_row("button-search-again", CallbackAction::Search, language_code),
            main_menu_row(language_code),
        ],
    )
}

pub fn support_screen(support: &SupportConfig, language_code: Option<&str>) -> Screen {
    if support.mode == SupportMode::Link {
        if let Some(url) = parse_url("support", Some(&support.value)) {
            return Screen::new(
                t_lang("support-link", language_code),
                vec![
                    vec![InlineKeyboardButton::url(t_lang("button-contact-support", language_code), url)],
                    main_menu_row(language_code),
                ],
            );
        }
    }
    notice_screen(support.value.clone(), language_code)
}

// ---------------------------------------------------------------------------
// Admin panel
// ---------------------------------------------------------------------------

pub fn admin_panel_screen(role: AdminRole, language_code: Option<&str>) -> Screen {
    let entries: [(&str, CallbackAction, AdminAction); 10] = [
        ("admin-button-menus", CallbackAction::AdminMenus, AdminAction::ManageMenus),
        ("admin-button-channel", CallbackAction::Channel, AdminAction::ChannelSettings),
        ("admin-button-add-car", CallbackAction::AddCar, AdminAction::AddCar),
        (
            "admin-button-import-cars",
            CallbackAction::Import(CatalogKind::Cars),
            AdminAction::ImportCatalog,
        ),
        (
            "admin-button-import-mobiles",
            CallbackAction::Import(CatalogKind::Mobiles),
            AdminAction::ImportCatalog,
        ),
        ("admin-button-support", CallbackAction::SetSupport, AdminAction::SetSupport),
        ("admin-button-admins", CallbackAction::Admins, AdminAction::ManageAdmins),
        ("admin-button-backup", CallbackAction::Backup, AdminAction::Backup),
        ("admin-button-sponsor", CallbackAction::Sponsor, AdminAction::Sponsor),
        ("admin-button-broadcast", CallbackAction::Broadcast, AdminAction::Broadcast),
    ];

    let buttons = entries
        .into_iter()
        .filter(|(_, _, action)| role.allows(*action))
        .filter_map(|(key, callback, _)| callback_button(t_lang(key, language_code), callback))
        .collect();

    let mut rows = chunk_buttons(buttons, 2);
    rows.push(main_menu_row(language_code));

    let role_name = t_lang(&format!("role-{}", role.as_str()), language_code);
    Screen::new(
        t_args_lang("admin-panel-title", &[("role", &role_name)], language_code),
        rows,
    )
}

fn status_icon(active: bool) -> &'static str {
    if active {
        "✅"
    } else {
        "❌"
    }
}

pub fn menus_screen(menu: &MenuConfig, language_code: Option<&str>) -> Screen {
    let buttons = menu
        .ordered()
        .into_iter()
        .filter_map(|(key, item)| {
            callback_button(
                format!("{} {}", status_icon(item.active), item.label),
                CallbackAction::EditMenu(key.to_string()),
            )
        })
        .collect();

    let mut rows = chunk_buttons(buttons, 1);
    rows.push(back_row("button-back", CallbackAction::AdminHome, language_code));
    Screen::new(t_lang("admin-menus-title", language_code), rows)
}

pub fn menu_item_screen(key: &str, item: &MenuItem, language_code: Option<&str>) -> Screen {
    let status = t_lang(
        if item.active { "status-active" } else { "status-inactive" },
        language_code,
    );
    let url = item.url.clone().unwrap_or_else(|| "-".to_string());
    let text = t_args_lang(
        "admin-menu-item",
        &[("label", &item.label), ("status", &status), ("url", &url)],
        language_code,
    );

    let mut buttons = vec![
        callback_button(
            t_lang("admin-button-toggle", language_code),
            CallbackAction::ToggleMenu(key.to_string()),
        ),
        callback_button(
            t_lang("admin-button-rename", language_code),
            CallbackAction::SetMenuLabel(key.to_string()),
        ),
    ];
    if matches!(item.kind, MenuKind::Webapp | MenuKind::Link) {
        buttons.push(callback_button(
            t_lang("admin-button-set-url", language_code),
            CallbackAction::SetMenuUrl(key.to_string()),
        ));
    }

    let mut rows = chunk_buttons(buttons.into_iter().flatten().collect(), 2);
    rows.push(back_row("button-back", CallbackAction::AdminMenus, language_code));
    Screen::new(text, rows)
}

pub fn channel_screen(item: Option<&MenuItem>, language_code: Option<&str>) -> Screen {
    let (active, url) = item
        .map(|item| (item.active, item.url.clone().unwrap_or_else(|| "-".to_string())))
        .unwrap_or((false, "-".to_string()));
    let status = t_lang(
        if active { "status-active" } else { "status-inactive" },
        language_code,
    );
    let text = t_args_lang(
        "admin-channel-title",
        &[("status", &status), ("url", &url)],
        language_code,
    );

    let buttons = [
        callback_button(t_lang("admin-button-toggle", language_code), CallbackAction::ToggleChannel),
        callback_button(t_lang("admin-button-set-url", language_code), CallbackAction::SetChannelUrl),
    ];
    let mut rows = chunk_buttons(buttons.into_iter().flatten().collect(), 2);
    rows.push(back_row("button-back", CallbackAction::AdminHome, language_code));
    Screen::new(text, rows)
}

pub fn admins_screen(data: &BotData, language_code: Option<&str>) -> Screen {
    let mut rows = Vec::new();

    for admin in &data.admins {
        let role = data
            .roles
            .get(&admin.to_string())
            .copied()
            .unwrap_or(AdminRole::Editor);
        let role_name = t_lang(&format!("role-{}", role.as_str()), language_code);
        let row: Vec<InlineKeyboardButton> = [
            callback_button(format!("👤 {admin} ({role_name})"), CallbackAction::CycleRole(*admin)),
            callback_button("🗑", CallbackAction::RemoveAdmin(*admin)),
        ]
        .into_iter()
        .flatten()
        .collect();
        rows.push(row);
    }

    rows.push(back_row("admin-button-add-admin", CallbackAction::AddAdmin, language_code));
    rows.push(back_row("button-back", CallbackAction::AdminHome, language_code));

    let count = data.admins.len().to_string();
    Screen::new(
        t_args_lang("admin-admins-title", &[("count", &count)], language_code),
        rows,
    )
}

pub fn backup_screen(interval_hours: u64, language_code: Option<&str>) -> Screen {
    let status = if interval_hours == 0 {
        t_lang("backup-status-off", language_code)
    } else {
        t_args_lang(
            "backup-status-every",
            &[("hours", &interval_hours.to_string())],
            language_code,
        )
    };

    let buttons = [
        callback_button(t_lang("admin-button-backup-now", language_code), CallbackAction::BackupNow),
        callback_button(t_lang("admin-button-backup-1h", language_code), CallbackAction::BackupInterval(1)),
        callback_button(t_lang("admin-button-backup-24h", language_code), CallbackAction::BackupInterval(24)),
        callback_button(t_lang("admin-button-backup-off", language_code), CallbackAction::BackupInterval(0)),
    ];
    let mut rows = chunk_buttons(buttons.into_iter().flatten().collect(), 2);
    rows.push(back_row("button-back", CallbackAction::AdminHome, language_code));
    Screen::new(
        t_args_lang("admin-backup-title", &[("status", &status)], language_code),
        rows,
    )
}

pub fn sponsor_screen(sponsor: &Sponsor, language_code: Option<&str>) -> Screen {
    let text = match sponsor.link() {
        Some((name, url)) => t_args_lang(
            "admin-sponsor-current",
            &[("name", name), ("url", url)],
            language_code,
        ),
        None => t_lang("admin-sponsor-none", language_code),
    };

    let buttons = [
        callback_button(t_lang("admin-button-sponsor-set", language_code), CallbackAction::SetSponsor),
        callback_button(t_lang("admin-button-sponsor-clear", language_code), CallbackAction::ClearSponsor),
    ];
    let mut rows = chunk_buttons(buttons.into_iter().flatten().collect(), 2);
    rows.push(back_row("button-back", CallbackAction::AdminHome, language_code));
    Screen::new(text, rows)
}
