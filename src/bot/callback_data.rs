//! Typed inline-button payloads
//!
//! Telegram limits callback data to 64 bytes, so payloads are short prefixed
//! strings. Names that can contain `:` (brands, models) are always the first
//! free-form segment and numeric segments are split off from the right.

use crate::catalog::CatalogKind;

/// Telegram's limit on `callback_data`
pub const MAX_CALLBACK_DATA_LEN: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    MainMenu,
    Cancel,
    Support,
    Search,

    // Price list browsing
    Prices,
    PriceBrand(String),
    PriceModel { brand: String, model: usize },
    PriceVariant { brand: String, model: usize, variant: usize },

    // Mobile list browsing
    Mobiles,
    MobileBrand(String),
    MobileModel { brand: String, model: usize },

    // Estimation flow
    Estimate,
    /// Index into the brand list
    EstimateBrand(usize),
    /// Index into the selected brand's model list
    EstimateModel(usize),
    EstimateYear(i32),
    EstimateCondition(usize),

    // Admin panel
    AdminHome,
    AdminMenus,
    EditMenu(String),
    ToggleMenu(String),
    SetMenuLabel(String),
    SetMenuUrl(String),
    Channel,
    ToggleChannel,
    SetChannelUrl,
    AddCar,
    Import(CatalogKind),
    SetSupport,
    Admins,
    AddAdmin,
    RemoveAdmin(i64),
    CycleRole(i64),
    Backup,
    BackupNow,
    /// Automatic backup interval in hours, 0 turns it off
    BackupInterval(u64),
    Sponsor,
    SetSponsor,
    ClearSponsor,
    Broadcast,
}

fn kind_segment(kind: CatalogKind) -> &'static str {
    match kind {
        CatalogKind::Cars => "cars",
        CatalogKind::Mobiles => "mobiles",
    }
}

/// Split `"<name>:<n>"` from the right
fn name_and_index(rest: &str) -> Option<(String, usize)> {
    let (name, index) = rest.rsplit_once(':')?;
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), index.parse().ok()?))
}

fn non_empty(rest: &str) -> Option<String> {
    (!rest.is_empty()).then(|| rest.to_string())
}

impl CallbackAction {
    pub fn encode(&self) -> String {
        use CallbackAction::*;

        match self {
            MainMenu => "main".to_string(),
            Cancel => "cancel".to_string(),
            Support => "support".to_string(),
            Search => "search".to_string(),
            Prices => "prices".to_string(),
            PriceBrand(brand) => format!("pb:{brand}"),
            PriceModel { brand, model } => format!("pm:{brand}:{model}"),
            PriceVariant {
                brand,
                model,
                variant,
            } => format!("pv:{brand}:{model}:{variant}"),
            Mobiles => "mobiles".to_string(),
            MobileBrand(brand) => format!("mb:{brand}"),
            MobileModel { brand, model } => format!("mm:{brand}:{model}"),
            Estimate => "est".to_string(),
            EstimateBrand(brand) => format!("eb:{brand}"),
            EstimateModel(model) => format!("em:{model}"),
            EstimateYear(year) => format!("ey:{year}"),
            EstimateCondition(index) => format!("ec:{index}"),
            AdminHome => "adm".to_string(),
            AdminMenus => "adm:menus".to_string(),
            EditMenu(key) => format!("adm:menu:{key}"),
            ToggleMenu(key) => format!("adm:mt:{key}"),
            SetMenuLabel(key) => format!("adm:ml:{key}"),
            SetMenuUrl(key) => format!("adm:mu:{key}"),
            Channel => "adm:ch".to_string(),
            ToggleChannel => "adm:ch:t".to_string(),
            SetChannelUrl => "adm:ch:u".to_string(),
            AddCar => "adm:car".to_string(),
            Import(kind) => format!("adm:imp:{}", kind_segment(*kind)),
            SetSupport => "adm:support".to_string(),
            Admins => "adm:admins".to_string(),
            AddAdmin => "adm:admins:add".to_string(),
            RemoveAdmin(id) => format!("adm:rm:{id}"),
            CycleRole(id) => format!("adm:role:{id}"),
            Backup => "adm:bk".to_string(),
            BackupNow => "adm:bk:now".to_string(),
            BackupInterval(hours) => format!("adm:bk:{hours}"),
            Sponsor => "adm:sp".to_string(),
            SetSponsor => "adm:sp:set".to_string(),
            ClearSponsor => "adm:sp:clear".to_string(),
            Broadcast => "adm:bc".to_string(),
        }
    }

    pub fn parse(data: &str) -> Option<Self> {
        use CallbackAction::*;

        let action = match data {
            "main" => MainMenu,
            "cancel" => Cancel,
            "support" => Support,
            "search" => Search,
            "prices" => Prices,
            "mobiles" => Mobiles,
            "est" => Estimate,
            "adm" => AdminHome,
            "adm:menus" => AdminMenus,
            "adm:ch" => Channel,
            "adm:ch:t" => ToggleChannel,
            "adm:ch:u" => SetChannelUrl,
            "adm:car" => AddCar,
            "adm:imp:cars" => Import(CatalogKind::Cars),
            "adm:imp:mobiles" => Import(CatalogKind::Mobiles),
            "adm:support" => SetSupport,
            "adm:admins" => Admins,
            "adm:admins:add" => AddAdmin,
            "adm:bk" => Backup,
            "adm:bk:now" => BackupNow,
            "adm:sp" => Sponsor,
            "adm:sp:set" => SetSponsor,
            "adm:sp:clear" => ClearSponsor,
            "adm:bc" => Broadcast,
            _ => return Self::parse_with_payload(data),
        };
        Some(action)
    }

    fn parse_with_payload(data: &str) -> Option<Self> {
        use CallbackAction::*;

        let (prefix, rest) = if let Some(rest) = data.strip_prefix("adm:") {
            let (sub, rest) = rest.split_once(':')?;
            return match sub {
                "menu" => non_empty(rest).map(EditMenu),
                "mt" => non_empty(rest).map(ToggleMenu),
                "ml" => non_empty(rest).map(SetMenuLabel),
                "mu" => non_empty(rest).map(SetMenuUrl),
                "rm" => rest.parse().ok().map(RemoveAdmin),
                "role" => rest.parse().ok().map(CycleRole),
                "bk" => rest.parse().ok().map(BackupInterval),
                _ => None,
            };
        } else {
            data.split_once(':')?
        };

        match prefix {
            "pb" => non_empty(rest).map(PriceBrand),
            "pm" => name_and_index(rest).map(|(brand, model)| PriceModel { brand, model }),
            "pv" => {
                let (head, variant) = rest.rsplit_once(':')?;
                let (brand, model) = name_and_index(head)?;
                Some(PriceVariant {
                    brand,
                    model,
                    variant: variant.parse().ok()?,
                })
            }
            "mb" => non_empty(rest).map(MobileBrand),
            "mm" => name_and_index(rest).map(|(brand, model)| MobileModel { brand, model }),
            "eb" => rest.parse().ok().map(EstimateBrand),
            "em" => rest.parse().ok().map(EstimateModel),
            "ey" => rest.parse().ok().map(EstimateYear),
            "ec" => rest.parse().ok().map(EstimateCondition),
            _ => None,
        }
    }

    /// Encoded payload, or `None` when it would exceed Telegram's limit
    pub fn to_data(&self) -> Option<String> {
        let data = self.encode();
        (data.len() <= MAX_CALLBACK_DATA_LEN).then_some(data)
    }
}
