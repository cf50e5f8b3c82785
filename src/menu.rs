//! Main-menu button configuration editable from the admin panel.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Menu keys in the order the admin panel lists them
pub const MENU_KEYS: [&str; 9] = [
    "calc",
    "market",
    "prices",
    "estimate",
    "mobile_webapp",
    "mobile_list",
    "search",
    "channel",
    "support",
];

/// How a menu button behaves when pressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuKind {
    /// Opens a Telegram web app at `url`
    Webapp,
    /// Handled by the bot through a callback
    Internal,
    /// Plain external link
    Link,
    /// Link or callback depending on the support contact mode
    Dynamic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub active: bool,
    #[serde(rename = "type")]
    pub kind: MenuKind,
}

impl MenuItem {
    fn new(label: &str, url: Option<&str>, kind: MenuKind) -> Self {
        Self {
            label: label.to_string(),
            url: url.map(str::to_string),
            active: true,
            kind,
        }
    }
}

/// Menu key → button settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MenuConfig {
    items: BTreeMap<String, MenuItem>,
}

impl Default for MenuConfig {
    fn default() -> Self {
        let defaults = [
            ("calc", MenuItem::new("🧮 ماشین‌حساب", Some("https://www.hamrah-mechanic.com/carprice/"), MenuKind::Webapp)),
            ("market", MenuItem::new("🌐 قیمت بازار", Some("https://www.iranjib.ir/showgroup/45/"), MenuKind::Webapp)),
            ("prices", MenuItem::new("📋 لیست قیمت خودرو", None, MenuKind::Internal)),
            ("estimate", MenuItem::new("💰 تخمین قیمت خودرو", None, MenuKind::Internal)),
            ("mobile_webapp", MenuItem::new("📱 قیمت موبایل (سایت)", Some("https://www.mobile.ir/phones/prices.aspx"), MenuKind::Webapp)),
            ("mobile_list", MenuItem::new("📲 لیست موبایل (ربات)", None, MenuKind::Internal)),
            ("search", MenuItem::new("🔍 جستجو", None, MenuKind::Internal)),
            ("channel", MenuItem::new("📢 کانال ما", Some("https://t.me/CarPrice_Channel"), MenuKind::Link)),
            ("support", MenuItem::new("📞 پشتیبانی", None, MenuKind::Dynamic)),
        ];
        Self {
            items: defaults
                .into_iter()
                .map(|(key, item)| (key.to_string(), item))
                .collect(),
        }
    }
}

impl MenuConfig {
    pub fn get(&self, key: &str) -> Option<&MenuItem> {
        self.items.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut MenuItem> {
        self.items.get_mut(key)
    }

    /// Active item for `key`, if any
    pub fn active(&self, key: &str) -> Option<&MenuItem> {
        self.items.get(key).filter(|item| item.active)
    }

    /// Items in admin-panel order; unknown keys from older files come last
    pub fn ordered(&self) -> Vec<(&str, &MenuItem)> {
        let known = MENU_KEYS
            .iter()
            .filter_map(|key| self.items.get(*key).map(|item| (*key, item)));
        let extra = self
            .items
            .iter()
            .filter(|(key, _)| !MENU_KEYS.contains(&key.as_str()))
            .map(|(key, item)| (key.as_str(), item));
        known.chain(extra).collect()
    }

    /// Add any default item missing from a configuration loaded from disk
    pub fn merge_defaults(&mut self) -> bool {
        let mut changed = false;
        for (key, item) in MenuConfig::default().items {
            if !self.items.contains_key(&key) {
                self.items.insert(key, item);
                changed = true;
            }
        }
        changed
    }

    /// Flip the active flag; returns the new value
    pub fn toggle(&mut self, key: &str) -> Option<bool> {
        self.items.get_mut(key).map(|item| {
            item.active = !item.active;
            item.active
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_menu_covers_all_keys() {
        let config = MenuConfig::default();
        for key in MENU_KEYS {
            assert!(config.get(key).is_some(), "missing {key}");
        }
        assert_eq!(config.ordered().len(), MENU_KEYS.len());
    }

    #[test]
    fn test_merge_defaults_keeps_custom_labels() {
        let mut config: MenuConfig =
            serde_json::from_str(r#"{"prices": {"label": "Prices", "active": false, "type": "internal"}}"#)
                .unwrap();
        assert!(config.merge_defaults());
        assert_eq!(config.get("prices").unwrap().label, "Prices");
        assert!(!config.get("prices").unwrap().active);
        assert!(config.get("estimate").is_some());
    }

    #[test]
    fn test_toggle() {
        let mut config = MenuConfig::default();
        assert_eq!(config.toggle("search"), Some(false));
        assert!(config.active("search").is_none());
        assert_eq!(config.toggle("unknown"), None);
    }
}
