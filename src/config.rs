//! # Configuration Module
//!
//! Runtime settings read from the environment (a `.env` file is loaded by
//! `main` first), plus retry tuning for outbound sends.

use anyhow::{Context, Result};
use std::fmt;
use std::path::PathBuf;

use crate::estimator::DEFAULT_REFERENCE_YEAR;

pub const DEFAULT_DATA_FILE: &str = "bot_data.json";
pub const DEFAULT_LOCALES_DIR: &str = "./locales";
pub const BACKUP_CHECK_INTERVAL_SECS: u64 = 60;

/// Retry configuration for Telegram sends during broadcasts
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    /// Maximum number of retry attempts per recipient
    pub max_retries: u32,
    /// Base delay between retries in milliseconds
    pub base_retry_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_retry_delay_ms: u64,
    /// Pause between consecutive recipients in milliseconds
    pub send_interval_ms: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_retry_delay_ms: 500,
            max_retry_delay_ms: 10000, // 10 seconds
            send_interval_ms: 50,      // stays under Telegram's 30 msg/s
        }
    }
}

/// Bot settings
#[derive(Clone)]
pub struct BotConfig {
    pub telegram_token: String,
    /// Telegram id of the owner, always a full admin; 0 when unset
    pub owner_id: i64,
    pub data_file: PathBuf,
    /// Year treated as "now" when computing a car's age
    pub reference_year: i32,
    pub locales_dir: PathBuf,
    pub recovery: RecoveryConfig,
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("telegram_token", &"<redacted>")
            .field("owner_id", &self.owner_id)
            .field("data_file", &self.data_file)
            .field("reference_year", &self.reference_year)
            .field("locales_dir", &self.locales_dir)
            .field("recovery", &self.recovery)
            .finish()
    }
}

impl BotConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let telegram_token = lookup("TELEGRAM_BOT_TOKEN")
            .filter(|token| !token.trim().is_empty())
            .context("TELEGRAM_BOT_TOKEN environment variable is required")?;

        let owner_id = match lookup("OWNER_ID") {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .with_context(|| format!("OWNER_ID must be a numeric Telegram id, got {raw:?}"))?,
            None => 0,
        };

        let reference_year = match lookup("REFERENCE_YEAR") {
            Some(raw) => raw
                .trim()
                .parse::<i32>()
                .with_context(|| format!("REFERENCE_YEAR must be a year, got {raw:?}"))?,
            None => DEFAULT_REFERENCE_YEAR,
        };

        Ok(Self {
            telegram_token,
            owner_id,
            data_file: lookup("DATA_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FILE)),
            reference_year,
            locales_dir: lookup("LOCALES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOCALES_DIR)),
            recovery: RecoveryConfig::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_applied() {
        let config = BotConfig::from_lookup(lookup_from(&[("TELEGRAM_BOT_TOKEN", "123:abc")])).unwrap();
        assert_eq!(config.owner_id, 0);
        assert_eq!(config.reference_year, 1404);
        assert_eq!(config.data_file, PathBuf::from("bot_data.json"));
    }

    #[test]
    fn test_missing_token_is_an_error() {
        assert!(BotConfig::from_lookup(lookup_from(&[])).is_err());
        assert!(BotConfig::from_lookup(lookup_from(&[("TELEGRAM_BOT_TOKEN", "  ")])).is_err());
    }

    #[test]
    fn test_invalid_owner_id_is_an_error() {
        let result = BotConfig::from_lookup(lookup_from(&[
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("OWNER_ID", "me"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_hides_token() {
        let config = BotConfig::from_lookup(lookup_from(&[("TELEGRAM_BOT_TOKEN", "secret-token")])).unwrap();
        assert!(!format!("{config:?}").contains("secret-token"));
    }

    #[test]
    fn test_recovery_defaults_reasonable() {
        let recovery = RecoveryConfig::default();
        assert!(recovery.max_retries <= 10);
        assert!(recovery.base_retry_delay_ms <= recovery.max_retry_delay_ms);
    }
}
