use anyhow::{Context, Result};
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};
use unic_langid::LanguageIdentifier;

use crate::config::DEFAULT_LOCALES_DIR;

/// Languages with a `locales/<lang>/main.ftl` file
pub const SUPPORTED_LANGUAGES: [&str; 2] = ["fa", "en"];
/// Language used when the user's language is unknown or unsupported
pub const DEFAULT_LANGUAGE: &str = "fa";

/// Localization manager for the price bot
pub struct LocalizationManager {
    bundles: HashMap<String, FluentBundle<FluentResource>>,
}

impl LocalizationManager {
    /// Create a manager reading from the default locales directory
    pub fn new() -> Result<Self> {
        Self::with_dir(DEFAULT_LOCALES_DIR)
    }

    /// Create a manager reading `<dir>/<lang>/main.ftl` for every supported language
    pub fn with_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let mut bundles = HashMap::new();

        for lang in SUPPORTED_LANGUAGES {
            let locale: LanguageIdentifier = lang.parse()?;
            let bundle = Self::create_bundle(dir.as_ref(), &locale)?;
            bundles.insert(lang.to_string(), bundle);
        }

        Ok(Self { bundles })
    }

    /// Create a fluent bundle for a specific locale
    fn create_bundle(dir: &Path, locale: &LanguageIdentifier) -> Result<FluentBundle<FluentResource>> {
        let mut bundle = FluentBundle::new_concurrent(vec![locale.clone()]);
        bundle.set_use_isolating(false);

        let resource_path: PathBuf = dir.join(locale.to_string()).join("main.ftl");
        let content = fs::read_to_string(&resource_path)
            .with_context(|| format!("Failed to read {}", resource_path.display()))?;

        let resource = match FluentResource::try_new(content) {
            Ok(resource) => resource,
            Err((resource, errors)) => {
                warn!(locale = %locale, errors = errors.len(), "Fluent resource has syntax errors");
                resource
            }
        };

        if let Err(errors) = bundle.add_resource(resource) {
            warn!(locale = %locale, errors = errors.len(), "Duplicate messages in fluent resource");
        }

        debug!(locale = %locale, path = %resource_path.display(), "Loaded locale");
        Ok(bundle)
    }

    /// Get a localized message in a specific language, falling back to the default language
    pub fn get_message_in_language(
        &self,
        key: &str,
        language: &str,
        args: Option<&HashMap<&str, &str>>,
    ) -> String {
        let bundle = match self
            .bundles
            .get(language)
            .filter(|b| b.has_message(key))
            .or_else(|| self.bundles.get(DEFAULT_LANGUAGE))
        {
            Some(bundle) => bundle,
            None => return format!("Missing translation: {}", key),
        };

        let msg = match bundle.get_message(key) {
            Some(msg) => msg,
            None => return format!("Missing translation: {}", key),
        };

        let pattern = match msg.value() {
            Some(pattern) => pattern,
            None => return format!("Missing value for key: {}", key),
        };

        let mut errors = vec![];
        let fluent_args = args.map(|args| {
            FluentArgs::from_iter(args.iter().map(|(k, v)| (*k, FluentValue::from(*v))))
        });
        let value = bundle.format_pattern(pattern, fluent_args.as_ref(), &mut errors);

        if !errors.is_empty() {
            debug!(key, errors = errors.len(), "Fluent formatting reported errors");
        }

        value.into_owned()
    }

    /// Get a localized message with simple string arguments
    pub fn get_message_with_args(&self, key: &str, args: &[(&str, &str)], language: &str) -> String {
        let args_map: HashMap<&str, &str> = args.iter().cloned().collect();
        self.get_message_in_language(key, language, Some(&args_map))
    }
}

/// Global localization instance
static LOCALIZATION_MANAGER: OnceLock<LocalizationManager> = OnceLock::new();

/// Initialize the global localization manager from `dir`
///
/// Calling it again after a successful initialization is a no-op.
pub fn init_localization_from(dir: impl AsRef<Path>) -> Result<()> {
    if LOCALIZATION_MANAGER.get().is_some() {
        return Ok(());
    }
    let manager = LocalizationManager::with_dir(dir)?;
    let _ = LOCALIZATION_MANAGER.set(manager);
    Ok(())
}

/// Initialize the global localization manager from the default directory
pub fn init_localization() -> Result<()> {
    init_localization_from(DEFAULT_LOCALES_DIR)
}

/// Map a Telegram `language_code` to a supported language
pub fn detect_language(language_code: Option<&str>) -> &'static str {
    let Some(code) = language_code else {
        return DEFAULT_LANGUAGE;
    };
    let primary = code.split(['-', '_']).next().unwrap_or_default().to_lowercase();
    SUPPORTED_LANGUAGES
        .iter()
        .find(|lang| **lang == primary)
        .copied()
        .unwrap_or(DEFAULT_LANGUAGE)
}

/// Localized message for a Telegram language code
pub fn t_lang(key: &str, language_code: Option<&str>) -> String {
    match LOCALIZATION_MANAGER.get() {
        Some(manager) => manager.get_message_in_language(key, detect_language(language_code), None),
        None => key.to_string(),
    }
}

/// Localized message with arguments for a Telegram language code
pub fn t_args_lang(key: &str, args: &[(&str, &str)], language_code: Option<&str>) -> String {
    match LOCALIZATION_MANAGER.get() {
        Some(manager) => manager.get_message_with_args(key, args, detect_language(language_code)),
        None => key.to_string(),
    }
}
