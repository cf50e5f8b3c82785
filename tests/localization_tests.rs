//! # Localization Tests
//!
//! Message lookup, fallback and argument formatting against the shipped
//! Fluent files.

use carprice_bot::localization::{detect_language, LocalizationManager, DEFAULT_LANGUAGE};
use std::collections::HashMap;

fn setup_localization() -> LocalizationManager {
    LocalizationManager::new().expect("Failed to create localization manager")
}

#[test]
fn test_get_message_existing_key() {
    let manager = setup_localization();

    let english = manager.get_message_in_language("admin-denied", "en", None);
    assert!(english.contains("access"));

    let persian = manager.get_message_in_language("admin-denied", "fa", None);
    assert!(persian.contains("دسترسی"));
}

#[test]
fn test_get_message_nonexistent_key() {
    let manager = setup_localization();

    let message = manager.get_message_in_language("nonexistent-key", "en", None);
    assert!(message.starts_with("Missing translation:"));
}

#[test]
fn test_get_message_unsupported_language_falls_back_to_persian() {
    let manager = setup_localization();

    let message = manager.get_message_in_language("admin-denied", "de", None);
    assert_eq!(message, manager.get_message_in_language("admin-denied", "fa", None));
}

#[test]
fn test_get_message_with_args() {
    let manager = setup_localization();

    let mut args = HashMap::new();
    args.insert("id", "123456");
    let message = manager.get_message_in_language("your-id", "en", Some(&args));
    assert!(message.contains("123456"));

    let message = manager.get_message_with_args("admin-panel-title", &[("role", "editor")], "fa");
    assert!(message.contains("editor"));
    assert!(!message.contains('\u{2068}'), "isolation marks should be disabled");
}

#[test]
fn test_every_language_has_the_same_keys() {
    let manager = setup_localization();

    for key in ["welcome", "cancelled", "saved", "estimate-result", "role-full"] {
        for lang in ["fa", "en"] {
            let message = manager.get_message_in_language(key, lang, None);
            assert!(
                !message.starts_with("Missing translation:"),
                "{key} missing in {lang}"
            );
        }
    }
}

#[test]
fn test_detect_language() {
    assert_eq!(detect_language(Some("en")), "en");
    assert_eq!(detect_language(Some("en-US")), "en");
    assert_eq!(detect_language(Some("fa_IR")), "fa");
    assert_eq!(detect_language(Some("ru")), DEFAULT_LANGUAGE);
    assert_eq!(detect_language(None), DEFAULT_LANGUAGE);
}

#[test]
fn test_missing_locales_dir_is_an_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    assert!(LocalizationManager::with_dir(dir.path().join("nowhere")).is_err());
}
