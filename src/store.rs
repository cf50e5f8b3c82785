//! # Data Store Module
//!
//! The bot keeps all of its persistent state in one JSON document: registered
//! users, admins and their roles, menu configuration, sponsor and support
//! settings, backup interval and both price catalogs. The document is loaded
//! once at startup and rewritten wholesale after every change.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::catalog::{seed_catalogs, CarCatalog, MobileCatalog};
use crate::menu::MenuConfig;

static TELEGRAM_HANDLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@([A-Za-z0-9_]{3,32})$").expect("valid handle pattern"));

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access data file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize data: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to replace data file: {0}")]
    Persist(#[from] tempfile::PersistError),
    #[error("data file {path} is corrupt and could not be copied aside: {source}")]
    Quarantine {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("data file write task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Permission level of an admin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminRole {
    Full,
    Editor,
    Support,
}

/// Admin panel operations gated by role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    ManageMenus,
    ChannelSettings,
    ImportCatalog,
    AddCar,
    SetSupport,
    ManageAdmins,
    Backup,
    Sponsor,
    Broadcast,
}

impl AdminRole {
    pub fn allows(self, action: AdminAction) -> bool {
        match self {
            AdminRole::Full => true,
            AdminRole::Editor => matches!(action, AdminAction::ImportCatalog | AdminAction::AddCar),
            AdminRole::Support => matches!(action, AdminAction::SetSupport),
        }
    }

    /// Next role in the admin list's role-cycling button
    pub fn next(self) -> Self {
        match self {
            AdminRole::Full => AdminRole::Editor,
            AdminRole::Editor => AdminRole::Support,
            AdminRole::Support => AdminRole::Full,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AdminRole::Full => "full",
            AdminRole::Editor => "editor",
            AdminRole::Support => "support",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sponsor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Sponsor {
    /// Name and URL when both are set
    pub fn link(&self) -> Option<(&str, &str)> {
        match (self.name.as_deref(), self.url.as_deref()) {
            (Some(name), Some(url)) if !name.is_empty() && !url.is_empty() => Some((name, url)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportMode {
    Text,
    Link,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportConfig {
    pub mode: SupportMode,
    pub value: String,
}

impl Default for SupportConfig {
    fn default() -> Self {
        Self {
            mode: SupportMode::Text,
            value: "پیام خود را ارسال کنید...".to_string(),
        }
    }
}

impl SupportConfig {
    /// Interpret an admin's support contact input
    ///
    /// URLs become links, `@handle` becomes a `t.me` link, anything else is
    /// shown to users as plain text.
    pub fn from_input(input: &str) -> Self {
        let input = input.trim();
        if let Some(caps) = TELEGRAM_HANDLE.captures(input) {
            return Self {
                mode: SupportMode::Link,
                value: format!("https://t.me/{}", &caps[1]),
            };
        }
        let mode = if input.starts_with("http") {
            SupportMode::Link
        } else {
            SupportMode::Text
        };
        Self {
            mode,
            value: input.to_string(),
        }
    }
}

/// The persisted document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotData {
    /// Hours between automatic backups, 0 disables them
    pub backup_interval: u64,
    pub users: Vec<i64>,
    pub admins: Vec<i64>,
    pub roles: BTreeMap<String, AdminRole>,
    pub sponsor: Sponsor,
    pub menu_config: MenuConfig,
    pub support_config: SupportConfig,
    pub car_db: CarCatalog,
    pub mobile_db: MobileCatalog,
    /// Keys written by other tools are carried through untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for BotData {
    fn default() -> Self {
        Self {
            backup_interval: 0,
            users: Vec::new(),
            admins: Vec::new(),
            roles: BTreeMap::new(),
            sponsor: Sponsor::default(),
            menu_config: MenuConfig::default(),
            support_config: SupportConfig::default(),
            car_db: CarCatalog::default(),
            mobile_db: MobileCatalog::default(),
            extra: serde_json::Map::new(),
        }
    }
}

impl BotData {
    /// Record a user for broadcasts; returns true when the user is new
    pub fn register_user(&mut self, user_id: i64) -> bool {
        if self.users.contains(&user_id) {
            return false;
        }
        self.users.push(user_id);
        true
    }

    /// The owner is always a full admin; listed admins default to editor
    pub fn role_of(&self, user_id: i64, owner_id: i64) -> Option<AdminRole> {
        if owner_id != 0 && user_id == owner_id {
            return Some(AdminRole::Full);
        }
        if !self.admins.contains(&user_id) {
            return None;
        }
        Some(
            self.roles
                .get(&user_id.to_string())
                .copied()
                .unwrap_or(AdminRole::Editor),
        )
    }

    pub fn is_admin(&self, user_id: i64, owner_id: i64) -> bool {
        self.role_of(user_id, owner_id).is_some()
    }

    pub fn has_permission(&self, user_id: i64, owner_id: i64, action: AdminAction) -> bool {
        self.role_of(user_id, owner_id)
            .is_some_and(|role| role.allows(action))
    }

    pub fn users(&self) -> &[i64] {
        &self.users
    }

    pub fn add_admin(&mut self, user_id: i64, role: AdminRole) {
        if !self.admins.contains(&user_id) {
            self.admins.push(user_id);
        }
        self.roles.insert(user_id.to_string(), role);
    }

    pub fn remove_admin(&mut self, user_id: i64) -> bool {
        let before = self.admins.len();
        self.admins.retain(|id| *id != user_id);
        self.roles.remove(&user_id.to_string());
        self.admins.len() != before
    }

    /// Set the role of an existing admin; returns false for non-admins
    pub fn set_role(&mut self, user_id: i64, role: AdminRole) -> bool {
        if !self.admins.contains(&user_id) {
            return false;
        }
        self.roles.insert(user_id.to_string(), role);
        true
    }

    /// Advance an admin to the next role; returns the new role
    pub fn cycle_role(&mut self, user_id: i64) -> Option<AdminRole> {
        if !self.admins.contains(&user_id) {
            return None;
        }
        let key = user_id.to_string();
        let next = self
            .roles
            .get(&key)
            .copied()
            .unwrap_or(AdminRole::Editor)
            .next();
        self.roles.insert(key, next);
        Some(next)
    }
}

/// Shared handle to the JSON document on disk
#[derive(Debug)]
pub struct DataStore {
    path: PathBuf,
    data: RwLock<BotData>,
}

impl DataStore {
    /// Load the data file, falling back to defaults when it is missing or corrupt
    ///
    /// Fails when the file exists but cannot be read, or is corrupt and cannot
    /// be copied aside, so that a later save never overwrites it.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let mut data = load_data(&path)?;

        if data.car_db.is_empty() && data.mobile_db.is_empty() {
            info!("Catalogs are empty, using bundled seed catalog");
            let (cars, mobiles) = seed_catalogs();
            data.car_db = cars;
            data.mobile_db = mobiles;
        }

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A copy of the whole document
    pub async fn snapshot(&self) -> BotData {
        self.data.read().await.clone()
    }

    /// Read a projection of the document without cloning all of it
    pub async fn read<R>(&self, f: impl FnOnce(&BotData) -> R) -> R {
        let guard = self.data.read().await;
        f(&guard)
    }

    /// Mutate the document and persist it
    ///
    /// The change is applied to a copy and only becomes visible once it is on
    /// disk; a failed save leaves the document untouched.
    pub async fn update<R>(&self, f: impl FnOnce(&mut BotData) -> R) -> Result<R, StoreError> {
        let mut guard = self.data.write().await;
        let mut draft = guard.clone();
        let result = f(&mut draft);

        persist(&self.path, &draft).await?;
        *guard = draft;
        Ok(result)
    }

    /// Write the current document to disk
    pub async fn save(&self) -> Result<(), StoreError> {
        let guard = self.data.read().await;
        persist(&self.path, &guard).await
    }
}

/// Serialize on the caller, write on the blocking pool
async fn persist(path: &Path, data: &BotData) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(data)?;
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || write_atomic(&path, json.as_bytes())).await?
}

/// Read the document at `path`
///
/// A missing file yields defaults. A file that fails to parse, including one
/// that is not valid UTF-8, is copied to `<path>.corrupt.<timestamp>` before
/// defaults are returned.
pub fn load_data(path: &Path) -> Result<BotData, StoreError> {
    let content = match fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "Data file not found, starting with defaults");
            return Ok(BotData::default());
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to read data file");
            return Err(StoreError::Io(e));
        }
    };

    match serde_json::from_slice::<BotData>(&content) {
        Ok(mut data) => {
            if data.menu_config.merge_defaults() {
                debug!("Added missing menu items from defaults");
            }
            info!(
                path = %path.display(),
                users = data.users.len(),
                admins = data.admins.len(),
                "Data file loaded"
            );
            Ok(data)
        }
        Err(e) => {
            let quarantine = quarantine(path)?;
            error!(
                error = %e,
                quarantine = %quarantine.display(),
                "Data file corrupted, copied aside and starting with defaults"
            );
            Ok(BotData::default())
        }
    }
}

/// Copy a corrupt data file aside; returns the copy's path
fn quarantine(path: &Path) -> Result<PathBuf, StoreError> {
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let target = PathBuf::from(format!("{}.corrupt.{timestamp}", path.display()));
    match fs::copy(path, &target) {
        Ok(_) => Ok(target),
        Err(source) => {
            error!(path = %path.display(), error = %source, "Corrupt data file could not be copied aside");
            Err(StoreError::Quarantine {
                path: path.to_path_buf(),
                source,
            })
        }
    }
}

/// Atomically replace the document at `path`
pub fn save_data(path: &Path, data: &BotData) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(data)?;
    write_atomic(path, json.as_bytes())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut temp_file = NamedTempFile::new_in(&dir)?;
    temp_file.write_all(bytes)?;
    temp_file.as_file().sync_all()?;
    temp_file.persist(path)?;

    debug!(path = %path.display(), bytes = bytes.len(), "Data file saved");
    Ok(())
}

/// Warn about a data file that exists but is not writable at startup
pub fn check_writable(path: &Path) {
    if let Ok(meta) = fs::metadata(path) {
        if meta.permissions().readonly() {
            warn!(path = %path.display(), "Data file is read-only, changes will fail to save");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_support_config_from_input() {
        let handle = SupportConfig::from_input("@car_support");
        assert_eq!(handle.mode, SupportMode::Link);
        assert_eq!(handle.value, "https://t.me/car_support");

        let url = SupportConfig::from_input("https://example.com/contact");
        assert_eq!(url.mode, SupportMode::Link);

        let text = SupportConfig::from_input("  Call 021-1234  ");
        assert_eq!(text.mode, SupportMode::Text);
        assert_eq!(text.value, "Call 021-1234");
    }

    #[test]
    fn test_role_permissions() {
        assert!(AdminRole::Full.allows(AdminAction::Broadcast));
        assert!(AdminRole::Editor.allows(AdminAction::ImportCatalog));
        assert!(!AdminRole::Editor.allows(AdminAction::Broadcast));
        assert!(AdminRole::Support.allows(AdminAction::SetSupport));
        assert!(!AdminRole::Support.allows(AdminAction::AddCar));
    }

    #[test]
    fn test_sponsor_link_requires_both_fields() {
        let mut sponsor = Sponsor::default();
        assert!(sponsor.link().is_none());
        sponsor.name = Some("Dealer".to_string());
        assert!(sponsor.link().is_none());
        sponsor.url = Some("https://dealer.example".to_string());
        assert_eq!(sponsor.link(), Some(("Dealer", "https://dealer.example")));
    }
}
