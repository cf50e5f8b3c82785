//! Conversation state kept per chat, and validation of the free-text answers
//! users type into multi-step dialogs.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};
use teloxide::types::{ChatId, UserId};

use crate::catalog::CatalogKind;

/// Longest text accepted for a broadcast (Telegram's message limit)
pub const MAX_MESSAGE_LEN: usize = 4096;
/// Longest text accepted for names, labels and contacts
pub const MAX_SHORT_TEXT_LEN: usize = 64;

/// Where a user is within a multi-step dialog
///
/// Each estimation phase carries exactly the answers collected before it, so
/// a handler for a phase never has to check for missing fields.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum ConversationState {
    #[default]
    Idle,
    AwaitingBrand,
    AwaitingModel {
        brand: String,
    },
    AwaitingYear {
        brand: String,
        model: String,
    },
    AwaitingMileage {
        brand: String,
        model: String,
        year: i32,
    },
    AwaitingCondition {
        brand: String,
        model: String,
        year: i32,
        mileage: u64,
    },
    /// One of the admin text-input flows, with the answers given so far
    AdminInput {
        flow: AdminFlow,
        answers: Vec<FieldValue>,
    },
    AwaitingSearchQuery,
    AwaitingCatalogFile {
        kind: CatalogKind,
    },
}

/// Discriminant of [`ConversationState`], handy for logging and assertions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingBrand,
    AwaitingModel,
    AwaitingYear,
    AwaitingMileage,
    AwaitingCondition,
    AdminInput,
    AwaitingSearchQuery,
    AwaitingCatalogFile,
}

impl ConversationState {
    pub fn phase(&self) -> Phase {
        match self {
            ConversationState::Idle => Phase::Idle,
            ConversationState::AwaitingBrand => Phase::AwaitingBrand,
            ConversationState::AwaitingModel { .. } => Phase::AwaitingModel,
            ConversationState::AwaitingYear { .. } => Phase::AwaitingYear,
            ConversationState::AwaitingMileage { .. } => Phase::AwaitingMileage,
            ConversationState::AwaitingCondition { .. } => Phase::AwaitingCondition,
            ConversationState::AdminInput { .. } => Phase::AdminInput,
            ConversationState::AwaitingSearchQuery => Phase::AwaitingSearchQuery,
            ConversationState::AwaitingCatalogFile { .. } => Phase::AwaitingCatalogFile,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, ConversationState::Idle)
    }
}

/// Type alias for the bot's dialogue handle
pub type BotDialogue = Dialogue<ConversationState, InMemStorage<ConversationState>>;

/// Dialogue of one user
///
/// State is keyed by the user rather than the chat, so members of a group
/// chat never advance each other's flows.
pub fn user_dialogue(storage: Arc<InMemStorage<ConversationState>>, user_id: UserId) -> BotDialogue {
    BotDialogue::new(storage, ChatId::from(user_id))
}

/// Admin dialogs that collect a fixed sequence of text answers
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdminFlow {
    AddAdmin,
    SetSponsor,
    Broadcast,
    EditMenuLabel { key: String },
    EditMenuUrl { key: String },
    SetSupport,
    SetChannelUrl,
    AddCar,
}

/// What kind of answer a step expects
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// Short free text such as a name or label
    Text,
    /// Long free text such as a broadcast
    Message,
    /// Numeric Telegram user id
    UserId,
    /// Positive price in catalog units
    Price,
    /// http(s) or tg link
    Url,
    /// Support contact: link, @handle or plain text
    Contact,
}

/// One step of an admin flow
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    /// Localization key of the prompt shown for this step
    pub prompt_key: &'static str,
    pub kind: FieldKind,
}

const fn field(prompt_key: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { prompt_key, kind }
}

const ADD_ADMIN_FIELDS: &[FieldSpec] = &[field("prompt-admin-id", FieldKind::UserId)];
const SPONSOR_FIELDS: &[FieldSpec] = &[
    field("prompt-sponsor-name", FieldKind::Text),
    field("prompt-sponsor-url", FieldKind::Url),
];
const BROADCAST_FIELDS: &[FieldSpec] = &[field("prompt-broadcast", FieldKind::Message)];
const MENU_LABEL_FIELDS: &[FieldSpec] = &[field("prompt-menu-label", FieldKind::Text)];
const MENU_URL_FIELDS: &[FieldSpec] = &[field("prompt-menu-url", FieldKind::Url)];
const SUPPORT_FIELDS: &[FieldSpec] = &[field("prompt-support", FieldKind::Contact)];
const CHANNEL_URL_FIELDS: &[FieldSpec] = &[field("prompt-channel-url", FieldKind::Url)];
const ADD_CAR_FIELDS: &[FieldSpec] = &[
    field("prompt-car-brand", FieldKind::Text),
    field("prompt-car-model", FieldKind::Text),
    field("prompt-car-variant", FieldKind::Text),
    field("prompt-car-market-price", FieldKind::Price),
    field("prompt-car-factory-price", FieldKind::Price),
];

impl AdminFlow {
    /// Steps of this flow in the order they are asked
    pub fn fields(&self) -> &'static [FieldSpec] {
        match self {
            AdminFlow::AddAdmin => ADD_ADMIN_FIELDS,
            AdminFlow::SetSponsor => SPONSOR_FIELDS,
            AdminFlow::Broadcast => BROADCAST_FIELDS,
            AdminFlow::EditMenuLabel { .. } => MENU_LABEL_FIELDS,
            AdminFlow::EditMenuUrl { .. } => MENU_URL_FIELDS,
            AdminFlow::SetSupport => SUPPORT_FIELDS,
            AdminFlow::SetChannelUrl => CHANNEL_URL_FIELDS,
            AdminFlow::AddCar => ADD_CAR_FIELDS,
        }
    }
}

/// A validated answer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Number(f64),
}

/// Why a typed answer was rejected
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputError {
    Empty,
    TooLong,
    NotANumber,
    NotPositive,
    InvalidUrl,
}

impl InputError {
    /// Localization key of the message shown to the user
    pub fn message_key(self) -> &'static str {
        match self {
            InputError::Empty => "input-empty",
            InputError::TooLong => "input-too-long",
            InputError::NotANumber => "input-not-a-number",
            InputError::NotPositive => "input-not-positive",
            InputError::InvalidUrl => "input-invalid-url",
        }
    }
}

/// Map Persian and Arabic-Indic digits to ASCII and drop thousands separators
pub fn normalize_number(input: &str) -> String {
    input
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '٬'))
        .map(|c| match c {
            '۰'..='۹' => char::from(b'0' + (c as u32 - '۰' as u32) as u8),
            '٠'..='٩' => char::from(b'0' + (c as u32 - '٠' as u32) as u8),
            '٫' => '.',
            _ => c,
        })
        .collect()
}

/// Parse a mileage answer as a non-negative whole number of kilometres
pub fn parse_mileage(input: &str) -> Result<u64, InputError> {
    let normalized = normalize_number(input);
    if normalized.is_empty() {
        return Err(InputError::Empty);
    }
    normalized.parse::<u64>().map_err(|_| InputError::NotANumber)
}

fn validate_text(input: &str, max_len: usize) -> Result<String, InputError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(InputError::Empty);
    }

    if trimmed.chars().count() > max_len {
        return Err(InputError::TooLong);
    }

    Ok(trimmed.to_string())
}

fn validate_url(input: &str) -> Result<String, InputError> {
    let trimmed = validate_text(input, MAX_MESSAGE_LEN)?;
    match reqwest::Url::parse(&trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https" | "tg") => Ok(trimmed),
        _ => Err(InputError::InvalidUrl),
    }
}

impl FieldKind {
    /// Validate and normalize one answer
    pub fn validate(self, input: &str) -> Result<FieldValue, InputError> {
        match self {
            FieldKind::Text | FieldKind::Contact => {
                validate_text(input, MAX_SHORT_TEXT_LEN).map(FieldValue::Text)
            }
            FieldKind::Message => validate_text(input, MAX_MESSAGE_LEN).map(FieldValue::Text),
            FieldKind::Url => validate_url(input).map(FieldValue::Text),
            FieldKind::UserId => {
                let normalized = normalize_number(input);
                if normalized.is_empty() {
                    return Err(InputError::Empty);
                }
                let id = normalized
                    .parse::<i64>()
                    .map_err(|_| InputError::NotANumber)?;
                if id <= 0 {
                    return Err(InputError::NotPositive);
                }
                Ok(FieldValue::Integer(id))
            }
            FieldKind::Price => {
                let normalized = normalize_number(input);
                if normalized.is_empty() {
                    return Err(InputError::Empty);
                }
                let price = normalized
                    .parse::<f64>()
                    .map_err(|_| InputError::NotANumber)?;
                if !price.is_finite() || price <= 0.0 {
                    return Err(InputError::NotPositive);
                }
                Ok(FieldValue::Number(price))
            }
        }
    }
}
