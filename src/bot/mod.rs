//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `message_handler`: commands, typed answers and uploaded catalog files
//! - `callback_handler`: inline keyboard callback queries
//! - `callback_data`: typed payloads carried by inline buttons
//! - `ui_builder`: keyboards and message formatting
//! - `dialogue_manager`: drives the conversation state machine and applies
//!   completed admin commands

pub mod callback_data;
pub mod callback_handler;
pub mod dialogue_manager;
pub mod message_handler;
pub mod ui_builder;

use std::sync::Arc;

use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::config::BotConfig;
use crate::dialogue::{user_dialogue, BotDialogue, ConversationState};
use crate::estimator::PriceEstimator;
use crate::store::DataStore;

pub use callback_handler::callback_handler;
pub use message_handler::{command_handler, message_handler};

pub type HandlerResult = anyhow::Result<()>;

/// Everything handlers share: the data store, settings and the estimator
pub struct BotContext {
    pub store: DataStore,
    pub config: BotConfig,
    pub estimator: PriceEstimator,
}

impl BotContext {
    pub fn new(store: DataStore, config: BotConfig) -> Self {
        let estimator = PriceEstimator::new(config.reference_year);
        Self {
            store,
            config,
            estimator,
        }
    }

    pub fn owner_id(&self) -> i64 {
        self.config.owner_id
    }
}

pub type SharedContext = Arc<BotContext>;

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "open the main menu")]
    Start,
    #[command(description = "open the admin panel")]
    Admin,
    #[command(description = "show your Telegram id")]
    Id,
    #[command(description = "show this help")]
    Help,
}

/// Dialogue of the user who sent `update`; updates without a sender are dropped
fn sender_dialogue(
    update: Update,
    storage: Arc<InMemStorage<ConversationState>>,
) -> Option<BotDialogue> {
    update.from().map(|user| user_dialogue(storage, user.id))
}

/// Dispatcher tree: commands first, then dialogue-aware messages and callbacks
pub fn build_schema() -> UpdateHandler<anyhow::Error> {
    let message_branch = Update::filter_message()
        .filter_map(sender_dialogue)
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(command_handler),
        )
        .branch(dptree::endpoint(message_handler));

    let callback_branch = Update::filter_callback_query()
        .filter_map(sender_dialogue)
        .endpoint(callback_handler);

    dptree::entry().branch(message_branch).branch(callback_branch)
}
