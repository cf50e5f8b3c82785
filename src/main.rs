use anyhow::{Context, Result};
use std::sync::Arc;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use carprice_bot::backup::run_backup_scheduler;
use carprice_bot::bot::{build_schema, BotContext, Command};
use carprice_bot::config::BotConfig;
use carprice_bot::dialogue::ConversationState;
use carprice_bot::localization::init_localization_from;
use carprice_bot::store::{check_writable, DataStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Car Price Telegram Bot");

    let config = BotConfig::from_env()?;
    info!(config = ?config, "Configuration loaded");

    init_localization_from(&config.locales_dir).with_context(|| {
        format!(
            "Failed to load translations from {}",
            config.locales_dir.display()
        )
    })?;

    check_writable(&config.data_file);
    let store = DataStore::open(&config.data_file).with_context(|| {
        format!("Refusing to start over {}", config.data_file.display())
    })?;
    if let Err(e) = store.save().await {
        error!(error = %e, "Initial save of the data file failed");
    }

    let bot = Bot::new(config.telegram_token.clone());
    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        error!(error = %e, "Failed to register bot commands");
    }

    let ctx = Arc::new(BotContext::new(store, config));
    tokio::spawn(run_backup_scheduler(bot.clone(), Arc::clone(&ctx)));

    info!("Bot initialized, starting dispatcher");

    Dispatcher::builder(bot, build_schema())
        .dependencies(dptree::deps![InMemStorage::<ConversationState>::new(), ctx])
        .default_handler(|upd| async move {
            tracing::debug!(update = ?upd.kind, "Unhandled update");
        })
        .error_handler(LoggingErrorHandler::with_custom_text(
            "An error has occurred in the dispatcher",
        ))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
