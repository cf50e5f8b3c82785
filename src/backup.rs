//! Periodic delivery of the data file to the owner.

use anyhow::Result;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::InputFile;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::bot::SharedContext;
use crate::config::BACKUP_CHECK_INTERVAL_SECS;
use crate::store::DataStore;

/// Whether a scheduled backup is due; an interval of 0 hours disables them
pub fn backup_due(interval_hours: u64, since_last: Duration) -> bool {
    interval_hours > 0 && since_last >= Duration::from_secs(interval_hours.saturating_mul(3600))
}

/// Save the document and send it to `chat_id`
pub async fn send_backup(bot: &Bot, store: &DataStore, chat_id: ChatId) -> Result<()> {
    store.save().await?;

    let caption = format!("💾 Backup {}", chrono::Local::now().format("%Y-%m-%d %H:%M"));
    bot.send_document(chat_id, InputFile::file(store.path()))
        .caption(caption)
        .await?;

    info!(chat_id = %chat_id, path = %store.path().display(), "Backup sent");
    Ok(())
}

/// Check every minute and send a backup to the owner when one is due
///
/// Runs until the process exits. Does nothing when no owner is configured.
pub async fn run_backup_scheduler(bot: Bot, ctx: SharedContext) {
    let owner_id = ctx.owner_id();
    if owner_id == 0 {
        info!("OWNER_ID not set, scheduled backups disabled");
        return;
    }

    let mut ticker = interval(Duration::from_secs(BACKUP_CHECK_INTERVAL_SECS));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_backup = Instant::now();

    loop {
        ticker.tick().await;

        let hours = ctx.store.read(|data| data.backup_interval).await;
        if !backup_due(hours, last_backup.elapsed()) {
            continue;
        }

        debug!(interval_hours = hours, "Scheduled backup due");
        match send_backup(&bot, &ctx.store, ChatId(owner_id)).await {
            Ok(()) => last_backup = Instant::now(),
            Err(e) => error!(error = %e, "Scheduled backup failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_due() {
        let hour = Duration::from_secs(3600);
        assert!(!backup_due(0, hour * 100));
        assert!(!backup_due(1, hour - Duration::from_secs(1)));
        assert!(backup_due(1, hour));
        assert!(!backup_due(24, hour * 23));
        assert!(backup_due(24, hour * 25));
    }
}
