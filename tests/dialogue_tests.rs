//! # Dialogue Tests
//!
//! Dialogue state storage as used by the dispatcher, keyed per user.

use anyhow::Result;
use carprice_bot::dialogue::{user_dialogue, BotDialogue, ConversationState};
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::types::{ChatId, UserId};

#[tokio::test]
async fn test_states_are_kept_per_chat() -> Result<()> {
    let storage = InMemStorage::<ConversationState>::new();
    let first = BotDialogue::new(storage.clone(), ChatId(1));
    let second = BotDialogue::new(storage, ChatId(2));

    assert_eq!(first.get_or_default().await?, ConversationState::Idle);

    first
        .update(ConversationState::AwaitingMileage {
            brand: "Saipa".to_string(),
            model: "Shahin".to_string(),
            year: 1400,
        })
        .await?;
    second.update(ConversationState::AwaitingSearchQuery).await?;

    assert!(matches!(
        first.get().await?,
        Some(ConversationState::AwaitingMileage { year: 1400, .. })
    ));
    assert_eq!(second.get().await?, Some(ConversationState::AwaitingSearchQuery));

    first.exit().await?;
    assert_eq!(first.get().await?, None);
    assert_eq!(first.get_or_default().await?, ConversationState::Idle);
    assert_eq!(second.get().await?, Some(ConversationState::AwaitingSearchQuery));
    Ok(())
}

#[tokio::test]
async fn test_group_members_have_separate_flows() -> Result<()> {
    let storage = InMemStorage::<ConversationState>::new();
    let alice = user_dialogue(storage.clone(), UserId(501));
    let bob = user_dialogue(storage.clone(), UserId(502));

    alice
        .update(ConversationState::AwaitingMileage {
            brand: "Saipa".to_string(),
            model: "Shahin".to_string(),
            year: 1400,
        })
        .await?;

    assert_eq!(bob.get_or_default().await?, ConversationState::Idle);

    // The same user reaches the same state whichever chat they write from
    let alice_again = user_dialogue(storage, UserId(501));
    assert!(matches!(
        alice_again.get().await?,
        Some(ConversationState::AwaitingMileage { .. })
    ));
    Ok(())
}
