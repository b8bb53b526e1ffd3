//! E2E tests for the messaging sync engine

mod common;

use std::sync::Arc;

use common::TestEngine;
use lagoon::data::AuthId;
use lagoon::remote::{InMemoryRemote, NewMessage, RemoteDataService};

#[tokio::test]
async fn first_contact_creates_one_conversation_and_one_message() {
    let t = TestEngine::new().await;
    t.seed_user("ada").await;
    let ada = AuthId("auth-ada".to_string());

    assert_eq!(t.remote.conversation_count().await, 0);
    t.engine.messaging.send(&ada, "hi").await.unwrap();

    // Lookup found nothing, so a conversation was created, then the
    // message inserted.
    assert_eq!(t.remote.conversation_count().await, 1);
    assert_eq!(t.remote.message_count().await, 1);

    let transcript = t.engine.messaging.transcript(&ada).await;
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].body, "hi");
    assert!(!transcript[0].pending);

    // A subsequent pull returns the same single message, no duplicates.
    t.engine.messaging.pull().await.unwrap();
    let transcript = t.engine.messaging.transcript(&ada).await;
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].body, "hi");
}

#[tokio::test]
async fn at_most_one_conversation_per_pair_regardless_of_initiator() {
    let remote = Arc::new(InMemoryRemote::new());
    let a = TestEngine::with_session(Arc::clone(&remote), "ada").await;
    let b = TestEngine::with_session(Arc::clone(&remote), "bob").await;

    a.engine
        .messaging
        .send(&AuthId("auth-bob".to_string()), "hello bob")
        .await
        .unwrap();
    b.engine
        .messaging
        .send(&AuthId("auth-ada".to_string()), "hello ada")
        .await
        .unwrap();
    a.engine
        .messaging
        .send(&AuthId("auth-bob".to_string()), "again")
        .await
        .unwrap();

    assert_eq!(remote.conversation_count().await, 1);
    assert_eq!(remote.message_count().await, 3);

    // Both sides converge on the same transcript after pulling.
    a.engine.messaging.pull().await.unwrap();
    b.engine.messaging.pull().await.unwrap();
    let seen_by_a = a
        .engine
        .messaging
        .transcript(&AuthId("auth-bob".to_string()))
        .await;
    let seen_by_b = b
        .engine
        .messaging
        .transcript(&AuthId("auth-ada".to_string()))
        .await;
    assert_eq!(seen_by_a.len(), 3);
    assert_eq!(seen_by_b.len(), 3);
}

#[tokio::test]
async fn failed_send_retracts_exactly_that_message() {
    let t = TestEngine::new().await;
    t.seed_user("ada").await;
    let ada = AuthId("auth-ada".to_string());

    t.engine.messaging.send(&ada, "first").await.unwrap();

    t.remote.fail_once("insert_message").await;
    let failed = t.engine.messaging.send(&ada, "second").await;
    assert!(failed.is_err());

    // The echo for the failed send is gone; the earlier message stays.
    let transcript = t.engine.messaging.transcript(&ada).await;
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].body, "first");
    assert_eq!(t.remote.message_count().await, 1);
}

#[tokio::test]
async fn sending_to_an_unprovisioned_identity_aborts() {
    let t = TestEngine::new().await;
    let ghost = AuthId("auth-ghost".to_string());
    assert!(t.engine.messaging.send(&ghost, "anyone there?").await.is_err());
    assert_eq!(t.remote.conversation_count().await, 0);
}

#[tokio::test]
async fn pull_synthesizes_a_placeholder_for_unknown_counterparts() {
    let t = TestEngine::new().await;
    let me = t.me().await;

    // A message arrives from a profile the directory has never seen.
    let ghost = lagoon::data::ProfileId("p-ghost".to_string());
    let conversation = t
        .remote
        .create_conversation(&me.profile_id, &ghost)
        .await
        .unwrap();
    t.remote
        .insert_message(NewMessage {
            conversation_id: conversation.id,
            sender_id: ghost.clone(),
            receiver_id: me.profile_id.clone(),
            body: "boo".to_string(),
        })
        .await
        .unwrap();

    t.engine.messaging.pull().await.unwrap();

    let placeholder = AuthId("pending:p-ghost".to_string());
    let transcript = t.engine.messaging.transcript(&placeholder).await;
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].body, "boo");
    // Placeholders do not count as online.
    assert!(!t.engine.presence.is_online(&placeholder).await);
}

#[tokio::test]
async fn pull_replaces_transcripts_without_losing_in_flight_echoes() {
    let t = TestEngine::new().await;
    t.seed_user("ada").await;
    let ada = AuthId("auth-ada".to_string());

    t.engine.messaging.send(&ada, "kept").await.unwrap();
    t.engine.messaging.pull().await.unwrap();
    t.engine.messaging.pull().await.unwrap();

    // Repeated pulls neither duplicate nor drop the confirmed send.
    let transcript = t.engine.messaging.transcript(&ada).await;
    assert_eq!(transcript.len(), 1);
    assert!(!transcript[0].pending);
}

#[tokio::test]
async fn watermark_advances_on_successful_pulls() {
    let t = TestEngine::new().await;
    assert!(t.engine.messaging.last_synced().await.is_none());

    t.engine.messaging.pull().await.unwrap();
    let first = t.engine.messaging.last_synced().await.unwrap();

    t.engine.messaging.pull().await.unwrap();
    let second = t.engine.messaging.last_synced().await.unwrap();
    assert!(second >= first);
}

#[tokio::test]
async fn background_pollers_stop_together_on_shutdown() {
    let t = TestEngine::new().await;
    let background = t.engine.start_background();

    // Let at least one poll interval elapse, then tear down.
    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    background.shutdown();

    let watermark = t.engine.messaging.last_synced().await;
    assert!(watermark.is_some());

    // No further pulls land after teardown.
    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    assert_eq!(t.engine.messaging.last_synced().await, watermark);
}
