//! E2E tests for reaction toggling and reconciliation

mod common;

use common::TestEngine;
use lagoon::data::ReactionState;
use lagoon::remote::RemoteDataService;

#[tokio::test]
async fn toggle_like_twice_returns_to_the_original_state_and_counts() {
    let t = TestEngine::new().await;
    let ada = t.seed_user("ada").await;
    t.seed_post_with_reactions("post-1", &ada, vec![ada.clone()], vec![])
        .await;
    t.engine.feed.refresh_feed().await.unwrap();

    let start = t.engine.reactions.entry("post-1").await;
    assert_eq!(start.state, ReactionState::None);
    assert_eq!(start.like_count, 1);

    let once = t.engine.reactions.toggle_like("post-1").await.unwrap();
    assert_eq!(once.state, ReactionState::Liked);
    assert_eq!(once.like_count, 2);

    let twice = t.engine.reactions.toggle_like("post-1").await.unwrap();
    assert_eq!(twice, start);
}

#[tokio::test]
async fn dislike_to_like_swap_adjusts_both_counts() {
    let t = TestEngine::new().await;
    let me = t.me().await;
    let ada = t.seed_user("ada").await;
    let bob = t.seed_user("bob").await;
    // dislikeCount=3, including the current user.
    t.seed_post_with_reactions(
        "post-1",
        &ada,
        vec![],
        vec![me.profile_id.clone(), ada.clone(), bob.clone()],
    )
    .await;
    t.engine.feed.refresh_feed().await.unwrap();

    let start = t.engine.reactions.entry("post-1").await;
    assert_eq!(start.state, ReactionState::Disliked);
    assert_eq!(start.dislike_count, 3);

    let after = t.engine.reactions.toggle_like("post-1").await.unwrap();
    assert_eq!(after.state, ReactionState::Liked);
    assert_eq!(after.dislike_count, 2);
    assert_eq!(after.like_count, 1);

    // Authoritative remote agrees once the swap settles.
    let snapshot = t.remote.reactions_for("post-1").await.unwrap();
    assert!(snapshot.liked_by.contains(&me.profile_id));
    assert!(!snapshot.disliked_by.contains(&me.profile_id));
}

#[tokio::test]
async fn state_is_never_both_liked_and_disliked_across_toggle_sequences() {
    let t = TestEngine::new().await;
    let ada = t.seed_user("ada").await;
    t.seed_post_with_reactions("post-1", &ada, vec![], vec![]).await;
    t.engine.feed.refresh_feed().await.unwrap();

    t.engine.reactions.toggle_like("post-1").await.unwrap();
    t.engine.reactions.toggle_dislike("post-1").await.unwrap();
    t.engine.reactions.toggle_dislike("post-1").await.unwrap();
    t.engine.reactions.toggle_like("post-1").await.unwrap();

    let entry = t.engine.reactions.entry("post-1").await;
    assert_eq!(entry.state, ReactionState::Liked);
    assert_eq!(entry.like_count, 1);
    assert_eq!(entry.dislike_count, 0);

    let snapshot = t.remote.reactions_for("post-1").await.unwrap();
    assert_eq!(snapshot.liked_by.len(), 1);
    assert!(snapshot.disliked_by.is_empty());
}

#[tokio::test]
async fn remote_failure_reconciles_from_the_authoritative_read() {
    let t = TestEngine::new().await;
    let me = t.me().await;
    let ada = t.seed_user("ada").await;
    t.seed_post_with_reactions("post-1", &ada, vec![], vec![me.profile_id.clone()])
        .await;
    t.engine.feed.refresh_feed().await.unwrap();

    // The swap removes the dislike, then fails adding the like: a
    // partially applied remote mutation.
    t.remote.fail_once("add_reaction").await;
    let outcome = t.engine.reactions.toggle_like("post-1").await;
    assert!(outcome.is_err());

    // The ledger holds the authoritative state, not the optimistic one.
    let entry = t.engine.reactions.entry("post-1").await;
    let snapshot = t.remote.reactions_for("post-1").await.unwrap();
    assert_eq!(entry.state, ReactionState::None);
    assert_eq!(entry.like_count, snapshot.liked_by.len() as i64);
    assert_eq!(entry.dislike_count, snapshot.disliked_by.len() as i64);
}

#[tokio::test]
async fn duplicate_remote_row_is_treated_as_success() {
    let t = TestEngine::new().await;
    let me = t.me().await;
    let ada = t.seed_user("ada").await;
    t.seed_post_with_reactions("post-1", &ada, vec![], vec![]).await;
    t.engine.feed.refresh_feed().await.unwrap();

    // A like row already exists remotely (e.g. from another device)
    // but the local seed predates it.
    t.remote
        .add_reaction(&me.profile_id, "post-1", lagoon::data::ReactionKind::Like)
        .await
        .unwrap();

    let entry = t.engine.reactions.toggle_like("post-1").await.unwrap();
    assert_eq!(entry.state, ReactionState::Liked);

    let snapshot = t.remote.reactions_for("post-1").await.unwrap();
    assert_eq!(snapshot.liked_by.len(), 1);
}
