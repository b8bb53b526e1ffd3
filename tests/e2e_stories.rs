//! E2E tests for the ephemeral story cache

mod common;

use chrono::Duration;
use common::TestEngine;
use lagoon::data::MediaKind;
use lagoon::error::EngineError;
use lagoon::remote::RemoteDataService;

#[tokio::test]
async fn stories_older_than_24_hours_are_excluded() {
    let t = TestEngine::new().await;
    let ada = t.seed_user("ada").await;
    t.seed_story("story-fresh", &ada, Duration::hours(2)).await;
    // Created at T, evaluated at T + 25h.
    t.seed_story("story-stale", &ada, Duration::hours(25)).await;

    let groups = t.engine.stories.refresh_stories().await.unwrap();
    let ids: Vec<&str> = groups
        .iter()
        .flat_map(|g| g.stories.iter())
        .map(|s| s.id.as_str())
        .collect();
    assert_eq!(ids, vec!["story-fresh"]);
}

#[tokio::test]
async fn groups_are_per_author_with_own_group_pinned_first() {
    let t = TestEngine::new().await;
    let me = t.me().await;
    let ada = t.seed_user("ada").await;
    let bob = t.seed_user("bob").await;

    // Others have newer stories than the current user's.
    t.seed_story("s-ada", &ada, Duration::minutes(10)).await;
    t.seed_story("s-bob", &bob, Duration::minutes(5)).await;
    t.seed_story("s-mine", &me.profile_id, Duration::hours(20)).await;

    let groups = t.engine.stories.refresh_stories().await.unwrap();
    let authors: Vec<&str> = groups.iter().map(|g| g.author.username.as_str()).collect();
    // Own group first regardless of recency, then most recent first.
    assert_eq!(authors, vec![me.username.as_str(), "bob", "ada"]);
}

#[tokio::test]
async fn stories_within_a_group_play_oldest_first() {
    let t = TestEngine::new().await;
    let ada = t.seed_user("ada").await;
    t.seed_story("s-new", &ada, Duration::hours(1)).await;
    t.seed_story("s-old", &ada, Duration::hours(6)).await;

    let groups = t.engine.stories.refresh_stories().await.unwrap();
    let ids: Vec<&str> = groups[0].stories.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["s-old", "s-new"]);
}

#[tokio::test]
async fn post_story_uploads_and_joins_the_own_group() {
    let t = TestEngine::new().await;
    let me = t.me().await;

    let story = t
        .engine
        .stories
        .post_story(vec![1, 2], "image/jpeg", MediaKind::Image)
        .await
        .unwrap();
    assert_eq!(story.author_id, me.profile_id);
    assert_eq!(t.media.upload_count().await, 1);

    // Optimistically present, and still there after a refresh.
    let groups = t.engine.stories.groups().await;
    assert_eq!(groups[0].author.profile_id, me.profile_id);
    let groups = t.engine.stories.refresh_stories().await.unwrap();
    assert!(groups[0].stories.iter().any(|s| s.id == story.id));
}

#[tokio::test]
async fn delete_story_removes_it_from_store_and_active_set() {
    let t = TestEngine::new().await;
    let story = t
        .engine
        .stories
        .post_story(vec![1], "image/jpeg", MediaKind::Image)
        .await
        .unwrap();
    t.engine.stories.refresh_stories().await.unwrap();

    t.engine.stories.delete_story(&story.id).await.unwrap();
    assert!(t.engine.stories.groups().await.is_empty());

    let remaining = t
        .remote
        .fetch_stories_since(chrono::Utc::now() - Duration::hours(24))
        .await
        .unwrap();
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn deleting_another_authors_story_is_forbidden() {
    let t = TestEngine::new().await;
    let ada = t.seed_user("ada").await;
    t.seed_story("s-ada", &ada, Duration::hours(1)).await;
    t.engine.stories.refresh_stories().await.unwrap();

    let denied = t.engine.stories.delete_story("s-ada").await;
    assert!(matches!(denied, Err(EngineError::Forbidden)));
}

#[tokio::test]
async fn deleting_the_viewed_story_updates_the_live_sequence() {
    let t = TestEngine::new().await;
    let first = t
        .engine
        .stories
        .post_story(vec![1], "image/jpeg", MediaKind::Image)
        .await
        .unwrap();
    let second = t
        .engine
        .stories
        .post_story(vec![2], "image/jpeg", MediaKind::Image)
        .await
        .unwrap();
    let groups = t.engine.stories.refresh_stories().await.unwrap();

    let handle = t.engine.stories.spawn_playback(groups[0].stories.clone());
    assert_eq!(handle.current().await.unwrap().id, first.id);

    t.engine.stories.delete_current(&handle).await.unwrap();
    // The next story takes the slot; the backing store lost the first.
    assert_eq!(handle.current().await.unwrap().id, second.id);
    assert!(!t.engine.stories.groups().await[0]
        .stories
        .iter()
        .any(|s| s.id == first.id));

    // Deleting the tail terminates the sequence.
    t.engine.stories.delete_current(&handle).await.unwrap();
    assert_eq!(
        handle.status(),
        lagoon::service::PlaybackStatus::Finished
    );
    assert!(handle.current().await.is_none());
}
