//! E2E tests for feed aggregation and content authoring

mod common;

use chrono::{Duration, Utc};
use common::TestEngine;
use lagoon::data::{ContentKind, MediaField, MediaKind};
use lagoon::error::EngineError;
use lagoon::remote::RemoteDataService;

#[tokio::test]
async fn feed_merges_posts_and_reels_by_created_at_desc() {
    let t = TestEngine::new().await;
    let ada = t.seed_user("ada").await;
    let now = Utc::now();

    t.seed_post("post-old", &ada, MediaField::one("http://cdn/a.jpg"), now - Duration::hours(5))
        .await;
    t.seed_reel("reel-mid", &ada, now - Duration::hours(3)).await;
    t.seed_post("post-new", &ada, MediaField::one("http://cdn/b.jpg"), now - Duration::hours(1))
        .await;

    let feed = t.engine.feed.refresh_feed().await.unwrap();
    let ids: Vec<&str> = feed.iter().map(|e| e.content.id.as_str()).collect();
    assert_eq!(ids, vec!["post-new", "reel-mid", "post-old"]);
}

#[tokio::test]
async fn equal_timestamps_keep_posts_ahead_of_reels() {
    let t = TestEngine::new().await;
    let ada = t.seed_user("ada").await;
    let at = Utc::now() - Duration::hours(2);

    t.seed_reel("reel-tied", &ada, at).await;
    t.seed_post("post-tied", &ada, MediaField::one("http://cdn/a.jpg"), at)
        .await;

    let feed = t.engine.feed.refresh_feed().await.unwrap();
    let ids: Vec<&str> = feed.iter().map(|e| e.content.id.as_str()).collect();
    assert_eq!(ids, vec!["post-tied", "reel-tied"]);
}

#[tokio::test]
async fn comma_joined_media_field_becomes_gallery() {
    let t = TestEngine::new().await;
    let ada = t.seed_user("ada").await;

    t.seed_post(
        "post-gallery",
        &ada,
        MediaField::one("http://x/1.jpg,http://x/2.jpg"),
        Utc::now() - Duration::hours(1),
    )
    .await;

    let feed = t.engine.feed.refresh_feed().await.unwrap();
    let media = &feed[0].content.media;
    assert_eq!(media.len(), 2);
    assert_eq!(media[0].url, "http://x/1.jpg");
    assert_eq!(media[1].url, "http://x/2.jpg");
}

#[tokio::test]
async fn corrupt_media_degrades_to_placeholder_not_partial() {
    let t = TestEngine::new().await;
    let ada = t.seed_user("ada").await;

    t.seed_post(
        "post-corrupt",
        &ada,
        MediaField::Many(vec![
            "http://x/ok.jpg".to_string(),
            "http://x/a.jpg,http://x/b.jpg".to_string(),
        ]),
        Utc::now() - Duration::hours(1),
    )
    .await;

    let feed = t.engine.feed.refresh_feed().await.unwrap();
    // The whole list is rejected; the item stays but renders empty.
    assert_eq!(feed.len(), 1);
    assert!(feed[0].content.media.is_empty());
}

#[tokio::test]
async fn reel_media_is_tagged_video() {
    let t = TestEngine::new().await;
    let ada = t.seed_user("ada").await;
    t.seed_reel("reel-1", &ada, Utc::now() - Duration::hours(1)).await;

    let feed = t.engine.feed.refresh_feed().await.unwrap();
    assert!(feed[0].content.media.iter().all(|m| m.is_video));
}

#[tokio::test]
async fn author_metadata_is_attached() {
    let t = TestEngine::new().await;
    let ada = t.seed_user("ada").await;
    t.seed_post("post-1", &ada, MediaField::one("http://cdn/a.jpg"), Utc::now())
        .await;

    let feed = t.engine.feed.refresh_feed().await.unwrap();
    assert_eq!(feed[0].attribution.display_name, "ada");
    assert_eq!(
        feed[0].attribution.avatar_url.as_deref(),
        Some("http://cdn/avatars/ada.jpg")
    );
    assert!(!feed[0].attribution.sponsored);
}

#[tokio::test]
async fn sponsored_entry_displays_sponsor_but_ownership_stays_with_uploader() {
    let t = TestEngine::new().await;
    let ada = t.seed_user("ada").await;
    t.seed_post("post-spon", &ada, MediaField::one("http://cdn/a.jpg"), Utc::now())
        .await;
    t.remote.set_sponsor("post-spon", "brandco").await.unwrap();

    let feed = t.engine.feed.refresh_feed().await.unwrap();
    let entry = &feed[0];
    assert!(entry.attribution.sponsored);
    assert_eq!(entry.attribution.display_name, "brandco");
    // The uploader keeps edit/delete rights.
    assert_eq!(entry.content.author_id, ada);

    let denied = t.engine.feed.delete_content("post-spon").await;
    assert!(matches!(denied, Err(EngineError::Forbidden)));
}

#[tokio::test]
async fn publish_prepends_optimistically_and_persists() {
    let t = TestEngine::new().await;
    let me = t.me().await;

    let entry = t
        .engine
        .feed
        .publish(
            ContentKind::Post,
            vec![(vec![1, 2, 3], "image/jpeg".to_string())],
            "fresh".to_string(),
            MediaKind::Image,
        )
        .await
        .unwrap();
    assert_eq!(entry.content.author_id, me.profile_id);

    // Visible locally before any refresh.
    let local = t.engine.feed.feed().await;
    assert_eq!(local[0].content.id, entry.content.id);
    assert_eq!(t.media.upload_count().await, 1);

    // And present after an authoritative refresh.
    let refreshed = t.engine.feed.refresh_feed().await.unwrap();
    assert!(refreshed.iter().any(|e| e.content.id == entry.content.id));
}

#[tokio::test]
async fn delete_and_caption_edit_require_ownership() {
    let t = TestEngine::new().await;
    let ada = t.seed_user("ada").await;
    t.seed_post("post-ada", &ada, MediaField::one("http://cdn/a.jpg"), Utc::now())
        .await;
    t.engine.feed.refresh_feed().await.unwrap();

    assert!(matches!(
        t.engine.feed.delete_content("post-ada").await,
        Err(EngineError::Forbidden)
    ));
    assert!(matches!(
        t.engine.feed.edit_caption("post-ada", "mine now").await,
        Err(EngineError::Forbidden)
    ));

    let own = t
        .engine
        .feed
        .publish(
            ContentKind::Post,
            vec![(vec![9], "image/png".to_string())],
            "own".to_string(),
            MediaKind::Image,
        )
        .await
        .unwrap();
    t.engine
        .feed
        .edit_caption(&own.content.id, "edited")
        .await
        .unwrap();
    t.engine.feed.delete_content(&own.content.id).await.unwrap();

    let refreshed = t.engine.feed.refresh_feed().await.unwrap();
    assert!(!refreshed.iter().any(|e| e.content.id == own.content.id));
}

#[tokio::test]
async fn set_sponsor_requires_the_sponsor_role() {
    let t = TestEngine::new().await;
    let ada = t.seed_user("ada").await;
    t.seed_post("post-1", &ada, MediaField::one("http://cdn/a.jpg"), Utc::now())
        .await;
    t.engine.feed.refresh_feed().await.unwrap();

    let denied = t.engine.feed.set_sponsor("post-1", "brandco").await;
    assert!(matches!(denied, Err(EngineError::Forbidden)));
}
