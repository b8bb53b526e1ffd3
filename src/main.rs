//! Lagoon demo binary
//!
//! Boots the engine against the in-memory remote with a little seeded
//! content, runs one full sync cycle, sends a message, and logs what
//! the local caches ended up holding.

use std::sync::Arc;

use chrono::{Duration, Utc};
use lagoon::data::{AuthId, ContentKind, FollowEdge, MediaField, ProfileId};
use lagoon::remote::{
    ContentRecord, InMemoryRemote, ProfileRecord, SessionUser, StaticIdentityProvider, StoryRecord,
};
use lagoon::storage::InMemoryMediaStore;
use lagoon::{SyncEngine, config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Demo entry point
///
/// # Setup
/// 1. Initialize tracing/logging
/// 2. Load configuration from file and environment
/// 3. Seed the in-memory remote
/// 4. Initialize the engine and run one sync cycle
/// 5. Start and stop the background pollers
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize tracing/logging
    let log_format =
        std::env::var("LAGOON__LOGGING__FORMAT").unwrap_or_else(|_| "pretty".to_string());

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "lagoon=info".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "lagoon=info".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    tracing::info!("Starting Lagoon demo...");

    // 2. Initialize metrics
    lagoon::metrics::init_metrics();

    // 3. Load configuration
    let config = config::EngineConfig::load()?;
    tracing::info!(
        message_interval = config.polling.message_interval_seconds,
        "Configuration loaded"
    );

    // 4. Seed the in-memory remote
    let remote = Arc::new(InMemoryRemote::new());
    seed_demo_data(&remote).await;

    let provider = Arc::new(StaticIdentityProvider::new(SessionUser {
        auth_id: AuthId("auth-demo".to_string()),
        email: "demo@example.com".to_string(),
        display_name: Some("Demo".to_string()),
        avatar_url: None,
    }));
    let media_store = Arc::new(InMemoryMediaStore::new());

    // 5. Initialize the engine and run one cycle
    let engine = SyncEngine::new(config, remote, provider, media_store).await?;
    engine.sync_once().await?;

    for entry in engine.feed.feed().await {
        tracing::info!(
            id = %entry.content.id,
            kind = entry.content.kind.as_str(),
            by = %entry.attribution.display_name,
            sponsored = entry.attribution.sponsored,
            media = entry.content.media.len(),
            likes = entry.like_count,
            "Feed entry"
        );
    }
    for group in engine.stories.groups().await {
        tracing::info!(
            author = %group.author.label(),
            stories = group.stories.len(),
            "Story group"
        );
    }

    // 6. Send a message and read the transcript back
    let counterpart = AuthId("auth-ada".to_string());
    engine.messaging.send(&counterpart, "hi from the demo").await?;
    engine.messaging.pull().await?;
    let transcript = engine.messaging.transcript(&counterpart).await;
    tracing::info!(messages = transcript.len(), "Transcript with ada");

    // 7. Background pollers start and stop together
    let background = engine.start_background();
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    background.shutdown();

    tracing::info!("Demo finished");
    Ok(())
}

/// A pair of profiles, some content, a follow edge, and a story
async fn seed_demo_data(remote: &InMemoryRemote) {
    let now = Utc::now();
    let ada = ProfileId("p-ada".to_string());
    let lin = ProfileId("p-lin".to_string());

    remote
        .seed_profile(ProfileRecord {
            profile_id: ada.clone(),
            auth_id: AuthId("auth-ada".to_string()),
            username: "ada".to_string(),
            display_name: Some("Ada".to_string()),
            avatar_url: None,
            email: Some("ada@example.com".to_string()),
            is_sponsor: false,
            created_at: now - Duration::days(30),
        })
        .await;
    remote
        .seed_profile(ProfileRecord {
            profile_id: lin.clone(),
            auth_id: AuthId("auth-lin".to_string()),
            username: "lin".to_string(),
            display_name: None,
            avatar_url: None,
            email: Some("lin@example.com".to_string()),
            is_sponsor: true,
            created_at: now - Duration::days(12),
        })
        .await;

    remote
        .seed_post(ContentRecord {
            id: "post-1".to_string(),
            kind: ContentKind::Post,
            author_id: ada.clone(),
            media: MediaField::one("http://cdn/demo/1.jpg,http://cdn/demo/2.jpg"),
            is_video: false,
            caption: "two from the weekend".to_string(),
            sponsor_name: None,
            liked_by: vec![lin.clone()],
            disliked_by: vec![],
            created_at: now - Duration::hours(3),
        })
        .await;
    remote
        .seed_reel(ContentRecord {
            id: "reel-1".to_string(),
            kind: ContentKind::Reel,
            author_id: lin.clone(),
            media: MediaField::one("http://cdn/demo/clip.mp4"),
            is_video: true,
            caption: "quick clip".to_string(),
            sponsor_name: None,
            liked_by: vec![],
            disliked_by: vec![],
            created_at: now - Duration::hours(1),
        })
        .await;

    remote
        .seed_follow(FollowEdge {
            follower_id: ada.clone(),
            following_id: lin.clone(),
        })
        .await;

    remote
        .seed_story(StoryRecord {
            id: "story-1".to_string(),
            author_id: ada,
            media_url: "http://cdn/demo/story.jpg".to_string(),
            is_video: false,
            created_at: now - Duration::hours(2),
        })
        .await;
}
