//! Common test utilities for E2E tests

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use lagoon::data::{AuthId, ContentKind, FollowEdge, MediaField, ProfileId, UserProfile};
use lagoon::remote::{
    ContentRecord, InMemoryRemote, ProfileRecord, SessionUser, StaticIdentityProvider, StoryRecord,
};
use lagoon::storage::InMemoryMediaStore;
use lagoon::{SyncEngine, config};

/// Engine instance wired to a shared in-memory remote
pub struct TestEngine {
    pub engine: SyncEngine,
    pub remote: Arc<InMemoryRemote>,
    pub media: Arc<InMemoryMediaStore>,
}

impl TestEngine {
    /// Engine with a fresh remote and the default session user
    pub async fn new() -> Self {
        Self::with_session(Arc::new(InMemoryRemote::new()), "me").await
    }

    /// Engine for `name` over an existing remote; a second engine on
    /// the same remote simulates the other side of a conversation.
    pub async fn with_session(remote: Arc<InMemoryRemote>, name: &str) -> Self {
        let provider = Arc::new(StaticIdentityProvider::new(SessionUser {
            auth_id: AuthId(format!("auth-{name}")),
            email: format!("{name}@example.com"),
            display_name: None,
            avatar_url: None,
        }));
        let media = Arc::new(InMemoryMediaStore::new());
        let engine = SyncEngine::new(
            test_config(),
            Arc::clone(&remote) as Arc<dyn lagoon::remote::RemoteDataService>,
            provider,
            Arc::clone(&media) as Arc<dyn lagoon::storage::MediaStore>,
        )
        .await
        .unwrap();
        Self {
            engine,
            remote,
            media,
        }
    }

    /// The session user's resolved profile
    pub async fn me(&self) -> UserProfile {
        self.engine.identity.current_profile().await.unwrap()
    }

    /// Seed another user's profile; returns its profile id
    pub async fn seed_user(&self, name: &str) -> ProfileId {
        let profile_id = ProfileId(format!("p-{name}"));
        self.remote
            .seed_profile(ProfileRecord {
                profile_id: profile_id.clone(),
                auth_id: AuthId(format!("auth-{name}")),
                username: name.to_string(),
                display_name: None,
                avatar_url: Some(format!("http://cdn/avatars/{name}.jpg")),
                email: Some(format!("{name}@example.com")),
                is_sponsor: false,
                created_at: Utc::now() - Duration::days(7),
            })
            .await;
        profile_id
    }

    /// Seed a post with image media
    pub async fn seed_post(
        &self,
        id: &str,
        author: &ProfileId,
        media: MediaField,
        created_at: DateTime<Utc>,
    ) {
        self.remote
            .seed_post(ContentRecord {
                id: id.to_string(),
                kind: ContentKind::Post,
                author_id: author.clone(),
                media,
                is_video: false,
                caption: format!("caption for {id}"),
                sponsor_name: None,
                liked_by: vec![],
                disliked_by: vec![],
                created_at,
            })
            .await;
    }

    /// Seed a reel (video media)
    pub async fn seed_reel(&self, id: &str, author: &ProfileId, created_at: DateTime<Utc>) {
        self.remote
            .seed_reel(ContentRecord {
                id: id.to_string(),
                kind: ContentKind::Reel,
                author_id: author.clone(),
                media: MediaField::one(format!("http://cdn/reels/{id}.mp4")),
                is_video: true,
                caption: format!("caption for {id}"),
                sponsor_name: None,
                liked_by: vec![],
                disliked_by: vec![],
                created_at,
            })
            .await;
    }

    /// Seed a post carrying reaction membership
    pub async fn seed_post_with_reactions(
        &self,
        id: &str,
        author: &ProfileId,
        liked_by: Vec<ProfileId>,
        disliked_by: Vec<ProfileId>,
    ) {
        self.remote
            .seed_post(ContentRecord {
                id: id.to_string(),
                kind: ContentKind::Post,
                author_id: author.clone(),
                media: MediaField::one(format!("http://cdn/posts/{id}.jpg")),
                is_video: false,
                caption: format!("caption for {id}"),
                sponsor_name: None,
                liked_by,
                disliked_by,
                created_at: Utc::now() - Duration::hours(1),
            })
            .await;
    }

    /// Seed a story with an explicit age
    pub async fn seed_story(&self, id: &str, author: &ProfileId, age: Duration) {
        self.remote
            .seed_story(StoryRecord {
                id: id.to_string(),
                author_id: author.clone(),
                media_url: format!("http://cdn/stories/{id}.jpg"),
                is_video: false,
                created_at: Utc::now() - age,
            })
            .await;
    }

    /// Seed a follow edge directly on the remote
    pub async fn seed_follow(&self, follower: &ProfileId, following: &ProfileId) {
        self.remote
            .seed_follow(FollowEdge {
                follower_id: follower.clone(),
                following_id: following.clone(),
            })
            .await;
    }
}

/// Configuration with short intervals suitable for tests
pub fn test_config() -> config::EngineConfig {
    config::EngineConfig {
        polling: config::PollingConfig {
            message_interval_seconds: 1,
            user_reload_interval_seconds: 1,
        },
        stories: config::StoryConfig {
            image_duration_seconds: 5,
            tick_milliseconds: 50,
        },
        messaging: config::MessagingConfig {
            echo_retract_window_seconds: 30,
        },
        cache: config::CacheConfig {
            profile_ttl_seconds: 60,
        },
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}
