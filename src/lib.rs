//! Lagoon - a client-side synchronization and caching engine for a
//! social media app
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - feed aggregation, reactions, graph, stories, messaging  │
//! │  - identity indirection (authId <-> profileId)              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - local cache slices (volatile)                            │
//! │  - media reference normalization                            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Remote Collaborators (traits)                │
//! │  - remote data service, identity provider, media storage    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `service`: one component per sync concern
//! - `data`: local models, normalization, cache slices
//! - `remote`: trait boundary to the remote services
//! - `storage`: media upload boundary
//! - `config`: configuration management
//! - `metrics`: Prometheus instruments
//! - `error`: error types

pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod remote;
pub mod service;
pub mod storage;

use std::sync::Arc;

use tokio::task::JoinHandle;

/// Engine state shared across all components
///
/// Owns the configuration, the remote collaborators, every cache
/// slice, and the services operating on them. All slices key off the
/// same identity indirection, resolved only by `IdentityService`.
#[derive(Clone)]
pub struct SyncEngine {
    /// Engine configuration
    pub config: Arc<config::EngineConfig>,

    /// Identity resolution and the known-user directory
    pub identity: Arc<service::IdentityService>,

    /// Feed aggregation and content authoring
    pub feed: Arc<service::FeedService>,

    /// Like/dislike state per content item
    pub reactions: Arc<service::ReactionService>,

    /// Follow graph views and toggling
    pub graph: Arc<service::GraphService>,

    /// Ephemeral stories and playback
    pub stories: Arc<service::StoryService>,

    /// Message sending and polling reconciliation
    pub messaging: Arc<service::MessagingService>,

    /// Best-effort online signal
    pub presence: Arc<service::PresenceService>,
}

impl SyncEngine {
    /// Initialize the engine against its three remote collaborators.
    ///
    /// # Steps
    /// 1. Build the cache slices
    /// 2. Wire the services
    /// 3. Resolve the session profile, provisioning on first login
    ///
    /// # Errors
    /// Returns error when the session identity cannot be resolved or
    /// provisioned; that failure is fatal to engine startup.
    pub async fn new(
        config: config::EngineConfig,
        remote: Arc<dyn remote::RemoteDataService>,
        provider: Arc<dyn remote::IdentityProvider>,
        media_store: Arc<dyn storage::MediaStore>,
    ) -> Result<Self, error::EngineError> {
        tracing::info!("Initializing sync engine...");

        // 1. Cache slices
        let directory = Arc::new(data::UserDirectory::new());
        let profiles = Arc::new(data::ProfileCache::new(config.cache.profile_ttl()));
        let feed_cache = Arc::new(data::FeedCache::new());
        let ledger = Arc::new(data::ReactionLedger::new());
        let graph_cache = Arc::new(data::GraphCache::new());
        let story_cache = Arc::new(data::StoryCache::new());
        let transcripts = Arc::new(data::Transcripts::new());

        // 2. Services
        let identity = Arc::new(service::IdentityService::new(
            Arc::clone(&remote),
            provider,
            Arc::clone(&directory),
            Arc::clone(&profiles),
        ));
        let feed = Arc::new(service::FeedService::new(
            Arc::clone(&remote),
            Arc::clone(&media_store),
            Arc::clone(&identity),
            Arc::clone(&feed_cache),
            Arc::clone(&ledger),
            Arc::clone(&profiles),
        ));
        let reactions = Arc::new(service::ReactionService::new(
            Arc::clone(&remote),
            Arc::clone(&identity),
            Arc::clone(&ledger),
        ));
        let graph = Arc::new(service::GraphService::new(
            Arc::clone(&remote),
            Arc::clone(&identity),
            Arc::clone(&graph_cache),
        ));
        let stories = Arc::new(service::StoryService::new(
            Arc::clone(&remote),
            Arc::clone(&media_store),
            Arc::clone(&identity),
            Arc::clone(&story_cache),
            config.stories.clone(),
        ));
        let messaging = Arc::new(service::MessagingService::new(
            Arc::clone(&remote),
            Arc::clone(&identity),
            Arc::clone(&transcripts),
            config.messaging.clone(),
        ));
        let presence = Arc::new(service::PresenceService::new(Arc::clone(&directory)));

        // 3. Session profile (provisions on first login)
        let profile = identity.ensure_session().await?;
        tracing::info!(
            profile_id = %profile.profile_id,
            username = %profile.username,
            "Session profile resolved"
        );

        Ok(Self {
            config: Arc::new(config),
            identity,
            feed,
            reactions,
            graph,
            stories,
            messaging,
            presence,
        })
    }

    /// Run one full reconciliation cycle: feed, graph, then stories
    /// (stories refresh whenever the feed or graph changes owner
    /// context), and one message pull.
    pub async fn sync_once(&self) -> Result<(), error::EngineError> {
        self.feed.refresh_feed().await?;
        self.graph.refresh_graph().await?;
        self.stories.refresh_stories().await?;
        self.messaging.pull().await?;
        Ok(())
    }

    /// Spawn the background polling tasks: the message pull and the
    /// known-user reload, each on its own fixed interval. Both cancel
    /// together when the returned handle shuts down or drops, so no
    /// work leaks past the viewing session.
    pub fn start_background(&self) -> BackgroundSync {
        let mut tasks = Vec::new();

        let messaging = Arc::clone(&self.messaging);
        let message_interval = self.config.polling.message_interval();
        tasks.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(message_interval);
            // Consume the immediate first tick so the first pull lands
            // one interval after startup.
            interval.tick().await;
            loop {
                interval.tick().await;
                if let Err(error) = messaging.pull().await {
                    tracing::warn!(%error, "Scheduled message pull failed");
                }
            }
        }));
        tracing::info!("Message poll task spawned");

        let identity = Arc::clone(&self.identity);
        let reload_interval = self.config.polling.user_reload_interval();
        tasks.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(reload_interval);
            interval.tick().await;
            loop {
                interval.tick().await;
                if let Err(error) = identity.reload_users().await {
                    tracing::warn!(%error, "Scheduled user reload failed");
                }
            }
        }));
        tracing::info!("User reload task spawned");

        BackgroundSync { tasks }
    }
}

/// Handle over the background polling tasks.
///
/// The tasks stop together on `shutdown` and on drop.
pub struct BackgroundSync {
    tasks: Vec<JoinHandle<()>>,
}

impl BackgroundSync {
    /// Stop all background work
    pub fn shutdown(mut self) {
        self.abort_all();
    }

    fn abort_all(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for BackgroundSync {
    fn drop(&mut self) {
        self.abort_all();
    }
}
