//! Remote collaborators
//!
//! The engine consumes three external services, each behind a trait and
//! treated as opaque beyond its documented shape: the remote data
//! service (queries and mutations keyed by profileId), the identity
//! provider (current session user), and media storage (see
//! `crate::storage`). Every call is a network operation with
//! independent success or failure; nothing here is retried
//! automatically.

mod memory;
mod records;

pub use memory::InMemoryRemote;
pub use records::*;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::data::{AuthId, FollowEdge, ProfileId, ReactionKind};
use crate::error::Result;

/// Query/mutation surface of the remote data service.
///
/// Server-side uniqueness constraints are assumed for (user, content)
/// reaction rows, follow pairs, and conversation pairs; duplicate
/// inserts either no-op or surface `EngineError::Conflict`, which
/// idempotent toggles treat as success.
#[async_trait]
pub trait RemoteDataService: Send + Sync {
    // =========================================================================
    // Profiles
    // =========================================================================

    /// Look up the profile provisioned for an identity-provider key
    async fn profile_by_auth(&self, auth_id: &AuthId) -> Result<Option<ProfileRecord>>;

    /// Look up one profile by its content-service key
    async fn profile_by_id(&self, profile_id: &ProfileId) -> Result<Option<ProfileRecord>>;

    /// Batched lookup for a distinct id set; unknown ids are skipped
    async fn profiles_by_ids(&self, profile_ids: &[ProfileId]) -> Result<Vec<ProfileRecord>>;

    /// Full profile listing (drives directory reloads)
    async fn all_profiles(&self) -> Result<Vec<ProfileRecord>>;

    /// Provision a profile for a first login
    async fn create_profile(&self, profile: NewProfile) -> Result<ProfileRecord>;

    // =========================================================================
    // Content
    // =========================================================================

    async fn fetch_posts(&self) -> Result<Vec<ContentRecord>>;

    async fn fetch_reels(&self) -> Result<Vec<ContentRecord>>;

    async fn create_content(&self, content: NewContent) -> Result<ContentRecord>;

    async fn update_caption(&self, content_id: &str, caption: &str) -> Result<()>;

    async fn set_sponsor(&self, content_id: &str, sponsor_name: &str) -> Result<()>;

    async fn delete_content(&self, content_id: &str) -> Result<()>;

    // =========================================================================
    // Reactions
    // =========================================================================

    /// Insert a reaction row; duplicate rows no-op (insert-or-ignore)
    async fn add_reaction(
        &self,
        profile_id: &ProfileId,
        content_id: &str,
        kind: ReactionKind,
    ) -> Result<()>;

    /// Delete a reaction row; absent rows no-op
    async fn remove_reaction(
        &self,
        profile_id: &ProfileId,
        content_id: &str,
        kind: ReactionKind,
    ) -> Result<()>;

    /// Authoritative membership for one item, used to reconcile after
    /// an uncertain mutation
    async fn reactions_for(&self, content_id: &str) -> Result<ReactionSnapshot>;

    // =========================================================================
    // Follows
    // =========================================================================

    /// Insert a follow edge; duplicates no-op (insert-or-ignore)
    async fn insert_follow(&self, edge: &FollowEdge) -> Result<()>;

    /// Delete a follow edge; absent edges no-op
    async fn delete_follow(&self, edge: &FollowEdge) -> Result<()>;

    /// The full flat edge list
    async fn fetch_follow_edges(&self) -> Result<Vec<FollowEdge>>;

    // =========================================================================
    // Stories
    // =========================================================================

    /// Stories created at or after `cutoff` (the server-side window)
    async fn fetch_stories_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<StoryRecord>>;

    async fn create_story(&self, story: NewStory) -> Result<StoryRecord>;

    async fn delete_story(&self, story_id: &str) -> Result<()>;

    // =========================================================================
    // Conversations and messages
    // =========================================================================

    /// Find the conversation for an unordered pair, if any. Lookup must
    /// precede create to keep at most one conversation per pair.
    async fn find_conversation(
        &self,
        a: &ProfileId,
        b: &ProfileId,
    ) -> Result<Option<ConversationRecord>>;

    /// Create a conversation; an existing pair surfaces `Conflict`
    async fn create_conversation(
        &self,
        a: &ProfileId,
        b: &ProfileId,
    ) -> Result<ConversationRecord>;

    async fn insert_message(&self, message: NewMessage) -> Result<MessageRecord>;

    /// All messages where `profile_id` is sender or receiver
    async fn messages_involving(&self, profile_id: &ProfileId) -> Result<Vec<MessageRecord>>;
}

/// Read-only view of the identity provider's current session.
///
/// The engine never issues credentials or manages sessions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The signed-in user, or `NotFound` when no session exists
    async fn current_user(&self) -> Result<SessionUser>;
}

/// Identity provider with a fixed session, for demos and tests
pub struct StaticIdentityProvider {
    user: SessionUser,
}

impl StaticIdentityProvider {
    pub fn new(user: SessionUser) -> Self {
        Self { user }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn current_user(&self) -> Result<SessionUser> {
        Ok(self.user.clone())
    }
}
