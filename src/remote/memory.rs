//! In-memory remote backend
//!
//! A complete in-process implementation of `RemoteDataService` with the
//! same uniqueness semantics the engine assumes of a real backend:
//! insert-or-ignore reaction and follow rows, at most one conversation
//! per pair. Backs the demo binary and the integration tests, where its
//! per-operation failure injection exercises the reconciliation paths.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::data::{AuthId, EntityId, FollowEdge, ProfileId, ReactionKind};
use crate::error::{EngineError, Result};
use crate::remote::records::{
    ContentRecord, ConversationRecord, MessageRecord, NewContent, NewMessage, NewProfile,
    NewStory, ProfileRecord, ReactionSnapshot, StoryRecord,
};
use crate::remote::RemoteDataService;

#[derive(Debug, Clone, PartialEq, Eq)]
struct ReactionRow {
    profile_id: ProfileId,
    content_id: String,
    kind: ReactionKind,
}

#[derive(Default)]
struct Tables {
    profiles: Vec<ProfileRecord>,
    posts: Vec<ContentRecord>,
    reels: Vec<ContentRecord>,
    reactions: Vec<ReactionRow>,
    follows: Vec<FollowEdge>,
    stories: Vec<StoryRecord>,
    conversations: Vec<ConversationRecord>,
    messages: Vec<MessageRecord>,
}

/// In-memory backend with failure injection
#[derive(Default)]
pub struct InMemoryRemote {
    tables: Mutex<Tables>,
    /// Operation name -> remaining injected failures
    failures: Mutex<HashMap<String, u32>>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call to `op` fail with `EngineError::Remote`
    pub async fn fail_once(&self, op: &str) {
        self.fail_times(op, 1).await;
    }

    /// Make the next `count` calls to `op` fail
    pub async fn fail_times(&self, op: &str, count: u32) {
        *self.failures.lock().await.entry(op.to_string()).or_default() += count;
    }

    /// Drop all pending injected failures
    pub async fn clear_failures(&self) {
        self.failures.lock().await.clear();
    }

    async fn check_fail(&self, op: &str) -> Result<()> {
        let mut failures = self.failures.lock().await;
        if let Some(remaining) = failures.get_mut(op) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(EngineError::Remote(format!("injected failure: {op}")));
            }
        }
        Ok(())
    }

    // =========================================================================
    // Seeding (demo binary and tests)
    // =========================================================================

    pub async fn seed_profile(&self, record: ProfileRecord) {
        self.tables.lock().await.profiles.push(record);
    }

    pub async fn seed_post(&self, record: ContentRecord) {
        self.tables.lock().await.posts.push(record);
    }

    pub async fn seed_reel(&self, record: ContentRecord) {
        self.tables.lock().await.reels.push(record);
    }

    pub async fn seed_story(&self, record: StoryRecord) {
        self.tables.lock().await.stories.push(record);
    }

    pub async fn seed_follow(&self, edge: FollowEdge) {
        self.tables.lock().await.follows.push(edge);
    }

    /// Count of stored conversations, for uniqueness assertions
    pub async fn conversation_count(&self) -> usize {
        self.tables.lock().await.conversations.len()
    }

    /// Count of stored messages, for duplication assertions
    pub async fn message_count(&self) -> usize {
        self.tables.lock().await.messages.len()
    }
}

#[async_trait]
impl RemoteDataService for InMemoryRemote {
    // =========================================================================
    // Profiles
    // =========================================================================

    async fn profile_by_auth(&self, auth_id: &AuthId) -> Result<Option<ProfileRecord>> {
        self.check_fail("profile_by_auth").await?;
        let tables = self.tables.lock().await;
        Ok(tables
            .profiles
            .iter()
            .find(|p| p.auth_id == *auth_id)
            .cloned())
    }

    async fn profile_by_id(&self, profile_id: &ProfileId) -> Result<Option<ProfileRecord>> {
        self.check_fail("profile_by_id").await?;
        let tables = self.tables.lock().await;
        Ok(tables
            .profiles
            .iter()
            .find(|p| p.profile_id == *profile_id)
            .cloned())
    }

    async fn profiles_by_ids(&self, profile_ids: &[ProfileId]) -> Result<Vec<ProfileRecord>> {
        self.check_fail("profiles_by_ids").await?;
        let tables = self.tables.lock().await;
        Ok(tables
            .profiles
            .iter()
            .filter(|p| profile_ids.contains(&p.profile_id))
            .cloned()
            .collect())
    }

    async fn all_profiles(&self) -> Result<Vec<ProfileRecord>> {
        self.check_fail("all_profiles").await?;
        Ok(self.tables.lock().await.profiles.clone())
    }

    async fn create_profile(&self, profile: NewProfile) -> Result<ProfileRecord> {
        self.check_fail("create_profile").await?;
        let mut tables = self.tables.lock().await;
        if tables.profiles.iter().any(|p| p.auth_id == profile.auth_id) {
            return Err(EngineError::Conflict);
        }
        let record = ProfileRecord {
            profile_id: ProfileId(EntityId::new().0),
            auth_id: profile.auth_id,
            username: profile.username,
            display_name: profile.display_name,
            avatar_url: profile.avatar_url,
            email: profile.email,
            is_sponsor: false,
            created_at: Utc::now(),
        };
        tables.profiles.push(record.clone());
        Ok(record)
    }

    // =========================================================================
    // Content
    // =========================================================================

    async fn fetch_posts(&self) -> Result<Vec<ContentRecord>> {
        self.check_fail("fetch_posts").await?;
        Ok(self.tables.lock().await.posts.clone())
    }

    async fn fetch_reels(&self) -> Result<Vec<ContentRecord>> {
        self.check_fail("fetch_reels").await?;
        Ok(self.tables.lock().await.reels.clone())
    }

    async fn create_content(&self, content: NewContent) -> Result<ContentRecord> {
        self.check_fail("create_content").await?;
        let record = ContentRecord {
            id: EntityId::new().0,
            kind: content.kind,
            author_id: content.author_id,
            media: content.media,
            is_video: content.is_video,
            caption: content.caption,
            sponsor_name: None,
            liked_by: Vec::new(),
            disliked_by: Vec::new(),
            created_at: Utc::now(),
        };
        let mut tables = self.tables.lock().await;
        match record.kind {
            crate::data::ContentKind::Post => tables.posts.push(record.clone()),
            crate::data::ContentKind::Reel => tables.reels.push(record.clone()),
        }
        Ok(record)
    }

    async fn update_caption(&self, content_id: &str, caption: &str) -> Result<()> {
        self.check_fail("update_caption").await?;
        let mut tables = self.tables.lock().await;
        let tables = &mut *tables;
        let item = tables
            .posts
            .iter_mut()
            .chain(tables.reels.iter_mut())
            .find(|c| c.id == content_id)
            .ok_or(EngineError::NotFound)?;
        item.caption = caption.to_string();
        Ok(())
    }

    async fn set_sponsor(&self, content_id: &str, sponsor_name: &str) -> Result<()> {
        self.check_fail("set_sponsor").await?;
        let mut tables = self.tables.lock().await;
        let tables = &mut *tables;
        let item = tables
            .posts
            .iter_mut()
            .chain(tables.reels.iter_mut())
            .find(|c| c.id == content_id)
            .ok_or(EngineError::NotFound)?;
        item.sponsor_name = Some(sponsor_name.to_string());
        Ok(())
    }

    async fn delete_content(&self, content_id: &str) -> Result<()> {
        self.check_fail("delete_content").await?;
        let mut tables = self.tables.lock().await;
        tables.posts.retain(|c| c.id != content_id);
        tables.reels.retain(|c| c.id != content_id);
        tables.reactions.retain(|r| r.content_id != content_id);
        Ok(())
    }

    // =========================================================================
    // Reactions
    // =========================================================================

    async fn add_reaction(
        &self,
        profile_id: &ProfileId,
        content_id: &str,
        kind: ReactionKind,
    ) -> Result<()> {
        self.check_fail("add_reaction").await?;
        let row = ReactionRow {
            profile_id: profile_id.clone(),
            content_id: content_id.to_string(),
            kind,
        };
        let mut tables = self.tables.lock().await;
        // Insert-or-ignore on the (user, content, kind) uniqueness row
        if !tables.reactions.contains(&row) {
            tables.reactions.push(row);
        }
        Ok(())
    }

    async fn remove_reaction(
        &self,
        profile_id: &ProfileId,
        content_id: &str,
        kind: ReactionKind,
    ) -> Result<()> {
        self.check_fail("remove_reaction").await?;
        let mut tables = self.tables.lock().await;
        tables.reactions.retain(|r| {
            !(r.profile_id == *profile_id && r.content_id == content_id && r.kind == kind)
        });
        Ok(())
    }

    async fn reactions_for(&self, content_id: &str) -> Result<ReactionSnapshot> {
        self.check_fail("reactions_for").await?;
        let tables = self.tables.lock().await;
        let mut snapshot = ReactionSnapshot::default();
        for row in tables.reactions.iter().filter(|r| r.content_id == content_id) {
            match row.kind {
                ReactionKind::Like => snapshot.liked_by.push(row.profile_id.clone()),
                ReactionKind::Dislike => snapshot.disliked_by.push(row.profile_id.clone()),
            }
        }
        Ok(snapshot)
    }

    // =========================================================================
    // Follows
    // =========================================================================

    async fn insert_follow(&self, edge: &FollowEdge) -> Result<()> {
        self.check_fail("insert_follow").await?;
        let mut tables = self.tables.lock().await;
        if !tables.follows.contains(edge) {
            tables.follows.push(edge.clone());
        }
        Ok(())
    }

    async fn delete_follow(&self, edge: &FollowEdge) -> Result<()> {
        self.check_fail("delete_follow").await?;
        self.tables.lock().await.follows.retain(|e| e != edge);
        Ok(())
    }

    async fn fetch_follow_edges(&self) -> Result<Vec<FollowEdge>> {
        self.check_fail("fetch_follow_edges").await?;
        Ok(self.tables.lock().await.follows.clone())
    }

    // =========================================================================
    // Stories
    // =========================================================================

    async fn fetch_stories_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<StoryRecord>> {
        self.check_fail("fetch_stories_since").await?;
        let tables = self.tables.lock().await;
        Ok(tables
            .stories
            .iter()
            .filter(|s| s.created_at >= cutoff)
            .cloned()
            .collect())
    }

    async fn create_story(&self, story: NewStory) -> Result<StoryRecord> {
        self.check_fail("create_story").await?;
        let record = StoryRecord {
            id: EntityId::new().0,
            author_id: story.author_id,
            media_url: story.media_url,
            is_video: story.is_video,
            created_at: Utc::now(),
        };
        self.tables.lock().await.stories.push(record.clone());
        Ok(record)
    }

    async fn delete_story(&self, story_id: &str) -> Result<()> {
        self.check_fail("delete_story").await?;
        self.tables.lock().await.stories.retain(|s| s.id != story_id);
        Ok(())
    }

    // =========================================================================
    // Conversations and messages
    // =========================================================================

    async fn find_conversation(
        &self,
        a: &ProfileId,
        b: &ProfileId,
    ) -> Result<Option<ConversationRecord>> {
        self.check_fail("find_conversation").await?;
        let tables = self.tables.lock().await;
        Ok(tables
            .conversations
            .iter()
            .find(|c| c.involves(a, b))
            .cloned())
    }

    async fn create_conversation(
        &self,
        a: &ProfileId,
        b: &ProfileId,
    ) -> Result<ConversationRecord> {
        self.check_fail("create_conversation").await?;
        let mut tables = self.tables.lock().await;
        // Uniqueness constraint on the unordered participant pair
        if tables.conversations.iter().any(|c| c.involves(a, b)) {
            return Err(EngineError::Conflict);
        }
        let record = ConversationRecord {
            id: EntityId::new().0,
            participants: [a.clone(), b.clone()],
        };
        tables.conversations.push(record.clone());
        Ok(record)
    }

    async fn insert_message(&self, message: NewMessage) -> Result<MessageRecord> {
        self.check_fail("insert_message").await?;
        let record = MessageRecord {
            id: EntityId::new().0,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            body: message.body,
            created_at: Utc::now(),
        };
        self.tables.lock().await.messages.push(record.clone());
        Ok(record)
    }

    async fn messages_involving(&self, profile_id: &ProfileId) -> Result<Vec<MessageRecord>> {
        self.check_fail("messages_involving").await?;
        let tables = self.tables.lock().await;
        let mut messages: Vec<MessageRecord> = tables
            .messages
            .iter()
            .filter(|m| m.sender_id == *profile_id || m.receiver_id == *profile_id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(messages)
    }
}
