//! Local cache slices
//!
//! The local cache is the engine's single shared resource. Each slice is
//! owned by one service and guarded on its own, so every multi-step
//! transition (a dislike-to-like swap, a transcript replacement) happens
//! under one write guard and no reader observes a half-applied state.
//!
//! Profile display metadata uses Moka with a TTL, the rest are plain
//! `RwLock` slices that get replaced or mutated atomically.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use tokio::sync::RwLock;

use crate::data::models::{
    AuthId, FeedEntry, FollowEdge, ProfileId, ReactionState, Story, StoryGroup,
    TranscriptMessage, UserProfile,
};

// =============================================================================
// Feed
// =============================================================================

/// The merged feed, replaced wholesale on refresh
#[derive(Default)]
pub struct FeedCache {
    entries: RwLock<Vec<FeedEntry>>,
}

impl FeedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entire feed (refresh is not incremental)
    pub async fn replace_all(&self, entries: Vec<FeedEntry>) {
        let mut guard = self.entries.write().await;
        *guard = entries;

        use crate::metrics::FEED_ITEMS;
        FEED_ITEMS.set(guard.len() as i64);
    }

    /// Optimistically prepend a just-published item
    pub async fn prepend(&self, entry: FeedEntry) {
        self.entries.write().await.insert(0, entry);
    }

    /// Remove an item after a local delete
    pub async fn remove(&self, content_id: &str) {
        self.entries.write().await.retain(|e| e.content.id != content_id);
    }

    /// Apply a caption edit locally
    pub async fn set_caption(&self, content_id: &str, caption: &str) {
        let mut guard = self.entries.write().await;
        if let Some(entry) = guard.iter_mut().find(|e| e.content.id == content_id) {
            entry.content.caption = caption.to_string();
        }
    }

    /// Apply sponsor attribution locally; the uploader stays the owner.
    pub async fn set_sponsor(&self, content_id: &str, sponsor_name: &str) {
        let mut guard = self.entries.write().await;
        if let Some(entry) = guard.iter_mut().find(|e| e.content.id == content_id) {
            entry.content.sponsor_name = Some(sponsor_name.to_string());
            entry.attribution.display_name = sponsor_name.to_string();
            entry.attribution.sponsored = true;
        }
    }

    pub async fn snapshot(&self) -> Vec<FeedEntry> {
        self.entries.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

// =============================================================================
// Reactions
// =============================================================================

/// Per-item reaction membership and counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReactionEntry {
    pub state: ReactionState,
    pub like_count: i64,
    pub dislike_count: i64,
}

/// Reaction state per content item, keyed by content id.
///
/// Multi-step transitions run under one write guard so liked and
/// disliked are never both visible, not even mid-swap.
#[derive(Default)]
pub struct ReactionLedger {
    entries: RwLock<HashMap<String, ReactionEntry>>,
}

impl ReactionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the ledger from a feed refresh (authoritative counts)
    pub async fn replace_all(&self, entries: HashMap<String, ReactionEntry>) {
        let mut guard = self.entries.write().await;
        *guard = entries;

        use crate::metrics::CACHE_SIZE;
        CACHE_SIZE
            .with_label_values(&["reactions"])
            .set(guard.len() as i64);
    }

    /// Current entry for an item (zeroed default if unseen)
    pub async fn get(&self, content_id: &str) -> ReactionEntry {
        self.entries
            .read()
            .await
            .get(content_id)
            .copied()
            .unwrap_or_default()
    }

    /// Apply one atomic transition and return the state it left behind
    pub async fn apply<F>(&self, content_id: &str, transition: F) -> ReactionEntry
    where
        F: FnOnce(&mut ReactionEntry),
    {
        let mut guard = self.entries.write().await;
        let entry = guard.entry(content_id.to_string()).or_default();
        transition(entry);
        *entry
    }

    /// Overwrite one item with an authoritative remote read
    pub async fn overwrite(&self, content_id: &str, entry: ReactionEntry) {
        self.entries
            .write()
            .await
            .insert(content_id.to_string(), entry);
    }

    /// Drop an item after a content delete
    pub async fn remove(&self, content_id: &str) {
        self.entries.write().await.remove(content_id);
    }
}

// =============================================================================
// Social graph
// =============================================================================

#[derive(Default)]
struct GraphState {
    /// Who X follows
    forward: HashMap<ProfileId, HashSet<ProfileId>>,
    /// Who follows X
    reverse: HashMap<ProfileId, HashSet<ProfileId>>,
}

impl GraphState {
    fn insert(&mut self, edge: &FollowEdge) -> bool {
        let inserted = self
            .forward
            .entry(edge.follower_id.clone())
            .or_default()
            .insert(edge.following_id.clone());
        self.reverse
            .entry(edge.following_id.clone())
            .or_default()
            .insert(edge.follower_id.clone());
        inserted
    }

    fn remove(&mut self, edge: &FollowEdge) {
        if let Some(set) = self.forward.get_mut(&edge.follower_id) {
            set.remove(&edge.following_id);
        }
        if let Some(set) = self.reverse.get_mut(&edge.following_id) {
            set.remove(&edge.follower_id);
        }
    }
}

/// Follow edges, held as forward and reverse views derived from the
/// same flat edge list and rebuilt together on every graph refresh.
#[derive(Default)]
pub struct GraphCache {
    state: RwLock<GraphState>,
}

impl GraphCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild all views from a full edge fetch
    pub async fn rebuild(&self, edges: Vec<FollowEdge>) {
        let mut state = GraphState::default();
        let edge_count = edges.len();
        for edge in &edges {
            state.insert(edge);
        }
        *self.state.write().await = state;

        use crate::metrics::CACHE_SIZE;
        CACHE_SIZE
            .with_label_values(&["graph"])
            .set(edge_count as i64);
    }

    /// Flip one edge; both views move together. Returns whether the
    /// follower now follows the target.
    pub async fn toggle(&self, edge: &FollowEdge) -> bool {
        let mut guard = self.state.write().await;
        if guard
            .forward
            .get(&edge.follower_id)
            .is_some_and(|set| set.contains(&edge.following_id))
        {
            guard.remove(edge);
            false
        } else {
            guard.insert(edge);
            true
        }
    }

    pub async fn is_following(&self, follower: &ProfileId, target: &ProfileId) -> bool {
        self.state
            .read()
            .await
            .forward
            .get(follower)
            .is_some_and(|set| set.contains(target))
    }

    /// Who `profile` follows
    pub async fn following_of(&self, profile: &ProfileId) -> Vec<ProfileId> {
        self.state
            .read()
            .await
            .forward
            .get(profile)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Who follows `profile`
    pub async fn followers_of(&self, profile: &ProfileId) -> Vec<ProfileId> {
        self.state
            .read()
            .await
            .reverse
            .get(profile)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn follower_count(&self, profile: &ProfileId) -> usize {
        self.state
            .read()
            .await
            .reverse
            .get(profile)
            .map_or(0, HashSet::len)
    }
}

// =============================================================================
// Stories
// =============================================================================

/// Active story groups, replaced on every story refresh
#[derive(Default)]
pub struct StoryCache {
    groups: RwLock<Vec<StoryGroup>>,
}

impl StoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn replace_all(&self, groups: Vec<StoryGroup>) {
        let mut guard = self.groups.write().await;
        *guard = groups;

        use crate::metrics::CACHE_SIZE;
        CACHE_SIZE
            .with_label_values(&["stories"])
            .set(guard.iter().map(|g| g.stories.len()).sum::<usize>() as i64);
    }

    /// Optimistically add a just-posted story to the owner's pinned
    /// group, creating it at the front if absent.
    pub async fn add_own(&self, author: UserProfile, story: Story) {
        let mut guard = self.groups.write().await;
        match guard
            .first_mut()
            .filter(|g| g.author.profile_id == author.profile_id)
        {
            Some(own) => own.stories.push(story),
            None => guard.insert(
                0,
                StoryGroup {
                    author,
                    stories: vec![story],
                },
            ),
        }
    }

    /// Remove a story after an explicit delete; empty groups disappear.
    pub async fn remove(&self, story_id: &str) {
        let mut guard = self.groups.write().await;
        for group in guard.iter_mut() {
            group.stories.retain(|s| s.id != story_id);
        }
        guard.retain(|g| !g.stories.is_empty());
    }

    pub async fn snapshot(&self) -> Vec<StoryGroup> {
        self.groups.read().await.clone()
    }
}

// =============================================================================
// Transcripts
// =============================================================================

/// Message transcripts grouped by counterpart authId.
///
/// Optimistic echoes live here without a server id until the send
/// resolves; a poll replaces each transcript wholesale but carries
/// unmatched pending echoes over so an in-flight send stays visible.
#[derive(Default)]
pub struct Transcripts {
    by_counterpart: RwLock<HashMap<AuthId, Vec<TranscriptMessage>>>,
}

impl Transcripts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an optimistic echo for a counterpart
    pub async fn echo(&self, counterpart: &AuthId, message: TranscriptMessage) {
        self.by_counterpart
            .write()
            .await
            .entry(counterpart.clone())
            .or_default()
            .push(message);
    }

    /// Replace the pending echo matching `record`'s sender and body with
    /// the confirmed server row. A no-op when a poll already replaced it.
    pub async fn confirm(
        &self,
        counterpart: &AuthId,
        sender_id: &ProfileId,
        body: &str,
        confirmed: TranscriptMessage,
    ) {
        let mut guard = self.by_counterpart.write().await;
        if let Some(transcript) = guard.get_mut(counterpart) {
            if let Some(echo) = transcript
                .iter_mut()
                .find(|m| m.pending && m.sender_id == *sender_id && m.body == body)
            {
                *echo = confirmed;
            }
        }
    }

    /// Retract exactly one pending echo after a failed send, matched by
    /// sender + body + a recent timestamp window (no server id exists).
    /// Returns whether an echo was removed.
    pub async fn retract(
        &self,
        counterpart: &AuthId,
        sender_id: &ProfileId,
        body: &str,
        now: DateTime<Utc>,
        window: chrono::Duration,
    ) -> bool {
        let mut guard = self.by_counterpart.write().await;
        let Some(transcript) = guard.get_mut(counterpart) else {
            return false;
        };
        // Newest matching echo first, to never retract an older message
        // that happens to share the body.
        let target = transcript
            .iter()
            .rposition(|m| {
                m.pending
                    && m.sender_id == *sender_id
                    && m.body == body
                    && now.signed_duration_since(m.created_at) <= window
            });
        match target {
            Some(index) => {
                transcript.remove(index);
                true
            }
            None => false,
        }
    }

    /// Replace every transcript with an authoritative read, carrying
    /// over pending echoes no remote row matched.
    pub async fn replace_all(&self, mut fresh: HashMap<AuthId, Vec<TranscriptMessage>>) {
        let mut guard = self.by_counterpart.write().await;
        for (counterpart, transcript) in guard.iter() {
            let carried: Vec<TranscriptMessage> = transcript
                .iter()
                .filter(|m| m.pending)
                .filter(|m| {
                    !fresh
                        .get(counterpart)
                        .is_some_and(|new| {
                            new.iter()
                                .any(|n| n.sender_id == m.sender_id && n.body == m.body)
                        })
                })
                .cloned()
                .collect();
            if !carried.is_empty() {
                let merged = fresh.entry(counterpart.clone()).or_default();
                merged.extend(carried);
                merged.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            }
        }
        *guard = fresh;

        use crate::metrics::CACHE_SIZE;
        CACHE_SIZE
            .with_label_values(&["transcripts"])
            .set(guard.values().map(Vec::len).sum::<usize>() as i64);
    }

    pub async fn for_counterpart(&self, counterpart: &AuthId) -> Vec<TranscriptMessage> {
        self.by_counterpart
            .read()
            .await
            .get(counterpart)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn counterparts(&self) -> Vec<AuthId> {
        self.by_counterpart.read().await.keys().cloned().collect()
    }
}

// =============================================================================
// User directory
// =============================================================================

#[derive(Default)]
struct DirectoryState {
    by_profile: HashMap<ProfileId, UserProfile>,
    by_auth: HashMap<AuthId, ProfileId>,
}

/// The profileId <-> authId mapping plus display metadata for every
/// known identity. All slices key off the same mapping, so it lives in
/// exactly one place and only `IdentityService` writes it.
#[derive(Default)]
pub struct UserDirectory {
    state: RwLock<DirectoryState>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the directory from a full profile fetch. Placeholder
    /// identities are dropped here; a counterpart still unknown remotely
    /// gets re-synthesized on the next message pull.
    pub async fn replace_all(&self, users: Vec<UserProfile>) {
        let mut state = DirectoryState::default();
        for user in users {
            state.by_auth.insert(user.auth_id.clone(), user.profile_id.clone());
            state.by_profile.insert(user.profile_id.clone(), user);
        }
        let mut guard = self.state.write().await;
        *guard = state;

        use crate::metrics::CACHE_SIZE;
        CACHE_SIZE
            .with_label_values(&["directory"])
            .set(guard.by_profile.len() as i64);
    }

    /// Insert or update one identity
    pub async fn upsert(&self, user: UserProfile) {
        let mut guard = self.state.write().await;
        guard
            .by_auth
            .insert(user.auth_id.clone(), user.profile_id.clone());
        guard.by_profile.insert(user.profile_id.clone(), user);
    }

    pub async fn by_auth(&self, auth_id: &AuthId) -> Option<UserProfile> {
        let guard = self.state.read().await;
        guard
            .by_auth
            .get(auth_id)
            .and_then(|pid| guard.by_profile.get(pid))
            .cloned()
    }

    pub async fn by_profile(&self, profile_id: &ProfileId) -> Option<UserProfile> {
        self.state.read().await.by_profile.get(profile_id).cloned()
    }

    pub async fn known_auth_ids(&self) -> Vec<AuthId> {
        self.state.read().await.by_auth.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.by_profile.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.by_profile.is_empty()
    }
}

// =============================================================================
// Profile cache
// =============================================================================

/// TTL cache for profile display metadata.
///
/// Lets a feed refresh batch-fetch only the author ids it has not seen
/// recently. Entries expire so renames and avatar changes surface
/// within one TTL.
pub struct ProfileCache {
    profiles: Cache<ProfileId, Arc<UserProfile>>,
}

impl ProfileCache {
    /// Create a profile cache with the given TTL
    pub fn new(ttl: Duration) -> Self {
        let profiles = Cache::builder().time_to_live(ttl).build();
        Self { profiles }
    }

    /// Get profile by id
    pub async fn get(&self, profile_id: &ProfileId) -> Option<Arc<UserProfile>> {
        let result = self.profiles.get(profile_id).await;

        use crate::metrics::{CACHE_HITS_TOTAL, CACHE_MISSES_TOTAL};
        if result.is_some() {
            CACHE_HITS_TOTAL.with_label_values(&["profile"]).inc();
        } else {
            CACHE_MISSES_TOTAL.with_label_values(&["profile"]).inc();
        }

        result
    }

    /// Insert or update a profile
    pub async fn insert(&self, profile: UserProfile) {
        let id = profile.profile_id.clone();
        self.profiles.insert(id, Arc::new(profile)).await;

        use crate::metrics::CACHE_SIZE;
        CACHE_SIZE
            .with_label_values(&["profile"])
            .set(self.profiles.entry_count() as i64);
    }

    /// Find a cached profile by username.
    ///
    /// Note: linear scan, acceptable at client-cache sizes. Sponsor
    /// attribution is the only caller.
    pub async fn find_by_username(&self, username: &str) -> Option<Arc<UserProfile>> {
        for (_, profile) in self.profiles.iter() {
            if profile.username == username {
                return Some(profile);
            }
        }
        None
    }
}
