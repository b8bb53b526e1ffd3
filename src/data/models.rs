//! Data models
//!
//! Rust structs representing the engine's local view of remote entities.
//! All models use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// Create from existing string
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identity-provider key for a person.
///
/// Issued by the external identity provider. UI-level identity
/// comparisons (transcript grouping, "is this me" checks) use this key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthId(pub String);

impl std::fmt::Display for AuthId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Content-service key for the same person.
///
/// Every content, graph, and message record keys off this. The two keys
/// are 1:1 and created together; only `IdentityService` maps between
/// them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(pub String);

impl std::fmt::Display for ProfileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Media
// =============================================================================

/// Canonical media reference produced by normalization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub url: String,
    pub is_video: bool,
}

/// Declared kind for a media upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self, Self::Video)
    }
}

// =============================================================================
// Content
// =============================================================================

/// Content kind within the merged feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Post,
    Reel,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Reel => "reel",
        }
    }
}

/// A feed content item (post or reel)
///
/// Immutable once fetched except for `caption` (editable by the author)
/// and `sponsor_name` (settable by the sponsor role). An empty `media`
/// list means normalization rejected the references and the item
/// renders as a placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    pub id: String,
    pub kind: ContentKind,
    /// True uploader; ownership checks (edit/delete) use this even when
    /// the entry displays sponsor attribution.
    pub author_id: ProfileId,
    pub media: Vec<MediaRef>,
    pub caption: String,
    pub sponsor_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Display attribution for one feed entry
///
/// Sponsored entries carry the sponsor's name and avatar here while
/// `ContentItem::author_id` stays the uploader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribution {
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub sponsored: bool,
}

/// A render-ready feed entry: content plus resolved attribution
#[derive(Debug, Clone)]
pub struct FeedEntry {
    pub content: ContentItem,
    pub attribution: Attribution,
    pub like_count: i64,
    pub dislike_count: i64,
}

// =============================================================================
// Reactions
// =============================================================================

/// The current user's reaction to one content item.
///
/// Exactly one of these holds at any time; liked and disliked are
/// mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReactionState {
    #[default]
    None,
    Liked,
    Disliked,
}

/// Reaction row kind on the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReactionKind {
    Like,
    Dislike,
}

impl ReactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Dislike => "dislike",
        }
    }
}

// =============================================================================
// Social graph
// =============================================================================

/// One directed follow edge, unique per ordered pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FollowEdge {
    pub follower_id: ProfileId,
    pub following_id: ProfileId,
}

// =============================================================================
// Stories
// =============================================================================

/// Ephemeral content with a fixed 24-hour visibility window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Story {
    pub id: String,
    pub author_id: ProfileId,
    pub media: MediaRef,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Story {
    /// Whether the story is still inside its visibility window
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Stories of one author, in playback order (oldest first)
#[derive(Debug, Clone)]
pub struct StoryGroup {
    pub author: UserProfile,
    pub stories: Vec<Story>,
}

impl StoryGroup {
    /// Timestamp of the newest story in the group
    pub fn latest_at(&self) -> Option<DateTime<Utc>> {
        self.stories.iter().map(|s| s.created_at).max()
    }
}

// =============================================================================
// Messaging
// =============================================================================

/// A message as shown in a local transcript.
///
/// `id` is absent while an optimistic echo awaits remote confirmation;
/// retraction after a failed send matches on sender + body + a recent
/// timestamp window because no server id exists yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptMessage {
    pub id: Option<String>,
    pub conversation_id: Option<String>,
    pub sender_id: ProfileId,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub pending: bool,
}

// =============================================================================
// Identity
// =============================================================================

/// A person as known to the engine: both keys plus display metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub auth_id: AuthId,
    pub profile_id: ProfileId,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    /// Sponsor role may attach sponsor attribution to content
    pub is_sponsor: bool,
    /// True for identities synthesized before their profile was fetched
    pub placeholder: bool,
}

impl UserProfile {
    /// Name to show in transcripts and story rings
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}
