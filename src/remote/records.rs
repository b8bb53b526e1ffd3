//! Remote record shapes
//!
//! Rows as the remote data service returns them, before the engine
//! normalizes them into local models. These shapes are the contract any
//! backend implementation must satisfy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::{AuthId, ContentKind, MediaField, ProfileId};

// =============================================================================
// Profiles
// =============================================================================

/// A profile row on the content service.
///
/// `auth_id` links back to the identity provider; the two ids are 1:1
/// and created together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub profile_id: ProfileId,
    pub auth_id: AuthId,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub email: Option<String>,
    /// Sponsor role may attach sponsor attribution to content
    pub is_sponsor: bool,
    pub created_at: DateTime<Utc>,
}

impl From<ProfileRecord> for crate::data::UserProfile {
    fn from(record: ProfileRecord) -> Self {
        Self {
            auth_id: record.auth_id,
            profile_id: record.profile_id,
            username: record.username,
            display_name: record.display_name,
            avatar_url: record.avatar_url,
            is_sponsor: record.is_sponsor,
            placeholder: false,
        }
    }
}

/// Payload for provisioning a profile on first login
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub auth_id: AuthId,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub email: Option<String>,
}

/// The session user as exposed by the identity provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub auth_id: AuthId,
    pub email: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

// =============================================================================
// Content
// =============================================================================

/// A content row (post or reel) as fetched.
///
/// `media` is the raw heterogeneous field; normalization happens
/// client-side. Reaction membership rides along so one feed fetch seeds
/// counts without per-item reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: String,
    pub kind: ContentKind,
    pub author_id: ProfileId,
    pub media: MediaField,
    /// Caller's flag that the media entries are video
    pub is_video: bool,
    pub caption: String,
    pub sponsor_name: Option<String>,
    pub liked_by: Vec<ProfileId>,
    pub disliked_by: Vec<ProfileId>,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating content after an upload completes
#[derive(Debug, Clone)]
pub struct NewContent {
    pub kind: ContentKind,
    pub author_id: ProfileId,
    pub media: MediaField,
    pub is_video: bool,
    pub caption: String,
}

/// Authoritative reaction membership for one content item
#[derive(Debug, Clone, Default)]
pub struct ReactionSnapshot {
    pub liked_by: Vec<ProfileId>,
    pub disliked_by: Vec<ProfileId>,
}

// =============================================================================
// Stories
// =============================================================================

/// A story row; visibility is windowed client- and server-side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryRecord {
    pub id: String,
    pub author_id: ProfileId,
    pub media_url: String,
    pub is_video: bool,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a story after an upload completes
#[derive(Debug, Clone)]
pub struct NewStory {
    pub author_id: ProfileId,
    pub media_url: String,
    pub is_video: bool,
}

// =============================================================================
// Conversations and messages
// =============================================================================

/// A two-party conversation; at most one exists per unordered pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: String,
    pub participants: [ProfileId; 2],
}

impl ConversationRecord {
    /// Membership test ignoring participant order
    pub fn involves(&self, a: &ProfileId, b: &ProfileId) -> bool {
        (self.participants[0] == *a && self.participants[1] == *b)
            || (self.participants[0] == *b && self.participants[1] == *a)
    }
}

/// A message row, appended immutably
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: ProfileId,
    pub receiver_id: ProfileId,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Payload for appending a message
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub conversation_id: String,
    pub sender_id: ProfileId,
    pub receiver_id: ProfileId,
    pub body: String,
}
