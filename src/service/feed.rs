//! Feed service
//!
//! Merges posts and reels into one render-ready feed and carries the
//! authoring operations (publish, caption edit, sponsor attribution,
//! delete).

use std::collections::HashMap;
use std::sync::Arc;

use crate::data::{
    self, Attribution, ContentItem, ContentKind, FeedCache, FeedEntry, MediaField, MediaKind,
    ProfileCache, ProfileId, ReactionEntry, ReactionLedger, ReactionState, UserProfile,
};
use crate::error::{EngineError, Result};
use crate::remote::{ContentRecord, NewContent, RemoteDataService};
use crate::service::IdentityService;
use crate::storage::MediaStore;

/// Feed aggregation and content authoring
pub struct FeedService {
    remote: Arc<dyn RemoteDataService>,
    media_store: Arc<dyn MediaStore>,
    identity: Arc<IdentityService>,
    feed: Arc<FeedCache>,
    reactions: Arc<ReactionLedger>,
    profiles: Arc<ProfileCache>,
}

impl FeedService {
    pub fn new(
        remote: Arc<dyn RemoteDataService>,
        media_store: Arc<dyn MediaStore>,
        identity: Arc<IdentityService>,
        feed: Arc<FeedCache>,
        reactions: Arc<ReactionLedger>,
        profiles: Arc<ProfileCache>,
    ) -> Self {
        Self {
            remote,
            media_store,
            identity,
            feed,
            reactions,
            profiles,
        }
    }

    // =========================================================================
    // Aggregation
    // =========================================================================

    /// Rebuild the entire feed from a fresh remote read.
    ///
    /// Posts and reels are fetched concurrently, author metadata for the
    /// distinct author set comes from one batched lookup, and the two
    /// collections merge by `created_at` descending. Equal timestamps
    /// keep posts ahead of reels: the sort is stable over a
    /// posts-then-reels concatenation, which is the documented
    /// deterministic tie-break for the second-level timestamps the
    /// source data carries.
    pub async fn refresh_feed(&self) -> Result<Vec<FeedEntry>> {
        use crate::metrics::SYNC_CYCLES_TOTAL;

        let me = self.identity.ensure_session().await?;

        let (posts, reels) = match futures::try_join!(
            self.remote.fetch_posts(),
            self.remote.fetch_reels()
        ) {
            Ok(fetched) => fetched,
            Err(e) => {
                SYNC_CYCLES_TOTAL.with_label_values(&["feed", "error"]).inc();
                return Err(e);
            }
        };

        let mut records: Vec<ContentRecord> = posts;
        records.extend(reels);

        let mut author_ids: Vec<ProfileId> = Vec::new();
        for record in &records {
            if !author_ids.contains(&record.author_id) {
                author_ids.push(record.author_id.clone());
            }
        }
        let authors = self.identity.resolve_profiles(&author_ids).await?;

        let mut entries: Vec<FeedEntry> = Vec::with_capacity(records.len());
        let mut ledger: HashMap<String, ReactionEntry> = HashMap::new();
        for record in records {
            // Membership lists seed the reaction ledger before the
            // record is consumed into a feed entry.
            let state = if record.liked_by.contains(&me.profile_id) {
                ReactionState::Liked
            } else if record.disliked_by.contains(&me.profile_id) {
                ReactionState::Disliked
            } else {
                ReactionState::None
            };
            ledger.insert(
                record.id.clone(),
                ReactionEntry {
                    state,
                    like_count: record.liked_by.len() as i64,
                    dislike_count: record.disliked_by.len() as i64,
                },
            );
            entries.push(self.build_entry(record, &authors).await);
        }

        // Stable: preserves posts-before-reels on created_at ties.
        entries.sort_by(|a, b| b.content.created_at.cmp(&a.content.created_at));

        self.reactions.replace_all(ledger).await;
        self.feed.replace_all(entries.clone()).await;

        SYNC_CYCLES_TOTAL.with_label_values(&["feed", "ok"]).inc();
        tracing::debug!(items = entries.len(), "Feed refreshed");
        Ok(entries)
    }

    async fn build_entry(
        &self,
        record: ContentRecord,
        authors: &HashMap<ProfileId, UserProfile>,
    ) -> FeedEntry {
        let media = data::normalize(
            &record.media,
            record.is_video || record.kind == ContentKind::Reel,
        );

        let attribution = match record.sponsor_name.as_deref() {
            // Sponsored entries display the sponsor; ownership stays
            // with the uploader.
            Some(sponsor) => Attribution {
                display_name: sponsor.to_string(),
                avatar_url: self
                    .profiles
                    .find_by_username(sponsor)
                    .await
                    .and_then(|p| p.avatar_url.clone()),
                sponsored: true,
            },
            None => match authors.get(&record.author_id) {
                Some(author) => Attribution {
                    display_name: author.label().to_string(),
                    avatar_url: author.avatar_url.clone(),
                    sponsored: false,
                },
                None => Attribution {
                    display_name: record.author_id.0.clone(),
                    avatar_url: None,
                    sponsored: false,
                },
            },
        };

        FeedEntry {
            like_count: record.liked_by.len() as i64,
            dislike_count: record.disliked_by.len() as i64,
            content: ContentItem {
                id: record.id,
                kind: record.kind,
                author_id: record.author_id,
                media,
                caption: record.caption,
                sponsor_name: record.sponsor_name,
                created_at: record.created_at,
            },
            attribution,
        }
    }

    /// The current merged feed without a remote round trip
    pub async fn feed(&self) -> Vec<FeedEntry> {
        self.feed.snapshot().await
    }

    // =========================================================================
    // Authoring
    // =========================================================================

    /// Upload media, create the item remotely, and prepend it to the
    /// local feed optimistically.
    pub async fn publish(
        &self,
        kind: ContentKind,
        uploads: Vec<(Vec<u8>, String)>,
        caption: String,
        media_kind: MediaKind,
    ) -> Result<FeedEntry> {
        let me = self.identity.ensure_session().await?;

        let caption = caption.trim().to_string();
        if caption.is_empty() && uploads.is_empty() {
            return Err(EngineError::Validation(
                "content caption or media is required".to_string(),
            ));
        }

        let mut urls = Vec::with_capacity(uploads.len());
        for (data, content_type) in uploads {
            urls.push(
                self.media_store
                    .upload(data, &content_type, media_kind)
                    .await?,
            );
        }

        let record = self
            .remote
            .create_content(NewContent {
                kind,
                author_id: me.profile_id.clone(),
                media: MediaField::Many(urls),
                is_video: media_kind.is_video(),
                caption,
            })
            .await?;

        let mut authors = HashMap::new();
        authors.insert(me.profile_id.clone(), me.clone());
        let entry = self.build_entry(record, &authors).await;
        self.feed.prepend(entry.clone()).await;

        tracing::info!(content_id = %entry.content.id, kind = kind.as_str(), "Content published");
        Ok(entry)
    }

    /// Delete own content locally and remotely.
    ///
    /// Ownership follows `author_id`, the true uploader, even for
    /// sponsored entries.
    pub async fn delete_content(&self, content_id: &str) -> Result<()> {
        let me = self.identity.current_profile().await?;
        let entry = self.entry_by_id(content_id).await.ok_or(EngineError::NotFound)?;
        if entry.content.author_id != me.profile_id {
            return Err(EngineError::Forbidden);
        }

        self.remote.delete_content(content_id).await?;
        self.feed.remove(content_id).await;
        self.reactions.remove(content_id).await;
        tracing::info!(content_id, "Content deleted");
        Ok(())
    }

    /// Edit the caption of own content
    pub async fn edit_caption(&self, content_id: &str, caption: &str) -> Result<()> {
        let me = self.identity.current_profile().await?;
        let entry = self.entry_by_id(content_id).await.ok_or(EngineError::NotFound)?;
        if entry.content.author_id != me.profile_id {
            return Err(EngineError::Forbidden);
        }

        self.remote.update_caption(content_id, caption).await?;
        self.feed.set_caption(content_id, caption).await;
        Ok(())
    }

    /// Attach sponsor attribution; requires the sponsor role.
    pub async fn set_sponsor(&self, content_id: &str, sponsor_name: &str) -> Result<()> {
        let me = self.identity.current_profile().await?;
        if !me.is_sponsor {
            return Err(EngineError::Forbidden);
        }
        self.entry_by_id(content_id).await.ok_or(EngineError::NotFound)?;

        self.remote.set_sponsor(content_id, sponsor_name).await?;
        self.feed.set_sponsor(content_id, sponsor_name).await;
        Ok(())
    }

    async fn entry_by_id(&self, content_id: &str) -> Option<FeedEntry> {
        self.feed
            .snapshot()
            .await
            .into_iter()
            .find(|e| e.content.id == content_id)
    }
}
