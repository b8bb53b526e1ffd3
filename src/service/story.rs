//! Ephemeral story service
//!
//! Stories live for 24 hours from creation. Refresh asks the remote
//! service for the window server-side and still drops anything stale
//! client-side (lazy expiry, no background reaper). Groups are per
//! author, current user's group pinned first, and a `StoryPlayer`
//! drives the per-item playback sequence.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use crate::config::StoryConfig;
use crate::data::{MediaKind, MediaRef, ProfileId, Story, StoryCache, StoryGroup};
use crate::error::{EngineError, Result};
use crate::remote::{NewStory, RemoteDataService, StoryRecord};
use crate::service::IdentityService;
use crate::storage::MediaStore;

/// Visibility window for ephemeral content
const STORY_WINDOW_HOURS: i64 = 24;

/// Story windowing, grouping, authoring, and playback
pub struct StoryService {
    remote: Arc<dyn RemoteDataService>,
    media_store: Arc<dyn MediaStore>,
    identity: Arc<IdentityService>,
    stories: Arc<StoryCache>,
    config: StoryConfig,
}

impl StoryService {
    pub fn new(
        remote: Arc<dyn RemoteDataService>,
        media_store: Arc<dyn MediaStore>,
        identity: Arc<IdentityService>,
        stories: Arc<StoryCache>,
        config: StoryConfig,
    ) -> Self {
        Self {
            remote,
            media_store,
            identity,
            stories,
            config,
        }
    }

    // =========================================================================
    // Windowing and grouping
    // =========================================================================

    /// Rebuild the active story groups.
    ///
    /// The 24-hour window is applied server-side via the fetch cutoff
    /// and re-checked here so an expired story never survives a refresh.
    /// The current user's group is pinned first; other groups order by
    /// their newest story; within a group stories play oldest first.
    pub async fn refresh_stories(&self) -> Result<Vec<StoryGroup>> {
        use crate::metrics::{STORIES_EXPIRED_TOTAL, SYNC_CYCLES_TOTAL};

        let me = self.identity.ensure_session().await?;
        let now = Utc::now();
        let cutoff = now - chrono::Duration::hours(STORY_WINDOW_HOURS);

        let records = match self.remote.fetch_stories_since(cutoff).await {
            Ok(records) => records,
            Err(e) => {
                SYNC_CYCLES_TOTAL
                    .with_label_values(&["stories", "error"])
                    .inc();
                return Err(e);
            }
        };

        let mut active: Vec<Story> = Vec::with_capacity(records.len());
        let mut expired: u64 = 0;
        for record in records {
            let story = story_from_record(record);
            if story.is_active(now) {
                active.push(story);
            } else {
                expired += 1;
            }
        }
        if expired > 0 {
            STORIES_EXPIRED_TOTAL.inc_by(expired);
        }

        let mut author_ids: Vec<ProfileId> = Vec::new();
        for story in &active {
            if !author_ids.contains(&story.author_id) {
                author_ids.push(story.author_id.clone());
            }
        }
        let authors = self.identity.resolve_profiles(&author_ids).await?;

        let mut groups: Vec<StoryGroup> = Vec::new();
        for story in active {
            match groups
                .iter_mut()
                .find(|g| g.author.profile_id == story.author_id)
            {
                Some(group) => group.stories.push(story),
                None => {
                    let author = authors
                        .get(&story.author_id)
                        .cloned()
                        .unwrap_or_else(|| placeholder_author(&story.author_id));
                    groups.push(StoryGroup {
                        author,
                        stories: vec![story],
                    });
                }
            }
        }

        for group in &mut groups {
            group.stories.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        }

        // Most recent authors first, own group pinned ahead of all.
        groups.sort_by(|a, b| b.latest_at().cmp(&a.latest_at()));
        if let Some(own) = groups
            .iter()
            .position(|g| g.author.profile_id == me.profile_id)
        {
            let own_group = groups.remove(own);
            groups.insert(0, own_group);
        }

        self.stories.replace_all(groups.clone()).await;
        SYNC_CYCLES_TOTAL.with_label_values(&["stories", "ok"]).inc();
        tracing::debug!(groups = groups.len(), "Stories refreshed");
        Ok(groups)
    }

    /// The active groups without a remote round trip
    pub async fn groups(&self) -> Vec<StoryGroup> {
        self.stories.snapshot().await
    }

    // =========================================================================
    // Authoring
    // =========================================================================

    /// Upload one media file and publish it as a story, inserting it
    /// into the own pinned group optimistically.
    pub async fn post_story(
        &self,
        data: Vec<u8>,
        content_type: &str,
        kind: MediaKind,
    ) -> Result<Story> {
        let me = self.identity.ensure_session().await?;
        let url = self.media_store.upload(data, content_type, kind).await?;

        let record = self
            .remote
            .create_story(NewStory {
                author_id: me.profile_id.clone(),
                media_url: url,
                is_video: kind.is_video(),
            })
            .await?;

        let story = story_from_record(record);
        self.stories.add_own(me, story.clone()).await;
        tracing::info!(story_id = %story.id, "Story posted");
        Ok(story)
    }

    /// Delete own story from the backing store and the active set
    pub async fn delete_story(&self, story_id: &str) -> Result<()> {
        let me = self.identity.current_profile().await?;
        let owns = self
            .stories
            .snapshot()
            .await
            .iter()
            .flat_map(|g| g.stories.iter())
            .find(|s| s.id == story_id)
            .map(|s| s.author_id == me.profile_id)
            .ok_or(EngineError::NotFound)?;
        if !owns {
            return Err(EngineError::Forbidden);
        }

        self.remote.delete_story(story_id).await?;
        self.stories.remove(story_id).await;
        tracing::info!(story_id, "Story deleted");
        Ok(())
    }

    // =========================================================================
    // Playback
    // =========================================================================

    /// Build a player for one story sequence using the configured
    /// image duration and tick.
    pub fn player(&self, stories: Vec<Story>) -> StoryPlayer {
        StoryPlayer::new(stories, self.config.image_duration(), self.config.tick())
    }

    /// Spawn the timed playback driver for a sequence. Dropping the
    /// returned handle cancels the timer, so switching away from the
    /// viewer cannot leak ticks against a torn-down view.
    pub fn spawn_playback(&self, stories: Vec<Story>) -> PlaybackHandle {
        let state = self.player(stories);
        let initial = state.status();
        let player = Arc::new(Mutex::new(state));
        let (tx, rx) = watch::channel(initial);
        let tx = Arc::new(tx);
        let tick = self.config.tick();

        let task_player = Arc::clone(&player);
        let task_tx = Arc::clone(&tx);
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.tick().await; // consume the immediate first tick
            loop {
                interval.tick().await;
                let status = task_player.lock().await.tick();
                let _ = task_tx.send(status);
                if status == PlaybackStatus::Finished {
                    break;
                }
            }
        });

        PlaybackHandle {
            player,
            status_rx: rx,
            tx,
            task,
        }
    }

    /// Delete the story currently shown by `handle` from the sequence
    /// and the backing store; a tail deletion terminates the sequence.
    pub async fn delete_current(&self, handle: &PlaybackHandle) -> Result<()> {
        let story = {
            let player = handle.player.lock().await;
            player.current().cloned().ok_or(EngineError::NotFound)?
        };
        // Remote first: a failed delete leaves the sequence untouched.
        self.delete_story(&story.id).await?;

        let mut player = handle.player.lock().await;
        player.remove_current();
        let _ = handle.tx.send(player.status());
        Ok(())
    }
}

fn story_from_record(record: StoryRecord) -> Story {
    let expires_at = record.created_at + chrono::Duration::hours(STORY_WINDOW_HOURS);
    Story {
        id: record.id,
        author_id: record.author_id,
        media: MediaRef {
            url: record.media_url,
            is_video: record.is_video,
        },
        created_at: record.created_at,
        expires_at,
    }
}

fn placeholder_author(profile_id: &ProfileId) -> crate::data::UserProfile {
    crate::data::UserProfile {
        auth_id: crate::data::AuthId(format!("pending:{}", profile_id.0)),
        profile_id: profile_id.clone(),
        username: profile_id.0.clone(),
        display_name: None,
        avatar_url: None,
        is_sponsor: false,
        placeholder: true,
    }
}

// =============================================================================
// Playback state machine
// =============================================================================

/// Where a playback sequence currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    Playing { index: usize, progress: u8 },
    Finished,
}

/// The per-sequence playback state machine.
///
/// Progress runs 0..100 on a fixed tick. Images play for one constant
/// duration; a video switches to its natural duration once the media
/// layer reports it (the image duration applies until then). Reaching
/// 100 advances to the next story or terminates the sequence; it never
/// wraps.
pub struct StoryPlayer {
    stories: Vec<Story>,
    index: usize,
    elapsed_ticks: u64,
    image_ticks: u64,
    tick_millis: u64,
    video_ticks: Vec<Option<u64>>,
    finished: bool,
}

impl StoryPlayer {
    pub fn new(stories: Vec<Story>, image_duration: Duration, tick: Duration) -> Self {
        let tick_millis = tick.as_millis().max(1) as u64;
        let image_ticks = (image_duration.as_millis() as u64 / tick_millis).max(1);
        let finished = stories.is_empty();
        let video_ticks = vec![None; stories.len()];
        Self {
            stories,
            index: 0,
            elapsed_ticks: 0,
            image_ticks,
            tick_millis,
            video_ticks,
            finished,
        }
    }

    fn total_ticks(&self) -> u64 {
        let story_is_video = self
            .stories
            .get(self.index)
            .map(|s| s.media.is_video)
            .unwrap_or(false);
        if story_is_video {
            if let Some(Some(ticks)) = self.video_ticks.get(self.index) {
                return *ticks;
            }
        }
        self.image_ticks
    }

    fn progress(&self) -> u8 {
        let total = self.total_ticks();
        ((self.elapsed_ticks * 100 / total).min(100)) as u8
    }

    pub fn status(&self) -> PlaybackStatus {
        if self.finished {
            PlaybackStatus::Finished
        } else {
            PlaybackStatus::Playing {
                index: self.index,
                progress: self.progress(),
            }
        }
    }

    /// The story currently on screen
    pub fn current(&self) -> Option<&Story> {
        if self.finished {
            None
        } else {
            self.stories.get(self.index)
        }
    }

    /// Report a video's natural duration for the current story
    pub fn set_video_duration(&mut self, duration: Duration) {
        if self.finished {
            return;
        }
        if let Some(slot) = self.video_ticks.get_mut(self.index) {
            *slot = Some((duration.as_millis() as u64 / self.tick_millis).max(1));
        }
    }

    /// Advance progress by one fixed tick
    pub fn tick(&mut self) -> PlaybackStatus {
        if self.finished {
            return PlaybackStatus::Finished;
        }
        self.elapsed_ticks += 1;
        if self.elapsed_ticks >= self.total_ticks() {
            return self.advance();
        }
        self.status()
    }

    /// Manual forward navigation; resets progress for the target
    pub fn next(&mut self) -> PlaybackStatus {
        self.advance()
    }

    /// Manual backward navigation; resets progress for the target.
    /// At the first story this restarts it.
    pub fn previous(&mut self) -> PlaybackStatus {
        if self.finished {
            return PlaybackStatus::Finished;
        }
        self.index = self.index.saturating_sub(1);
        self.elapsed_ticks = 0;
        self.status()
    }

    fn advance(&mut self) -> PlaybackStatus {
        if self.finished {
            return PlaybackStatus::Finished;
        }
        if self.index + 1 < self.stories.len() {
            self.index += 1;
            self.elapsed_ticks = 0;
        } else {
            // Last story done: terminate, never wrap.
            self.finished = true;
        }
        self.status()
    }

    /// Remove the story on screen from the sequence. The next story
    /// takes its place; removing the tail terminates the sequence.
    pub fn remove_current(&mut self) -> Option<Story> {
        if self.finished || self.stories.is_empty() {
            return None;
        }
        let removed = self.stories.remove(self.index);
        self.video_ticks.remove(self.index);
        self.elapsed_ticks = 0;
        if self.index >= self.stories.len() {
            self.finished = true;
        }
        Some(removed)
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

// =============================================================================
// Playback driver
// =============================================================================

/// Handle over a running playback timer.
///
/// Dropping the handle aborts the driver task.
pub struct PlaybackHandle {
    player: Arc<Mutex<StoryPlayer>>,
    status_rx: watch::Receiver<PlaybackStatus>,
    tx: Arc<watch::Sender<PlaybackStatus>>,
    task: JoinHandle<()>,
}

impl PlaybackHandle {
    /// Latest published status
    pub fn status(&self) -> PlaybackStatus {
        *self.status_rx.borrow()
    }

    /// Watch the status stream (for view bindings)
    pub fn subscribe(&self) -> watch::Receiver<PlaybackStatus> {
        self.status_rx.clone()
    }

    /// Tap-forward: advance immediately with progress reset
    pub async fn next(&self) -> PlaybackStatus {
        let status = self.player.lock().await.next();
        let _ = self.tx.send(status);
        status
    }

    /// Tap-back: go to the previous story with progress reset
    pub async fn previous(&self) -> PlaybackStatus {
        let status = self.player.lock().await.previous();
        let _ = self.tx.send(status);
        status
    }

    /// Report the current video's natural duration
    pub async fn set_video_duration(&self, duration: Duration) {
        self.player.lock().await.set_video_duration(duration);
    }

    /// The story currently on screen
    pub async fn current(&self) -> Option<Story> {
        self.player.lock().await.current().cloned()
    }
}

impl Drop for PlaybackHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
