//! Messaging sync engine
//!
//! Sends with an immediate local echo and keeps transcripts eventually
//! consistent through fixed-interval pulls. The remote service has no
//! push channel, so a pull replaces each counterpart's transcript with
//! the authoritative read; a pull already in flight suppresses a new
//! one to avoid duplicate-processing races.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::config::MessagingConfig;
use crate::data::{AuthId, ProfileId, TranscriptMessage, Transcripts, UserProfile};
use crate::error::{EngineError, Result};
use crate::remote::{ConversationRecord, MessageRecord, NewMessage, RemoteDataService};
use crate::service::IdentityService;

/// Message sending and polling reconciliation
pub struct MessagingService {
    remote: Arc<dyn RemoteDataService>,
    identity: Arc<IdentityService>,
    transcripts: Arc<Transcripts>,
    config: MessagingConfig,
    /// Pull overlap guard; a pull in flight suppresses the next one
    pull_in_flight: AtomicBool,
    /// Monotonically increasing watermark of the last successful pull
    last_synced: RwLock<Option<DateTime<Utc>>>,
}

impl MessagingService {
    pub fn new(
        remote: Arc<dyn RemoteDataService>,
        identity: Arc<IdentityService>,
        transcripts: Arc<Transcripts>,
        config: MessagingConfig,
    ) -> Self {
        Self {
            remote,
            identity,
            transcripts,
            config,
            pull_in_flight: AtomicBool::new(false),
            last_synced: RwLock::new(None),
        }
    }

    // =========================================================================
    // Sending
    // =========================================================================

    /// Send a message to `receiver`.
    ///
    /// Resolves both profiles once, finds or creates the two-party
    /// conversation (lookup first, to keep at most one per pair), echoes
    /// the message locally, then appends it remotely. A failed append
    /// retracts exactly that echo.
    pub async fn send(&self, receiver: &AuthId, text: &str) -> Result<MessageRecord> {
        let body = text.trim();
        if body.is_empty() {
            return Err(EngineError::Validation("message text is required".to_string()));
        }

        let me = self.identity.ensure_session().await?;
        let them = self.identity.resolve_user(receiver).await?;

        let conversation = self
            .find_or_create_conversation(&me.profile_id, &them.profile_id)
            .await?;

        // Immediate local echo; the sender's view updates before the
        // round trip completes.
        let sent_at = Utc::now();
        self.transcripts
            .echo(
                &them.auth_id,
                TranscriptMessage {
                    id: None,
                    conversation_id: Some(conversation.id.clone()),
                    sender_id: me.profile_id.clone(),
                    body: body.to_string(),
                    created_at: sent_at,
                    pending: true,
                },
            )
            .await;

        let outcome = self
            .remote
            .insert_message(NewMessage {
                conversation_id: conversation.id.clone(),
                sender_id: me.profile_id.clone(),
                receiver_id: them.profile_id.clone(),
                body: body.to_string(),
            })
            .await;

        match outcome {
            Ok(record) => {
                self.transcripts
                    .confirm(
                        &them.auth_id,
                        &me.profile_id,
                        body,
                        transcript_message(&record),
                    )
                    .await;
                Ok(record)
            }
            Err(e) => {
                use crate::metrics::ECHOES_RETRACTED_TOTAL;
                let retracted = self
                    .transcripts
                    .retract(
                        &them.auth_id,
                        &me.profile_id,
                        body,
                        Utc::now(),
                        chrono::Duration::seconds(self.config.echo_retract_window_seconds),
                    )
                    .await;
                if retracted {
                    ECHOES_RETRACTED_TOTAL.inc();
                }
                tracing::warn!(receiver = %receiver, error = %e, "Send failed, echo retracted");
                Err(e)
            }
        }
    }

    /// Find the conversation for an unordered pair, creating it when
    /// absent. A create that loses the race to the counterpart's first
    /// message surfaces `Conflict` and resolves by looking up again.
    async fn find_or_create_conversation(
        &self,
        a: &ProfileId,
        b: &ProfileId,
    ) -> Result<ConversationRecord> {
        if let Some(existing) = self.remote.find_conversation(a, b).await? {
            return Ok(existing);
        }
        match self.remote.create_conversation(a, b).await {
            Ok(created) => Ok(created),
            Err(EngineError::Conflict) => self
                .remote
                .find_conversation(a, b)
                .await?
                .ok_or(EngineError::NotFound),
            Err(e) => Err(e),
        }
    }

    // =========================================================================
    // Polling
    // =========================================================================

    /// One reconciliation pass: fetch everything involving the current
    /// profile, group by counterpart, and replace the local transcripts
    /// (pending echoes carry over). Suppressed while a pull is already
    /// in flight.
    pub async fn pull(&self) -> Result<()> {
        use crate::metrics::{PULLS_SUPPRESSED_TOTAL, SYNC_CYCLES_TOTAL};

        if self.pull_in_flight.swap(true, Ordering::SeqCst) {
            PULLS_SUPPRESSED_TOTAL.inc();
            tracing::trace!("Pull suppressed, one already in flight");
            return Ok(());
        }

        let result = self.pull_inner().await;
        self.pull_in_flight.store(false, Ordering::SeqCst);

        match &result {
            Ok(()) => {
                SYNC_CYCLES_TOTAL.with_label_values(&["messages", "ok"]).inc();
            }
            Err(e) => {
                use crate::metrics::ERRORS_TOTAL;
                SYNC_CYCLES_TOTAL
                    .with_label_values(&["messages", "error"])
                    .inc();
                ERRORS_TOTAL.with_label_values(&[e.kind(), "messaging"]).inc();
                tracing::warn!(error = %e, "Message pull failed");
            }
        }
        result
    }

    async fn pull_inner(&self) -> Result<()> {
        let me = self.identity.ensure_session().await?;
        let messages = self.remote.messages_involving(&me.profile_id).await?;

        let mut counterpart_ids: Vec<ProfileId> = Vec::new();
        for message in &messages {
            let other = counterpart_of(message, &me.profile_id);
            if !counterpart_ids.contains(&other) {
                counterpart_ids.push(other);
            }
        }
        // Unknown counterparts come back as placeholder identities so
        // the transcript can render before a full profile fetch.
        let counterparts: HashMap<ProfileId, UserProfile> =
            self.identity.resolve_profiles(&counterpart_ids).await?;

        let mut fresh: HashMap<AuthId, Vec<TranscriptMessage>> = HashMap::new();
        for message in &messages {
            let other = counterpart_of(message, &me.profile_id);
            let Some(user) = counterparts.get(&other) else {
                continue;
            };
            fresh
                .entry(user.auth_id.clone())
                .or_default()
                .push(transcript_message(message));
        }

        self.transcripts.replace_all(fresh).await;

        // Watermark only moves forward.
        let now = Utc::now();
        let mut watermark = self.last_synced.write().await;
        if watermark.is_none_or(|prev| prev < now) {
            *watermark = Some(now);
        }
        Ok(())
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// Transcript with one counterpart, oldest first
    pub async fn transcript(&self, counterpart: &AuthId) -> Vec<TranscriptMessage> {
        self.transcripts.for_counterpart(counterpart).await
    }

    /// Everyone the current user has a transcript with
    pub async fn counterparts(&self) -> Vec<AuthId> {
        self.transcripts.counterparts().await
    }

    /// When the last successful pull completed
    pub async fn last_synced(&self) -> Option<DateTime<Utc>> {
        *self.last_synced.read().await
    }
}

fn counterpart_of(message: &MessageRecord, me: &ProfileId) -> ProfileId {
    if message.sender_id == *me {
        message.receiver_id.clone()
    } else {
        message.sender_id.clone()
    }
}

fn transcript_message(record: &MessageRecord) -> TranscriptMessage {
    TranscriptMessage {
        id: Some(record.id.clone()),
        conversation_id: Some(record.conversation_id.clone()),
        sender_id: record.sender_id.clone(),
        body: record.body.clone(),
        created_at: record.created_at,
        pending: false,
    }
}
