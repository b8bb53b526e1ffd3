//! Reaction service
//!
//! Like/dislike toggling per content item. Liked and disliked are
//! mutually exclusive; a swap applies locally as one atomic transition
//! and runs as remove-then-add against the remote service. After any
//! remote uncertainty the entry is rebuilt from an authoritative read
//! instead of guessing an inverse (reconciliation over invention).

use std::sync::Arc;

use crate::data::{ProfileId, ReactionEntry, ReactionKind, ReactionLedger, ReactionState};
use crate::error::{EngineError, Result};
use crate::remote::RemoteDataService;
use crate::service::IdentityService;

/// Like/dislike state and counts per content item
pub struct ReactionService {
    remote: Arc<dyn RemoteDataService>,
    identity: Arc<IdentityService>,
    ledger: Arc<ReactionLedger>,
}

impl ReactionService {
    pub fn new(
        remote: Arc<dyn RemoteDataService>,
        identity: Arc<IdentityService>,
        ledger: Arc<ReactionLedger>,
    ) -> Self {
        Self {
            remote,
            identity,
            ledger,
        }
    }

    /// Toggle the like membership for one item.
    ///
    /// From `Disliked` this is a swap: the dislike is removed remotely,
    /// then the like added; both must succeed before the state counts
    /// as settled.
    pub async fn toggle_like(&self, content_id: &str) -> Result<ReactionEntry> {
        self.toggle(content_id, ReactionKind::Like).await
    }

    /// Toggle the dislike membership for one item
    pub async fn toggle_dislike(&self, content_id: &str) -> Result<ReactionEntry> {
        self.toggle(content_id, ReactionKind::Dislike).await
    }

    async fn toggle(&self, content_id: &str, kind: ReactionKind) -> Result<ReactionEntry> {
        let me = self.identity.current_profile().await?;

        // Local optimistic transition, atomic under the ledger's write
        // guard so no reader sees a half-applied swap.
        let mut prior = ReactionState::None;
        let entry = self
            .ledger
            .apply(content_id, |e| {
                prior = e.state;
                *e = transition(*e, kind);
            })
            .await;

        let outcome = self
            .push_remote(&me.profile_id, content_id, prior, kind)
            .await;

        match outcome {
            Ok(()) => Ok(entry),
            Err(e) => {
                use crate::metrics::ERRORS_TOTAL;
                // The remote may have partially applied a swap; re-pull
                // the authoritative membership rather than reverting.
                tracing::warn!(content_id, error = %e, "Reaction toggle uncertain, reconciling");
                ERRORS_TOTAL.with_label_values(&[e.kind(), "reactions"]).inc();
                self.resync(content_id).await?;
                Err(e)
            }
        }
    }

    /// Mirror one local transition onto the remote service
    async fn push_remote(
        &self,
        me: &ProfileId,
        content_id: &str,
        prior: ReactionState,
        kind: ReactionKind,
    ) -> Result<()> {
        let opposite = match kind {
            ReactionKind::Like => ReactionKind::Dislike,
            ReactionKind::Dislike => ReactionKind::Like,
        };
        let had_same = matches!(
            (prior, kind),
            (ReactionState::Liked, ReactionKind::Like)
                | (ReactionState::Disliked, ReactionKind::Dislike)
        );
        let had_opposite = matches!(
            (prior, kind),
            (ReactionState::Disliked, ReactionKind::Like)
                | (ReactionState::Liked, ReactionKind::Dislike)
        );

        if had_same {
            return settle(self.remote.remove_reaction(me, content_id, kind).await);
        }
        if had_opposite {
            // Swap: remove the opposite row, then add the new one.
            settle(self.remote.remove_reaction(me, content_id, opposite).await)?;
            return settle(self.remote.add_reaction(me, content_id, kind).await);
        }
        settle(self.remote.add_reaction(me, content_id, kind).await)
    }

    /// Rebuild one item's entry from the authoritative remote read
    pub async fn resync(&self, content_id: &str) -> Result<ReactionEntry> {
        use crate::metrics::RECONCILIATIONS_TOTAL;

        let me = self.identity.current_profile().await?;
        let snapshot = self.remote.reactions_for(content_id).await?;

        let state = if snapshot.liked_by.contains(&me.profile_id) {
            ReactionState::Liked
        } else if snapshot.disliked_by.contains(&me.profile_id) {
            ReactionState::Disliked
        } else {
            ReactionState::None
        };
        let entry = ReactionEntry {
            state,
            like_count: snapshot.liked_by.len() as i64,
            dislike_count: snapshot.disliked_by.len() as i64,
        };

        self.ledger.overwrite(content_id, entry).await;
        RECONCILIATIONS_TOTAL.with_label_values(&["reactions"]).inc();
        Ok(entry)
    }

    /// Current entry for an item (zeroed default if unseen)
    pub async fn entry(&self, content_id: &str) -> ReactionEntry {
        self.ledger.get(content_id).await
    }
}

/// The pure state machine over {none, liked, disliked}.
///
/// Counts never go negative even if a stale seed undercounts.
fn transition(mut entry: ReactionEntry, kind: ReactionKind) -> ReactionEntry {
    match (entry.state, kind) {
        (ReactionState::None, ReactionKind::Like) => {
            entry.state = ReactionState::Liked;
            entry.like_count += 1;
        }
        (ReactionState::Liked, ReactionKind::Like) => {
            entry.state = ReactionState::None;
            entry.like_count = (entry.like_count - 1).max(0);
        }
        (ReactionState::Disliked, ReactionKind::Like) => {
            entry.state = ReactionState::Liked;
            entry.dislike_count = (entry.dislike_count - 1).max(0);
            entry.like_count += 1;
        }
        (ReactionState::None, ReactionKind::Dislike) => {
            entry.state = ReactionState::Disliked;
            entry.dislike_count += 1;
        }
        (ReactionState::Disliked, ReactionKind::Dislike) => {
            entry.state = ReactionState::None;
            entry.dislike_count = (entry.dislike_count - 1).max(0);
        }
        (ReactionState::Liked, ReactionKind::Dislike) => {
            entry.state = ReactionState::Disliked;
            entry.like_count = (entry.like_count - 1).max(0);
            entry.dislike_count += 1;
        }
    }
    entry
}

/// Conflict on an idempotent toggle is success, not an error
fn settle(result: Result<()>) -> Result<()> {
    match result {
        Err(EngineError::Conflict) => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(state: ReactionState, likes: i64, dislikes: i64) -> ReactionEntry {
        ReactionEntry {
            state,
            like_count: likes,
            dislike_count: dislikes,
        }
    }

    #[test]
    fn like_from_none_adds_membership() {
        let out = transition(entry(ReactionState::None, 2, 0), ReactionKind::Like);
        assert_eq!(out, entry(ReactionState::Liked, 3, 0));
    }

    #[test]
    fn double_like_returns_to_original() {
        let start = entry(ReactionState::None, 2, 1);
        let once = transition(start, ReactionKind::Like);
        let twice = transition(once, ReactionKind::Like);
        assert_eq!(twice, start);
    }

    #[test]
    fn like_while_disliked_swaps_both_counts() {
        let out = transition(entry(ReactionState::Disliked, 0, 3), ReactionKind::Like);
        assert_eq!(out, entry(ReactionState::Liked, 1, 2));
    }

    #[test]
    fn dislike_while_liked_swaps_both_counts() {
        let out = transition(entry(ReactionState::Liked, 5, 0), ReactionKind::Dislike);
        assert_eq!(out, entry(ReactionState::Disliked, 4, 1));
    }

    #[test]
    fn states_stay_mutually_exclusive_over_any_sequence() {
        let mut current = entry(ReactionState::None, 0, 0);
        let sequence = [
            ReactionKind::Like,
            ReactionKind::Dislike,
            ReactionKind::Dislike,
            ReactionKind::Like,
            ReactionKind::Like,
            ReactionKind::Dislike,
        ];
        for kind in sequence {
            current = transition(current, kind);
            let liked = current.state == ReactionState::Liked;
            let disliked = current.state == ReactionState::Disliked;
            assert!(!(liked && disliked));
            assert!(current.like_count >= 0 && current.dislike_count >= 0);
        }
    }

    #[test]
    fn counts_never_go_negative_on_stale_seed() {
        let out = transition(entry(ReactionState::Liked, 0, 0), ReactionKind::Like);
        assert_eq!(out.like_count, 0);
    }
}
