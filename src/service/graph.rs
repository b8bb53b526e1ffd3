//! Social graph service
//!
//! Follow edges held bidirectionally and rebuilt from a full-graph
//! fetch. Toggles apply optimistically and are fire-and-confirm against
//! the remote service's insert-or-ignore semantics; an uncertain
//! outcome triggers a full refresh rather than a hand-rolled inverse.

use std::sync::Arc;

use crate::data::{FollowEdge, GraphCache, ProfileId};
use crate::error::{EngineError, Result};
use crate::remote::RemoteDataService;
use crate::service::IdentityService;

/// Follow-graph state and toggling
pub struct GraphService {
    remote: Arc<dyn RemoteDataService>,
    identity: Arc<IdentityService>,
    graph: Arc<GraphCache>,
}

impl GraphService {
    pub fn new(
        remote: Arc<dyn RemoteDataService>,
        identity: Arc<IdentityService>,
        graph: Arc<GraphCache>,
    ) -> Self {
        Self {
            remote,
            identity,
            graph,
        }
    }

    /// Rebuild all derived views from one full-graph fetch.
    ///
    /// O(edges) per refresh; the directory reload rides along so every
    /// slice agrees on the profileId/authId mapping afterwards.
    pub async fn refresh_graph(&self) -> Result<()> {
        use crate::metrics::SYNC_CYCLES_TOTAL;

        let edges = match self.remote.fetch_follow_edges().await {
            Ok(edges) => edges,
            Err(e) => {
                SYNC_CYCLES_TOTAL.with_label_values(&["graph", "error"]).inc();
                return Err(e);
            }
        };
        self.identity.reload_users().await?;

        let count = edges.len();
        self.graph.rebuild(edges).await;

        SYNC_CYCLES_TOTAL.with_label_values(&["graph", "ok"]).inc();
        tracing::debug!(edges = count, "Graph refreshed");
        Ok(())
    }

    /// Optimistically flip the follow edge toward `target` and confirm
    /// remotely. Returns whether the current user now follows the
    /// target.
    pub async fn toggle_follow(&self, target: &ProfileId) -> Result<bool> {
        let me = self.identity.current_profile().await?;
        if me.profile_id == *target {
            return Err(EngineError::Validation(
                "cannot follow yourself".to_string(),
            ));
        }

        let edge = FollowEdge {
            follower_id: me.profile_id.clone(),
            following_id: target.clone(),
        };
        let now_following = self.graph.toggle(&edge).await;

        let outcome = if now_following {
            self.remote.insert_follow(&edge).await
        } else {
            self.remote.delete_follow(&edge).await
        };

        match outcome {
            // Duplicate insert is a no-op under the pair constraint.
            Ok(()) | Err(EngineError::Conflict) => Ok(now_following),
            Err(e) => {
                use crate::metrics::{ERRORS_TOTAL, RECONCILIATIONS_TOTAL};
                tracing::warn!(target = %target, error = %e, "Follow toggle uncertain, refreshing graph");
                ERRORS_TOTAL.with_label_values(&[e.kind(), "graph"]).inc();
                RECONCILIATIONS_TOTAL.with_label_values(&["graph"]).inc();
                self.refresh_graph().await?;
                Err(e)
            }
        }
    }

    /// Does the current user follow `target`?
    pub async fn follows(&self, target: &ProfileId) -> Result<bool> {
        let me = self.identity.current_profile().await?;
        Ok(self.graph.is_following(&me.profile_id, target).await)
    }

    /// Who `profile` follows
    pub async fn following_of(&self, profile: &ProfileId) -> Vec<ProfileId> {
        self.graph.following_of(profile).await
    }

    /// Who follows `profile`
    pub async fn followers_of(&self, profile: &ProfileId) -> Vec<ProfileId> {
        self.graph.followers_of(profile).await
    }

    pub async fn follower_count(&self, profile: &ProfileId) -> usize {
        self.graph.follower_count(profile).await
    }
}
