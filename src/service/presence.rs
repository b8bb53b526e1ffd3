//! Presence tracker
//!
//! Best-effort online/offline signal derived from the known-identity
//! directory; no heartbeat exists, so "known and fully resolved" is the
//! closest available proxy.

use std::sync::Arc;

use crate::data::{AuthId, UserDirectory};

/// Online-signal view over the user directory
pub struct PresenceService {
    directory: Arc<UserDirectory>,
}

impl PresenceService {
    pub fn new(directory: Arc<UserDirectory>) -> Self {
        Self { directory }
    }

    /// Whether `auth_id` currently counts as online
    pub async fn is_online(&self, auth_id: &AuthId) -> bool {
        self.directory
            .by_auth(auth_id)
            .await
            .is_some_and(|user| !user.placeholder)
    }

    /// All identities currently counting as online
    pub async fn online_users(&self) -> Vec<AuthId> {
        let mut online = Vec::new();
        for auth_id in self.directory.known_auth_ids().await {
            if self.is_online(&auth_id).await {
                online.push(auth_id);
            }
        }
        online
    }
}
