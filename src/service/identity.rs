//! Identity service
//!
//! The one place that maps between the identity provider's `authId` and
//! the content service's `profileId`. Every other component resolves
//! identities through here; none performs the mapping itself.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::data::{AuthId, ProfileCache, ProfileId, UserProfile, UserDirectory};
use crate::error::{EngineError, Result};
use crate::remote::{IdentityProvider, NewProfile, RemoteDataService, SessionUser};

/// Identity resolution and the known-user directory
pub struct IdentityService {
    remote: Arc<dyn RemoteDataService>,
    provider: Arc<dyn IdentityProvider>,
    directory: Arc<UserDirectory>,
    profiles: Arc<ProfileCache>,
    /// Session profile, resolved once and reused
    current: RwLock<Option<UserProfile>>,
}

impl IdentityService {
    pub fn new(
        remote: Arc<dyn RemoteDataService>,
        provider: Arc<dyn IdentityProvider>,
        directory: Arc<UserDirectory>,
        profiles: Arc<ProfileCache>,
    ) -> Self {
        Self {
            remote,
            provider,
            directory,
            profiles,
            current: RwLock::new(None),
        }
    }

    /// The signed-in session user as the identity provider reports it
    pub async fn session_user(&self) -> Result<SessionUser> {
        self.provider.current_user().await
    }

    /// Resolve the session user's profile, provisioning one on first
    /// login. Resolution failures for the current user are fatal to the
    /// operation in progress.
    pub async fn ensure_session(&self) -> Result<UserProfile> {
        if let Some(profile) = self.current.read().await.clone() {
            return Ok(profile);
        }

        let session = self.provider.current_user().await?;
        let record = match self.remote.profile_by_auth(&session.auth_id).await? {
            Some(record) => record,
            None => {
                // First login: provision a profile for this identity.
                let username = derive_username(&session);
                tracing::info!(auth_id = %session.auth_id, username = %username, "Provisioning profile");
                self.remote
                    .create_profile(NewProfile {
                        auth_id: session.auth_id.clone(),
                        username,
                        display_name: session.display_name.clone(),
                        avatar_url: session.avatar_url.clone(),
                        email: Some(session.email.clone()),
                    })
                    .await?
            }
        };

        let profile: UserProfile = record.into();
        self.directory.upsert(profile.clone()).await;
        self.profiles.insert(profile.clone()).await;
        *self.current.write().await = Some(profile.clone());
        Ok(profile)
    }

    /// The resolved session profile. `ensure_session` must have run.
    pub async fn current_profile(&self) -> Result<UserProfile> {
        self.current
            .read()
            .await
            .clone()
            .ok_or(EngineError::NotFound)
    }

    /// Map an identity-provider key to its content-service profile.
    ///
    /// `NotFound` means "profile not yet provisioned"; callers abort
    /// the dependent operation.
    pub async fn resolve_user(&self, auth_id: &AuthId) -> Result<UserProfile> {
        if let Some(user) = self.directory.by_auth(auth_id).await {
            return Ok(user);
        }
        let record = self
            .remote
            .profile_by_auth(auth_id)
            .await?
            .ok_or(EngineError::NotFound)?;
        let user: UserProfile = record.into();
        self.directory.upsert(user.clone()).await;
        self.profiles.insert(user.clone()).await;
        Ok(user)
    }

    /// Resolve display metadata for a distinct profile id set with one
    /// batched remote lookup for the ids the TTL cache does not cover.
    /// Ids unknown to the remote get a placeholder identity so callers
    /// can render before a full profile fetch completes.
    pub async fn resolve_profiles(
        &self,
        profile_ids: &[ProfileId],
    ) -> Result<HashMap<ProfileId, UserProfile>> {
        let mut resolved = HashMap::new();
        let mut missing = Vec::new();

        for id in profile_ids {
            if resolved.contains_key(id) {
                continue;
            }
            match self.profiles.get(id).await {
                Some(user) => {
                    resolved.insert(id.clone(), (*user).clone());
                }
                None => missing.push(id.clone()),
            }
        }

        if !missing.is_empty() {
            for record in self.remote.profiles_by_ids(&missing).await? {
                let user: UserProfile = record.into();
                self.profiles.insert(user.clone()).await;
                self.directory.upsert(user.clone()).await;
                resolved.insert(user.profile_id.clone(), user);
            }
        }

        for id in profile_ids {
            if !resolved.contains_key(id) {
                resolved.insert(id.clone(), self.synthesize_placeholder(id).await);
            }
        }

        Ok(resolved)
    }

    /// Known identity for a profile id, synthesizing a placeholder when
    /// neither the directory nor the remote knows it yet.
    pub async fn ensure_known(&self, profile_id: &ProfileId) -> Result<UserProfile> {
        if let Some(user) = self.directory.by_profile(profile_id).await {
            return Ok(user);
        }
        if let Some(record) = self.remote.profile_by_id(profile_id).await? {
            let user: UserProfile = record.into();
            self.directory.upsert(user.clone()).await;
            self.profiles.insert(user.clone()).await;
            return Ok(user);
        }
        Ok(self.synthesize_placeholder(profile_id).await)
    }

    /// Replace the known-user directory from a full profile fetch
    pub async fn reload_users(&self) -> Result<usize> {
        let records = self.remote.all_profiles().await?;
        let users: Vec<UserProfile> = records.into_iter().map(UserProfile::from).collect();
        let count = users.len();
        self.directory.replace_all(users).await;
        tracing::debug!(count, "User directory reloaded");
        Ok(count)
    }

    async fn synthesize_placeholder(&self, profile_id: &ProfileId) -> UserProfile {
        let user = UserProfile {
            auth_id: AuthId(format!("pending:{}", profile_id.0)),
            profile_id: profile_id.clone(),
            username: profile_id.0.clone(),
            display_name: None,
            avatar_url: None,
            is_sponsor: false,
            placeholder: true,
        };
        self.directory.upsert(user.clone()).await;
        user
    }
}

/// Username for a freshly provisioned profile: the provider's display
/// name if present, else the email local part.
fn derive_username(session: &SessionUser) -> String {
    if let Some(name) = session.display_name.as_deref() {
        let trimmed = name.trim();
        if !trimmed.is_empty() {
            return trimmed.to_ascii_lowercase().replace(' ', "_");
        }
    }
    session
        .email
        .split('@')
        .next()
        .unwrap_or("user")
        .to_ascii_lowercase()
}
