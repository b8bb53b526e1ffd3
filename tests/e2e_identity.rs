//! E2E tests for identity resolution and presence

mod common;

use std::sync::Arc;

use common::TestEngine;
use lagoon::data::AuthId;
use lagoon::remote::{InMemoryRemote, RemoteDataService};

#[tokio::test]
async fn first_login_provisions_exactly_one_profile() {
    let t = TestEngine::new().await;
    let me = t.me().await;

    // Engine startup resolved the session and provisioned the profile.
    let stored = t
        .remote
        .profile_by_auth(&AuthId("auth-me".to_string()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.profile_id, me.profile_id);
    assert_eq!(stored.username, "me");
    assert_eq!(t.remote.all_profiles().await.unwrap().len(), 1);
}

#[tokio::test]
async fn returning_session_reuses_the_existing_profile() {
    let remote = Arc::new(InMemoryRemote::new());
    let first = TestEngine::with_session(Arc::clone(&remote), "ada").await;
    let first_id = first.me().await.profile_id;

    // Same identity signs in again: no second profile appears.
    let second = TestEngine::with_session(Arc::clone(&remote), "ada").await;
    assert_eq!(second.me().await.profile_id, first_id);
    assert_eq!(remote.all_profiles().await.unwrap().len(), 1);
}

#[tokio::test]
async fn directory_reload_feeds_the_presence_signal() {
    let t = TestEngine::new().await;
    t.seed_user("ada").await;
    let ada = AuthId("auth-ada".to_string());

    // Unknown until the directory reloads.
    assert!(!t.engine.presence.is_online(&ada).await);

    t.engine.identity.reload_users().await.unwrap();
    assert!(t.engine.presence.is_online(&ada).await);

    let online = t.engine.presence.online_users().await;
    assert!(online.contains(&ada));
    assert!(online.contains(&AuthId("auth-me".to_string())));
}

#[tokio::test]
async fn graph_refresh_keeps_every_slice_on_the_same_mapping() {
    let t = TestEngine::new().await;
    let ada = t.seed_user("ada").await;
    let me = t.me().await;
    t.seed_follow(&me.profile_id, &ada).await;

    // Graph refresh reloads the directory alongside the edges.
    t.engine.graph.refresh_graph().await.unwrap();
    assert!(t.engine.graph.follows(&ada).await.unwrap());
    assert!(
        t.engine
            .presence
            .is_online(&AuthId("auth-ada".to_string()))
            .await
    );
}
