//! Facade projection and write forwarding

use std::sync::Arc;
use std::time::Duration;

use hostwatch_core::config::ConfigManager;
use hostwatch_core::error::{ConnectionError, ProfileError, SessionError};
use hostwatch_core::facade::{FacadeSnapshot, SessionFacade};
use hostwatch_core::models::{ProfilePatch, SavedServerProfile};
use hostwatch_core::profiles::ProfileStore;
use hostwatch_core::session::ConnectionState;
use tokio::sync::watch;

use super::support::{HostScript, ScriptedConnector, eventually, profile, settings};

fn facade_with(profiles: &[SavedServerProfile]) -> (SessionFacade, Arc<ScriptedConnector>) {
    let store = Arc::new(ProfileStore::in_memory());
    for p in profiles {
        store.add(p.clone()).unwrap();
    }
    let connector = ScriptedConnector::new();
    let facade = SessionFacade::new(store, connector.clone(), settings(20, 10, 3));
    (facade, connector)
}

async fn wait_for_snapshot(
    rx: &mut watch::Receiver<FacadeSnapshot>,
    pred: impl FnMut(&FacadeSnapshot) -> bool,
) -> FacadeSnapshot {
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(pred))
        .await
        .expect("timed out waiting for snapshot")
        .expect("snapshot channel closed")
        .clone()
}

#[tokio::test]
async fn test_snapshot_follows_session() {
    let (facade, _) = facade_with(&[profile("a", "host-a"), profile("b", "host-b")]);
    let mut snapshots = facade.subscribe();

    assert!(!facade.is_connected());
    assert!(facade.active_profile().is_none());
    assert_eq!(facade.profiles().len(), 2);

    let result = facade.connect("a").await;
    assert!(result.success, "{}", result.message);

    let snapshot = wait_for_snapshot(&mut snapshots, |s| s.metrics.is_some()).await;
    assert!(snapshot.is_connected);
    assert_eq!(snapshot.state, ConnectionState::Connected);
    assert_eq!(snapshot.active_profile.map(|p| p.profile.id), Some("a".to_string()));
    assert_eq!(snapshot.profiles.len(), 2);
    assert!(facade.metrics().is_some());

    facade.disconnect().await;
    let snapshot = facade.subscribe().borrow().clone();
    assert!(!snapshot.is_connected);
    assert!(snapshot.metrics.is_none());
    assert!(snapshot.active_profile.is_none());
    assert!(facade.metrics().is_none());
}

#[tokio::test]
async fn test_connect_result_reports_failures() {
    let (facade, connector) = facade_with(&[profile("down", "host-down")]);
    connector.script(
        "host-down",
        HostScript::failing(ConnectionError::AuthFailed("Permission denied".to_string())),
    );

    let missing = facade.connect("ghost").await;
    assert!(!missing.success);
    assert_eq!(
        missing.error,
        Some(SessionError::Profile(ProfileError::NotFound(
            "ghost".to_string()
        )))
    );

    let failed = facade.connect("down").await;
    assert!(!failed.success);
    assert!(failed.message.contains("Permission denied"));
    assert_eq!(facade.state(), ConnectionState::Error);
    assert!(facade.last_error().is_some());
    assert!(!facade.is_connected());
}

#[tokio::test]
async fn test_removing_active_profile_disconnects() {
    let (facade, connector) = facade_with(&[profile("a", "host-a"), profile("b", "host-b")]);
    assert!(facade.connect("a").await.success);

    let removed = facade.remove_profile("a").await.unwrap();

    assert_eq!(removed.id(), "a");
    assert_eq!(facade.state(), ConnectionState::Disconnected);
    assert!(facade.active_profile().is_none());
    assert_eq!(facade.profiles().len(), 1);
    assert_eq!(connector.transports("host-a")[0].closes(), 1);
}

#[tokio::test]
async fn test_failed_remove_keeps_active_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("server_profiles.json");
    let store = Arc::new(ProfileStore::load(&path).unwrap());
    store.add(profile("a", "host-a")).unwrap();
    let connector = ScriptedConnector::new();
    let facade = SessionFacade::new(store, connector.clone(), settings(20, 10, 3));
    assert!(facade.connect("a").await.success);

    // A directory where the temporary store file goes makes the write fail
    std::fs::create_dir(dir.path().join("server_profiles.json.tmp")).unwrap();
    let result = facade.remove_profile("a").await;

    assert!(matches!(result, Err(ProfileError::Persistence(_))));
    assert!(facade.is_connected());
    assert_eq!(facade.active_profile().map(|p| p.profile.id), Some("a".to_string()));
    assert_eq!(facade.profiles().len(), 1);
    assert_eq!(connector.transports("host-a")[0].closes(), 0);
}

#[tokio::test]
async fn test_removing_other_profile_keeps_session() {
    let (facade, _) = facade_with(&[profile("a", "host-a"), profile("b", "host-b")]);
    assert!(facade.connect("a").await.success);

    facade.remove_profile("b").await.unwrap();

    assert!(facade.is_connected());
    assert_eq!(facade.active_profile().map(|p| p.profile.id), Some("a".to_string()));
}

#[tokio::test]
async fn test_remove_unknown_profile() {
    let (facade, _) = facade_with(&[]);
    assert_eq!(
        facade.remove_profile("ghost").await,
        Err(ProfileError::NotFound("ghost".to_string()))
    );
}

#[tokio::test]
async fn test_profile_edits_reach_subscribers() {
    let (facade, _) = facade_with(&[profile("a", "host-a")]);
    let mut snapshots = facade.subscribe();

    facade.add_profile(profile("b", "host-b")).unwrap();
    facade
        .update_profile("a", ProfilePatch::new().name("renamed").connect_on_startup(true))
        .unwrap();

    let snapshot = wait_for_snapshot(&mut snapshots, |s| {
        s.profiles.len() == 2 && s.profiles[0].name() == "renamed"
    })
    .await;
    assert!(snapshot.profiles[0].connect_on_startup);
    assert_eq!(
        facade.add_profile(profile("b", "host-b")),
        Err(ProfileError::DuplicateId("b".to_string()))
    );
}

#[tokio::test]
async fn test_store_changes_outside_facade_are_relayed() {
    let (facade, _) = facade_with(&[]);
    let mut snapshots = facade.subscribe();

    facade.store().add(profile("late", "host-late")).unwrap();

    let snapshot = wait_for_snapshot(&mut snapshots, |s| s.profiles.len() == 1).await;
    assert_eq!(snapshot.profiles[0].id(), "late");
}

#[tokio::test]
async fn test_test_connection_leaves_session_alone() {
    let (facade, connector) = facade_with(&[profile("a", "host-a")]);
    connector.script(
        "host-down",
        HostScript::failing(ConnectionError::HostUnreachable("no route".to_string())),
    );
    assert!(facade.connect("a").await.success);

    let ok = facade.test_connection(&profile("probe", "host-probe").profile).await;
    assert!(ok.success);
    assert_eq!(connector.transports("host-probe")[0].closes(), 1);

    let failed = facade.test_connection(&profile("down", "host-down").profile).await;
    assert!(!failed.success);
    assert_eq!(
        failed.error,
        Some(SessionError::Connection(ConnectionError::HostUnreachable(
            "no route".to_string()
        )))
    );

    assert!(facade.is_connected());
    assert_eq!(facade.active_profile().map(|p| p.profile.id), Some("a".to_string()));
}

#[tokio::test]
async fn test_init_loads_profiles_from_config_dir() {
    let dir = tempfile::tempdir().unwrap();
    let config = ConfigManager::with_config_dir(dir.path());
    {
        let store = config.load_profiles().unwrap();
        store.add(profile("a", "host-a")).unwrap();
    }

    let (facade, report) = SessionFacade::init(&config).await.unwrap();

    assert!(report.is_empty());
    assert_eq!(facade.profiles().len(), 1);
    assert_eq!(facade.state(), ConnectionState::Disconnected);
    facade.teardown().await;
}

#[tokio::test]
async fn test_sampler_escalation_clears_metrics_in_snapshot() {
    let store = Arc::new(ProfileStore::in_memory());
    store.add(profile("a", "host-a")).unwrap();
    let connector = ScriptedConnector::new();
    connector.script(
        "host-a",
        HostScript {
            fallback: Err(hostwatch_core::transport::TransportError::Failed(
                "reset".to_string(),
            )),
            ..HostScript::default()
        },
    );
    let facade = SessionFacade::new(store, connector.clone(), settings(10, 10, 2));
    let mut snapshots = facade.subscribe();

    assert!(facade.connect("a").await.success);
    let snapshot = wait_for_snapshot(&mut snapshots, |s| s.state == ConnectionState::Error).await;

    assert!(!snapshot.is_connected);
    assert!(snapshot.metrics.is_none());
    assert!(snapshot.last_error.is_some());
    assert_eq!(snapshot.active_profile.map(|p| p.profile.id), Some("a".to_string()));
    let transport = connector.transports("host-a")[0].clone();
    eventually(|| transport.closes() == 1).await;
}
