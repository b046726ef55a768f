//! Composite view over the profile store and the session manager
//!
//! [`SessionFacade`] is what a presentation layer talks to. Its read side is
//! a [`FacadeSnapshot`] recomputed whenever the store or the session changes;
//! every write is forwarded to [`ProfileStore`] or [`SessionManager`].

use std::sync::Arc;

use secrecy::SecretString;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::config::ConfigManager;
use crate::error::{HostwatchError, ProfileResult};
use crate::models::{
    ConnectionResult, ProfilePatch, SavedServerProfile, ServerProfile, SystemMetrics,
};
use crate::monitoring::SystemInfo;
use crate::profiles::ProfileStore;
use crate::session::{
    ConnectionState, SessionManager, SessionSettings, SessionStatus, StartupReport,
    StateTransition,
};
use crate::transport::{Connector, SshConnector, SshOptions};

/// Everything a view needs, derived from the store and session status
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FacadeSnapshot {
    /// Profile of the session or attempt
    pub active_profile: Option<SavedServerProfile>,
    /// Current state
    pub state: ConnectionState,
    /// `state == Connected`
    pub is_connected: bool,
    /// Latest metrics with histories; `None` unless connected
    pub metrics: Option<SystemMetrics>,
    /// Static host facts of the current session
    pub system_info: Option<SystemInfo>,
    /// All saved profiles in insertion order
    pub profiles: Vec<SavedServerProfile>,
    /// Why the last attempt or session failed
    pub last_error: Option<String>,
}

impl FacadeSnapshot {
    /// Projects a profile list and a session status into one view
    #[must_use]
    pub fn compose(profiles: &[SavedServerProfile], status: &SessionStatus) -> Self {
        let active_profile = status
            .profile_id
            .as_deref()
            .and_then(|id| profiles.iter().find(|p| p.id() == id))
            .cloned();
        let is_connected = status.is_connected();

        Self {
            active_profile,
            state: status.state,
            is_connected,
            metrics: if is_connected {
                status.metrics.clone()
            } else {
                None
            },
            system_info: status.system_info.clone(),
            profiles: profiles.to_vec(),
            last_error: status.last_error.clone(),
        }
    }
}

/// Read-mostly entry point combining profiles and the active session
pub struct SessionFacade {
    store: Arc<ProfileStore>,
    manager: SessionManager,
    snapshot: Arc<watch::Sender<FacadeSnapshot>>,
    relay: JoinHandle<()>,
}

impl std::fmt::Debug for SessionFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionFacade")
            .field("manager", &self.manager)
            .field("profiles", &self.store.len())
            .finish_non_exhaustive()
    }
}

impl SessionFacade {
    /// Wires a facade over `store`, opening sessions through `connector`.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(
        store: Arc<ProfileStore>,
        connector: Arc<dyn Connector>,
        settings: SessionSettings,
    ) -> Self {
        let manager = SessionManager::new(Arc::clone(&store), connector, settings);
        let initial = FacadeSnapshot::compose(&store.list(), &manager.status());
        let (snapshot, _) = watch::channel(initial);
        let snapshot = Arc::new(snapshot);

        let relay = tokio::spawn(relay(
            store.subscribe(),
            manager.subscribe(),
            Arc::clone(&snapshot),
        ));

        Self {
            store,
            manager,
            snapshot,
            relay,
        }
    }

    /// Loads settings and profiles from `config`, connects over SSH and runs
    /// the startup reconnect.
    ///
    /// # Errors
    ///
    /// Returns an error if settings or profiles cannot be loaded. Startup
    /// connect failures are reported in the [`StartupReport`] instead.
    pub async fn init(config: &ConfigManager) -> Result<(Self, StartupReport), HostwatchError> {
        let settings = config.load_settings()?;
        let store = Arc::new(config.load_profiles()?);
        let connector = Arc::new(SshConnector::new(SshOptions::from_settings(
            &settings.connection,
        )));

        tracing::debug!(
            profiles = store.len(),
            interval_ms = settings.monitoring.effective_interval().as_millis(),
            "Session facade initialized"
        );

        let facade = Self::new(store, connector, settings.session_settings());
        let report = facade.startup().await;
        Ok((facade, report))
    }

    /// Runs the startup reconnect
    pub async fn startup(&self) -> StartupReport {
        let report = self.manager.reconnect_on_startup().await;
        self.refresh();
        report
    }

    /// Ends the session before the process exits
    pub async fn teardown(&self) {
        self.disconnect().await;
    }

    /// Profile of the session or attempt
    #[must_use]
    pub fn active_profile(&self) -> Option<SavedServerProfile> {
        self.manager
            .active_profile_id()
            .and_then(|id| self.store.get(&id))
    }

    /// Returns true while a session is open
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.manager.state() == ConnectionState::Connected
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.manager.state()
    }

    /// Latest metrics with histories
    #[must_use]
    pub fn metrics(&self) -> Option<SystemMetrics> {
        self.snapshot().metrics
    }

    /// Static host facts of the current session
    #[must_use]
    pub fn system_info(&self) -> Option<SystemInfo> {
        self.manager.status().system_info
    }

    /// Why the last attempt or session failed
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.manager.status().last_error
    }

    /// All saved profiles
    #[must_use]
    pub fn profiles(&self) -> Vec<SavedServerProfile> {
        self.store.list()
    }

    /// Freshly computed view
    #[must_use]
    pub fn snapshot(&self) -> FacadeSnapshot {
        FacadeSnapshot::compose(&self.store.list(), &self.manager.status())
    }

    /// Subscribes to view changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FacadeSnapshot> {
        self.snapshot.subscribe()
    }

    /// Subscribes to every session state transition
    #[must_use]
    pub fn transitions(&self) -> broadcast::Receiver<StateTransition> {
        self.manager.transitions()
    }

    /// The underlying session manager
    #[must_use]
    pub const fn manager(&self) -> &SessionManager {
        &self.manager
    }

    /// The underlying profile store
    #[must_use]
    pub const fn store(&self) -> &Arc<ProfileStore> {
        &self.store
    }

    /// Connects to the profile with `profile_id`
    pub async fn connect(&self, profile_id: &str) -> ConnectionResult {
        let result = self.manager.connect(profile_id).await;
        self.refresh();
        result.into()
    }

    /// Connects with a one-shot key passphrase
    pub async fn connect_with_passphrase(
        &self,
        profile_id: &str,
        passphrase: SecretString,
    ) -> ConnectionResult {
        let result = self
            .manager
            .connect_with_passphrase(profile_id, passphrase)
            .await;
        self.refresh();
        result.into()
    }

    /// Ends the session. Never fails.
    pub async fn disconnect(&self) {
        let pending = self.manager.disconnect();
        self.refresh();
        pending.await;
    }

    /// Opens and closes a transport for `profile` without touching the
    /// active session
    pub async fn test_connection(&self, profile: &ServerProfile) -> ConnectionResult {
        match self.manager.test_connection(profile).await {
            Ok(()) => ConnectionResult::ok(format!(
                "Connection to {} succeeded",
                profile.destination()
            )),
            Err(err) => ConnectionResult::failed(err),
        }
    }

    /// Saves a new profile
    ///
    /// # Errors
    ///
    /// See [`ProfileStore::add`].
    pub fn add_profile(&self, profile: impl Into<SavedServerProfile>) -> ProfileResult<()> {
        self.store.add(profile)?;
        self.refresh();
        Ok(())
    }

    /// Edits a saved profile. A running session keeps the settings it was
    /// opened with until the next connect.
    ///
    /// # Errors
    ///
    /// See [`ProfileStore::update`].
    pub fn update_profile(
        &self,
        id: &str,
        patch: ProfilePatch,
    ) -> ProfileResult<SavedServerProfile> {
        let updated = self.store.update(id, patch)?;
        self.refresh();
        Ok(updated)
    }

    /// Deletes a saved profile, then ends its session if it is the active
    /// one. A failed delete leaves both the profile and the session as
    /// they were.
    ///
    /// # Errors
    ///
    /// See [`ProfileStore::remove`].
    pub async fn remove_profile(&self, id: &str) -> ProfileResult<SavedServerProfile> {
        let removed = self.store.remove(id)?;
        if self.manager.active_profile_id().as_deref() == Some(id) {
            tracing::info!(profile_id = %id, "Removed the active profile; disconnecting");
            self.manager.disconnect().await;
        }
        self.refresh();
        Ok(removed)
    }

    fn refresh(&self) {
        publish(&self.snapshot, &self.store.list(), &self.manager.status());
    }
}

impl Drop for SessionFacade {
    fn drop(&mut self) {
        self.relay.abort();
    }
}

fn publish(
    sender: &watch::Sender<FacadeSnapshot>,
    profiles: &[SavedServerProfile],
    status: &SessionStatus,
) {
    let next = FacadeSnapshot::compose(profiles, status);
    sender.send_if_modified(|current| {
        if *current == next {
            false
        } else {
            *current = next;
            true
        }
    });
}

/// Recomputes the view whenever either upstream publishes
async fn relay(
    mut profiles: watch::Receiver<Vec<SavedServerProfile>>,
    mut status: watch::Receiver<SessionStatus>,
    snapshot: Arc<watch::Sender<FacadeSnapshot>>,
) {
    loop {
        tokio::select! {
            changed = profiles.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
        let current_profiles = profiles.borrow_and_update().clone();
        let current_status = status.borrow_and_update().clone();
        publish(&snapshot, &current_profiles, &current_status);
    }
}
