//! Session manager for `Hostwatch`
//!
//! Owns the single active session: the connection state machine, the
//! transport handle and the sampler bound to it.
//!
//! All mutable state sits behind one mutex that is never held across an
//! await. Every connect attempt and every session gets an epoch number;
//! `disconnect()` bumps the epoch, so anything still in flight for an
//! older epoch finds a mismatch when it comes back and is discarded.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use chrono::Utc;
use secrecy::SecretString;
use tokio::sync::{broadcast, watch};
use tracing::Instrument;

use crate::auth::Authenticator;
use crate::error::{ConnectionError, ProfileError, SamplingError, SessionError, SessionResult};
use crate::models::{ServerProfile, SystemMetrics};
use crate::monitoring::{MetricsSampler, SampleTarget, SystemInfo};
use crate::profiles::ProfileStore;
use crate::transport::{ConnectTarget, Connector, Transport};

use super::state::{
    ConnectionState, SessionSettings, SessionStatus, StartupReport, StateTransition,
};

/// Buffered transitions per subscriber before the oldest are dropped
const TRANSITION_BUFFER: usize = 64;

struct ActiveSession {
    transport: Arc<dyn Transport>,
    sampler: MetricsSampler,
}

#[derive(Default)]
struct Core {
    state: ConnectionState,
    profile_id: Option<String>,
    epoch: u64,
    active: Option<ActiveSession>,
    metrics: Option<SystemMetrics>,
    system_info: Option<SystemInfo>,
    last_error: Option<String>,
}

impl Core {
    fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.state,
            profile_id: self.profile_id.clone(),
            metrics: self.metrics.clone(),
            system_info: self.system_info.clone(),
            last_error: self.last_error.clone(),
        }
    }
}

struct Shared {
    store: Arc<ProfileStore>,
    connector: Arc<dyn Connector>,
    authenticator: Authenticator,
    settings: SessionSettings,
    core: Mutex<Core>,
    status: watch::Sender<SessionStatus>,
    transitions: broadcast::Sender<StateTransition>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, core: &Core) {
        self.status.send_replace(core.status());
    }

    /// Moves to `to`, records the transition and publishes once
    fn transition(&self, core: &mut Core, to: ConnectionState, profile_id: Option<String>) {
        let from = core.state;
        let subject = profile_id.clone().or_else(|| core.profile_id.clone());
        core.state = to;
        core.profile_id = profile_id;

        if from != to {
            tracing::info!(profile_id = ?subject, %from, %to, "Session state changed");
            let _ = self.transitions.send(StateTransition {
                profile_id: subject,
                from,
                to,
            });
        }
        self.publish(core);
    }

    /// Stops sampling and drops the session synchronously. Returns the
    /// transport so the caller can close it outside the lock.
    fn teardown(&self, core: &mut Core) -> Option<Arc<dyn Transport>> {
        let transport = core.active.take().map(|mut active| {
            active.sampler.stop();
            active.transport
        });
        core.metrics = None;
        core.system_info = None;
        if core.state == ConnectionState::Disconnected {
            self.publish(core);
        } else {
            self.transition(core, ConnectionState::Disconnected, None);
        }
        transport
    }
}

/// Owner of the single active session.
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct SessionManager {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = self.shared.lock();
        f.debug_struct("SessionManager")
            .field("state", &core.state)
            .field("profile_id", &core.profile_id)
            .field("epoch", &core.epoch)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Creates a manager in `Disconnected`
    #[must_use]
    pub fn new(
        store: Arc<ProfileStore>,
        connector: Arc<dyn Connector>,
        settings: SessionSettings,
    ) -> Self {
        let (status, _) = watch::channel(SessionStatus::default());
        let (transitions, _) = broadcast::channel(TRANSITION_BUFFER);
        Self {
            shared: Arc::new(Shared {
                store,
                connector,
                authenticator: Authenticator::new(),
                settings,
                core: Mutex::new(Core::default()),
                status,
                transitions,
            }),
        }
    }

    /// The profile store sessions are opened from
    #[must_use]
    pub fn store(&self) -> &Arc<ProfileStore> {
        &self.shared.store
    }

    /// Settings in use
    #[must_use]
    pub fn settings(&self) -> &SessionSettings {
        &self.shared.settings
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.shared.lock().state
    }

    /// Current status snapshot
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.shared.lock().status()
    }

    /// Id of the profile in `Connecting`, `Connected` or `Error`
    #[must_use]
    pub fn active_profile_id(&self) -> Option<String> {
        self.shared.lock().profile_id.clone()
    }

    /// Latest metrics of the open session
    #[must_use]
    pub fn metrics(&self) -> Option<SystemMetrics> {
        self.shared.lock().metrics.clone()
    }

    /// Subscribes to status changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.shared.status.subscribe()
    }

    /// Subscribes to every state transition, in order
    #[must_use]
    pub fn transitions(&self) -> broadcast::Receiver<StateTransition> {
        self.shared.transitions.subscribe()
    }

    /// Connects to the profile with `profile_id`.
    ///
    /// A different open session (or a session in `Error`) is torn down
    /// first and reaches `Disconnected` before the new attempt starts.
    /// Connecting to the profile that is already connected is a no-op.
    ///
    /// # Errors
    ///
    /// - [`ConnectionError::AlreadyConnecting`] while another attempt is in
    ///   flight; the running attempt is unaffected.
    /// - [`ProfileError::NotFound`] for an unknown id.
    /// - [`SessionError::Auth`] if the credential cannot be resolved; the
    ///   manager returns to `Disconnected`.
    /// - [`ConnectionError::AuthFailed`], [`ConnectionError::HostUnreachable`]
    ///   or [`ConnectionError::Timeout`] from the transport; the manager
    ///   moves to `Error`.
    /// - [`ConnectionError::Cancelled`] if `disconnect()` ran meanwhile.
    pub async fn connect(&self, profile_id: &str) -> SessionResult<()> {
        self.connect_inner(profile_id, None).await
    }

    /// Like [`Self::connect`], with a one-shot key passphrase that is not
    /// persisted.
    ///
    /// # Errors
    ///
    /// Same as [`Self::connect`].
    pub async fn connect_with_passphrase(
        &self,
        profile_id: &str,
        passphrase: SecretString,
    ) -> SessionResult<()> {
        self.connect_inner(profile_id, Some(passphrase)).await
    }

    async fn connect_inner(
        &self,
        profile_id: &str,
        passphrase: Option<SecretString>,
    ) -> SessionResult<()> {
        let span = tracing::info_span!(
            crate::tracing::span_names::SESSION_CONNECT,
            profile_id = %profile_id
        );
        self.attempt(profile_id, passphrase).instrument(span).await
    }

    async fn attempt(
        &self,
        profile_id: &str,
        passphrase: Option<SecretString>,
    ) -> SessionResult<()> {
        let shared = &self.shared;

        let (epoch, profile, previous) = {
            let mut core = shared.lock();
            if core.state == ConnectionState::Connecting {
                return Err(ConnectionError::AlreadyConnecting.into());
            }
            let saved = shared
                .store
                .get(profile_id)
                .ok_or_else(|| ProfileError::NotFound(profile_id.to_string()))?;
            if core.state == ConnectionState::Connected
                && core.profile_id.as_deref() == Some(profile_id)
            {
                tracing::debug!("Already connected");
                return Ok(());
            }

            let previous = shared.teardown(&mut core);
            core.epoch += 1;
            core.last_error = None;
            shared.transition(
                &mut core,
                ConnectionState::Connecting,
                Some(profile_id.to_string()),
            );
            (core.epoch, saved.profile, previous)
        };

        if let Some(transport) = previous {
            transport.close().await;
        }

        let credential = match passphrase {
            Some(passphrase) => shared
                .authenticator
                .resolve_with_passphrase(&profile.auth_method, passphrase),
            None => shared.authenticator.resolve(&profile.auth_method),
        };
        let credential = match credential {
            Ok(credential) => credential,
            Err(err) => {
                tracing::info!(error = %err, "Credential resolution failed");
                let err = SessionError::from(err);
                return Err(self.fail_attempt(epoch, ConnectionState::Disconnected, err));
            }
        };

        let target = ConnectTarget::from(&profile);
        let timeout = shared.settings.connect_timeout;
        let opened = tokio::time::timeout(timeout, shared.connector.open(&target, credential))
            .await
            .unwrap_or(Err(ConnectionError::Timeout(timeout.as_secs())));

        let transport = match opened {
            Ok(transport) => transport,
            Err(err) => {
                tracing::warn!(host = %profile.host, error = %err, "Connection failed");
                return Err(self.fail_attempt(epoch, ConnectionState::Error, err.into()));
            }
        };

        if !self.commit(epoch, profile_id, Arc::clone(&transport)) {
            tracing::debug!("Attempt cancelled; releasing transport");
            transport.close().await;
            return Err(ConnectionError::Cancelled.into());
        }

        tracing::info!(destination = %profile.destination(), "Connected");
        Ok(())
    }

    /// Records a failed attempt unless it was cancelled meanwhile
    fn fail_attempt(&self, epoch: u64, to: ConnectionState, err: SessionError) -> SessionError {
        let mut core = self.shared.lock();
        if core.epoch != epoch {
            return ConnectionError::Cancelled.into();
        }
        core.last_error = Some(err.to_string());
        let profile_id = match to {
            ConnectionState::Disconnected => None,
            _ => core.profile_id.clone(),
        };
        self.shared.transition(&mut core, to, profile_id);
        err
    }

    /// Installs an opened transport as the active session
    fn commit(&self, epoch: u64, profile_id: &str, transport: Arc<dyn Transport>) -> bool {
        let shared = &self.shared;
        let mut core = shared.lock();
        if core.epoch != epoch {
            return false;
        }

        if let Err(err) = shared.store.mark_connected(profile_id, Utc::now()) {
            tracing::warn!(error = %err, "Failed to record last_connected");
        }

        let mut sampler = MetricsSampler::new(shared.settings.sampler);
        sampler.start(Arc::new(SessionLink {
            shared: Arc::downgrade(shared),
            epoch,
        }));
        core.active = Some(ActiveSession { transport, sampler });
        shared.transition(
            &mut core,
            ConnectionState::Connected,
            Some(profile_id.to_string()),
        );
        true
    }

    /// Ends the session or attempt, whatever the state. Never fails.
    ///
    /// The sampler is stopped, in-flight work is invalidated and the state
    /// is `Disconnected` before this returns; the returned future only
    /// releases the transport. Calling it again is a no-op.
    pub fn disconnect(&self) -> impl Future<Output = ()> + Send + 'static {
        let transport = {
            let mut core = self.shared.lock();
            core.epoch += 1;
            core.last_error = None;
            self.shared.teardown(&mut core)
        };

        let span = tracing::info_span!(crate::tracing::span_names::SESSION_DISCONNECT);
        async move {
            if let Some(transport) = transport {
                transport.close().await;
                tracing::info!(host = %transport.target().host, "Disconnected");
            }
        }
        .instrument(span)
    }

    /// Connects the first profile flagged `connect_on_startup` that
    /// succeeds, trying candidates one at a time in insertion order.
    /// Failures are collected, never fatal. The pass ends early when its
    /// attempt is cancelled by `disconnect()` or rejected because another
    /// connect is in flight.
    pub async fn reconnect_on_startup(&self) -> StartupReport {
        let span = tracing::info_span!(crate::tracing::span_names::SESSION_STARTUP);
        async {
            let mut report = StartupReport::default();
            for candidate in self.shared.store.startup_candidates() {
                let id = candidate.id().to_string();
                match self.connect(&id).await {
                    Ok(()) => {
                        report.connected = Some(id);
                        break;
                    }
                    // Cancelled by disconnect() or pre-empted by another connect
                    Err(
                        err @ SessionError::Connection(
                            ConnectionError::Cancelled | ConnectionError::AlreadyConnecting,
                        ),
                    ) => {
                        tracing::info!(profile_id = %id, error = %err, "Startup reconnect abandoned");
                        report.failures.push((id, err));
                        break;
                    }
                    Err(err) => {
                        tracing::warn!(profile_id = %id, error = %err, "Startup connect failed");
                        report.failures.push((id, err));
                    }
                }
            }
            report
        }
        .instrument(span)
        .await
    }

    /// Opens and immediately closes a transport for `profile`, leaving the
    /// managed session untouched.
    ///
    /// # Errors
    ///
    /// Returns the credential or transport failure.
    pub async fn test_connection(&self, profile: &ServerProfile) -> SessionResult<()> {
        let credential = self.shared.authenticator.resolve(&profile.auth_method)?;
        let target = ConnectTarget::from(profile);
        let timeout = self.shared.settings.connect_timeout;
        let transport =
            tokio::time::timeout(timeout, self.shared.connector.open(&target, credential))
                .await
                .unwrap_or(Err(ConnectionError::Timeout(timeout.as_secs())))?;
        transport.close().await;
        Ok(())
    }
}

/// The sampler's view of one session epoch
struct SessionLink {
    shared: Weak<Shared>,
    epoch: u64,
}

impl SessionLink {
    /// Runs `f` on the core if this link's session is still the open one
    fn with_live_core<T>(&self, f: impl FnOnce(&Shared, &mut Core) -> T) -> Option<T> {
        let shared = self.shared.upgrade()?;
        let mut core = shared.lock();
        if core.epoch != self.epoch || core.state != ConnectionState::Connected {
            return None;
        }
        Some(f(&shared, &mut core))
    }
}

#[async_trait]
impl SampleTarget for SessionLink {
    async fn fetch(&self, command: &str) -> Result<String, SamplingError> {
        let transport = self
            .with_live_core(|_, core| core.active.as_ref().map(|a| Arc::clone(&a.transport)))
            .flatten()
            .ok_or(SamplingError::Detached)?;
        transport
            .exec(command)
            .await
            .map_err(|e| SamplingError::Transient(e.to_string()))
    }

    fn publish(&self, metrics: SystemMetrics) -> bool {
        self.with_live_core(|shared, core| {
            core.metrics = Some(metrics);
            shared.publish(core);
        })
        .is_some()
    }

    fn publish_system_info(&self, info: SystemInfo) {
        self.with_live_core(|shared, core| {
            core.system_info = Some(info);
            shared.publish(core);
        });
    }

    fn escalate(&self, error: SamplingError) {
        let transport = self
            .with_live_core(|shared, core| {
                let transport = core.active.take().map(|mut active| {
                    active.sampler.stop();
                    active.transport
                });
                core.epoch += 1;
                core.metrics = None;
                core.last_error = Some(error.to_string());
                let profile_id = core.profile_id.clone();
                shared.transition(core, ConnectionState::Error, profile_id);
                transport
            })
            .flatten();

        if let Some(transport) = transport {
            tokio::spawn(async move { transport.close().await });
        }
    }
}
