//! Connection state and the values the session manager publishes

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::models::SystemMetrics;
use crate::monitoring::{SamplerSettings, SystemInfo};

/// Default limit for opening a session
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Lifecycle of the single managed session.
///
/// `Disconnected → Connecting → Connected`, with `Error` reached from
/// `Connecting` (transport failure) or `Connected` (sampler escalation).
/// `disconnect()` returns any state to `Disconnected`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No session
    #[default]
    Disconnected,
    /// A connect attempt is in flight
    Connecting,
    /// A session is open and sampled
    Connected,
    /// The last attempt or session failed; reconnect explicitly
    Error,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One state change, in the order it happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition {
    /// Profile the change concerns
    pub profile_id: Option<String>,
    /// State before
    pub from: ConnectionState,
    /// State after
    pub to: ConnectionState,
}

/// Latest view of the session manager
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStatus {
    /// Current state
    pub state: ConnectionState,
    /// Profile of the session or attempt; `None` while `Disconnected`
    pub profile_id: Option<String>,
    /// Latest snapshot with histories; only present while `Connected`
    pub metrics: Option<SystemMetrics>,
    /// Static host facts of the current session
    pub system_info: Option<SystemInfo>,
    /// Why the last attempt or session failed
    pub last_error: Option<String>,
}

impl SessionStatus {
    /// Returns true while a session is open
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

/// Session manager configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Limit for resolving the credential and opening the transport
    pub connect_timeout: Duration,
    /// Sampler configuration used for every session
    pub sampler: SamplerSettings,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            sampler: SamplerSettings::default(),
        }
    }
}

/// Outcome of `reconnect_on_startup`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartupReport {
    /// Profile that ended up connected
    pub connected: Option<String>,
    /// Candidates tried before it, with their failure
    pub failures: Vec<(String, SessionError)>,
}

impl StartupReport {
    /// Returns true if no profile was flagged for startup
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connected.is_none() && self.failures.is_empty()
    }
}
