//! `Hostwatch` Core Library
//!
//! This crate provides the core of `Hostwatch`: saved server profiles, a
//! single managed SSH session and the telemetry sampled from it.
//!
//! # Crate Structure
//!
//! - [`models`] - Server profiles and telemetry snapshots
//! - [`profiles`] - Persisted profile store
//! - [`auth`] - Credential resolution (passwords, private keys)
//! - [`transport`] - Connector/Transport seam and the system `ssh` implementation
//! - [`session`] - Connection state machine and session ownership
//! - [`monitoring`] - Telemetry command, parser, histories and the sampler
//! - [`facade`] - Composite read model for presentation layers
//! - [`config`] - Application settings and paths
//! - [`tracing`] - Structured logging setup

// Enable missing_docs warning for public API documentation
#![warn(missing_docs)]

pub mod auth;
pub mod config;
pub mod error;
pub mod facade;
pub mod models;
pub mod monitoring;
pub mod profiles;
pub mod session;
pub mod tracing;
pub mod transport;

// Flat re-exports for the CLI and integration tests
pub use auth::{Authenticator, Credential};
pub use config::{AppSettings, ConfigManager};
pub use error::{
    AuthError, ConfigError, ConfigResult, ConnectionError, HostwatchError, ProfileError,
    ProfileResult, SamplingError, SessionError, SessionResult,
};
pub use facade::{FacadeSnapshot, SessionFacade};
pub use models::{
    AuthMethod, ConnectionResult, DiskUsage, NetworkHistoryPoint, NetworkStats, ProfilePatch,
    SavedServerProfile, ServerProfile, SystemMetrics,
};
pub use monitoring::{MetricsSampler, SamplerSettings, SystemInfo};
pub use profiles::ProfileStore;
pub use session::{
    ConnectionState, SessionManager, SessionSettings, SessionStatus, StartupReport,
    StateTransition,
};
pub use tracing::{TracingConfig, TracingLevel, TracingOutput, init_tracing};
pub use transport::{ConnectTarget, Connector, SshConnector, Transport, TransportError};
