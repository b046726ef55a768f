//! Core data models for `Hostwatch`
//!
//! Server profiles (what to connect to) and telemetry snapshots (what the
//! session reports back).

mod profile;
mod telemetry;

pub use profile::{
    AuthMethod, DEFAULT_SSH_PORT, ProfilePatch, SavedServerProfile, ServerProfile,
};
pub use telemetry::{
    ConnectionResult, DiskUsage, NetworkHistoryPoint, NetworkStats, SystemMetrics, percent_of,
};
