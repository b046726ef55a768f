//! Session lifecycle
//!
//! [`SessionManager`] owns at most one open session at a time and drives
//! its [`ConnectionState`] machine. Status changes are published on a watch
//! channel; individual transitions on a broadcast channel.

mod manager;
mod state;

pub use manager::SessionManager;
pub use state::{
    ConnectionState, DEFAULT_CONNECT_TIMEOUT, SessionSettings, SessionStatus, StartupReport,
    StateTransition,
};
