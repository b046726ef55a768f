//! CLI error types and exit codes.

use hostwatch_core::error::{HostwatchError, ProfileError, SessionError};

/// Exit codes for CLI operations
pub mod exit_codes {
    /// General error - configuration, validation, or other non-connection errors
    pub const GENERAL_ERROR: i32 = 1;
    /// Connection failure - connection test failed or a session could not be
    /// established
    pub const CONNECTION_FAILURE: i32 = 2;
}

/// CLI error type
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Profile not found
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    /// Profile store rejected the change
    #[error("Profile error: {0}")]
    Profile(String),

    /// Invalid command-line input
    #[error("Invalid input: {0}")]
    Input(String),

    /// Connection test failed
    #[error("Connection test failed: {0}")]
    TestFailed(String),

    /// Session could not be opened or failed while sampling
    #[error("Connection error: {0}")]
    Connection(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ProfileError> for CliError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::NotFound(id) => Self::ProfileNotFound(id),
            other => Self::Profile(other.to_string()),
        }
    }
}

impl From<SessionError> for CliError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Profile(e) => e.into(),
            other => Self::Connection(other.to_string()),
        }
    }
}

impl From<HostwatchError> for CliError {
    fn from(err: HostwatchError) -> Self {
        match err {
            HostwatchError::Session(e) => e.into(),
            HostwatchError::Sampling(e) => Self::Connection(e.to_string()),
            HostwatchError::Config(e) => Self::Config(e.to_string()),
            HostwatchError::Io(e) => Self::Io(e),
        }
    }
}

impl CliError {
    /// Returns the appropriate exit code for this error type.
    ///
    /// Exit codes:
    /// - 0: Success (not an error)
    /// - 1: General error (configuration, validation, profile store, IO)
    /// - 2: Connection failure (test failed, session failed)
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::TestFailed(_) | Self::Connection(_) => exit_codes::CONNECTION_FAILURE,
            Self::Config(_)
            | Self::ProfileNotFound(_)
            | Self::Profile(_)
            | Self::Input(_)
            | Self::Io(_) => exit_codes::GENERAL_ERROR,
        }
    }
}
