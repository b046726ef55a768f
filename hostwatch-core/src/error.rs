//! Error types for `Hostwatch`
//!
//! Every error here is a plain value: `Clone` + `PartialEq` so it can be
//! carried inside a [`crate::models::ConnectionResult`], published to
//! observers, and asserted on in tests.

use thiserror::Error;

/// Errors raised while opening or holding a session with a managed host
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// The host did not answer within the connect timeout
    #[error("Connection timed out after {0}s")]
    Timeout(u64),

    /// The host rejected the supplied credential
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// The host could not be reached (DNS, refused, no route)
    #[error("Host unreachable: {0}")]
    HostUnreachable(String),

    /// Another connect attempt is still in flight
    #[error("A connection attempt is already in progress")]
    AlreadyConnecting,

    /// The attempt was made moot by `disconnect()` before it finished
    #[error("Connection attempt cancelled")]
    Cancelled,
}

/// Errors raised while turning an `AuthMethod` into usable credential material
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The private key file could not be read
    #[error("Private key '{path}' is unreadable: {reason}")]
    KeyUnreadable {
        /// Path after tilde expansion
        path: String,
        /// Underlying IO error text
        reason: String,
    },

    /// The key is encrypted and no passphrase was supplied
    #[error("Private key '{0}' is encrypted; a passphrase is required")]
    PassphraseRequired(String),

    /// The credential is malformed (unknown key format, empty secret)
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),
}

/// Errors raised by the metrics sampler
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SamplingError {
    /// A single tick failed; the sampler retries on the next tick
    #[error("Transient sampling failure: {0}")]
    Transient(String),

    /// Consecutive failures reached the threshold; the session is marked `Error`
    #[error("Sampling failed {failures} times in a row: {last_error}")]
    Fatal {
        /// Number of consecutive failures observed
        failures: u32,
        /// Text of the last failure
        last_error: String,
    },

    /// The session the sampler was bound to no longer exists
    #[error("Sampler detached from session")]
    Detached,
}

/// Errors raised by the profile store
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProfileError {
    /// A profile with this id already exists
    #[error("Duplicate profile id: {0}")]
    DuplicateId(String),

    /// No profile with this id exists
    #[error("Profile not found: {0}")]
    NotFound(String),

    /// The profile is structurally invalid (empty host, port 0, ...)
    #[error("Invalid profile: {0}")]
    Invalid(String),

    /// The durable store could not be written
    #[error("Failed to persist profiles: {0}")]
    Persistence(String),

    /// The durable store exists but could not be decoded
    #[error("Profile store is corrupt: {0}")]
    Corrupt(String),
}

/// Everything a `connect` call can surface to its caller
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Transport-level failure
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Credential resolution failure
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Profile lookup failure
    #[error(transparent)]
    Profile(#[from] ProfileError),
}

impl SessionError {
    /// Returns true when the failure happened at the transport layer
    #[must_use]
    pub const fn is_connection_failure(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

/// Errors raised while loading or saving application settings
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The config directory could not be determined
    #[error("Could not determine configuration directory")]
    NoConfigDir,

    /// Settings file could not be parsed
    #[error("Failed to parse {path}: {reason}")]
    Parse {
        /// File that failed to parse
        path: String,
        /// Parser message
        reason: String,
    },

    /// Settings could not be serialized
    #[error("Failed to serialize settings: {0}")]
    Serialize(String),

    /// Filesystem failure
    #[error("IO error on {path}: {reason}")]
    Io {
        /// File or directory involved
        path: String,
        /// Underlying IO error text
        reason: String,
    },
}

/// Umbrella error for callers that want a single type
#[derive(Debug, Error)]
pub enum HostwatchError {
    /// Session or profile failure
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Sampler failure
    #[error(transparent)]
    Sampling(#[from] SamplingError),

    /// Settings failure
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Raw IO failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ProfileError> for HostwatchError {
    fn from(err: ProfileError) -> Self {
        Self::Session(SessionError::Profile(err))
    }
}

impl From<ConnectionError> for HostwatchError {
    fn from(err: ConnectionError) -> Self {
        Self::Session(SessionError::Connection(err))
    }
}

impl From<AuthError> for HostwatchError {
    fn from(err: AuthError) -> Self {
        Self::Session(SessionError::Auth(err))
    }
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Result type for profile store operations
pub type ProfileResult<T> = Result<T, ProfileError>;

/// Result type for settings operations
pub type ConfigResult<T> = Result<T, ConfigError>;
