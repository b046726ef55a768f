//! Server profile models

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ProfileError, ProfileResult};

/// Default SSH port
pub const DEFAULT_SSH_PORT: u16 = 22;

/// How a profile authenticates against its host.
///
/// Serialized with a `type` discriminator; exactly one variant is active.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthMethod {
    /// Password authentication
    Password {
        /// The password, used verbatim
        password: String,
    },
    /// Public key authentication
    PrivateKey {
        /// Path to the private key (may start with `~`)
        key_path: String,
        /// Passphrase for an encrypted key
        #[serde(default, skip_serializing_if = "Option::is_none")]
        passphrase: Option<String>,
    },
}

impl AuthMethod {
    /// Short lowercase name of the variant, safe for logs
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Password { .. } => "password",
            Self::PrivateKey { .. } => "private_key",
        }
    }
}

// Secrets never reach logs through `{:?}`
impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password { .. } => f
                .debug_struct("Password")
                .field("password", &"<redacted>")
                .finish(),
            Self::PrivateKey {
                key_path,
                passphrase,
            } => f
                .debug_struct("PrivateKey")
                .field("key_path", key_path)
                .field("passphrase", &passphrase.as_ref().map(|_| "<redacted>"))
                .finish(),
        }
    }
}

/// Connection target and credential descriptor of a managed host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerProfile {
    /// Opaque unique identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Hostname or IP address
    pub host: String,
    /// SSH port
    pub port: u16,
    /// Remote user name
    pub username: String,
    /// Authentication method
    pub auth_method: AuthMethod,
}

impl ServerProfile {
    /// Creates a profile with a freshly generated id
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        auth_method: AuthMethod,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            host: host.into(),
            port,
            username: username.into(),
            auth_method,
        }
    }

    /// Sets an explicit id
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// `user@host:port`, used in log lines and listings
    #[must_use]
    pub fn destination(&self) -> String {
        format!("{}@{}:{}", self.username, self.host, self.port)
    }

    /// Checks the structural invariants of a profile
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::Invalid`] when id, host or username is empty
    /// or the port is zero.
    pub fn validate(&self) -> ProfileResult<()> {
        if self.id.trim().is_empty() {
            return Err(ProfileError::Invalid("id must not be empty".to_string()));
        }
        if self.host.trim().is_empty() {
            return Err(ProfileError::Invalid("host must not be empty".to_string()));
        }
        if self.username.trim().is_empty() {
            return Err(ProfileError::Invalid(
                "username must not be empty".to_string(),
            ));
        }
        if self.port == 0 {
            return Err(ProfileError::Invalid("port must not be 0".to_string()));
        }
        if let AuthMethod::PrivateKey { key_path, .. } = &self.auth_method
            && key_path.trim().is_empty()
        {
            return Err(ProfileError::Invalid(
                "key_path must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// A profile as owned by the profile store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedServerProfile {
    /// The profile itself
    #[serde(flatten)]
    pub profile: ServerProfile,
    /// When the profile was added
    pub created_at: DateTime<Utc>,
    /// Last successful connect, written only by the session manager
    #[serde(default)]
    pub last_connected: Option<DateTime<Utc>>,
    /// Whether `reconnect_on_startup` considers this profile
    #[serde(default)]
    pub connect_on_startup: bool,
}

impl SavedServerProfile {
    /// Wraps a profile with fresh metadata
    #[must_use]
    pub fn new(profile: ServerProfile) -> Self {
        Self {
            profile,
            created_at: Utc::now(),
            last_connected: None,
            connect_on_startup: false,
        }
    }

    /// Sets the startup flag
    #[must_use]
    pub const fn with_connect_on_startup(mut self, enabled: bool) -> Self {
        self.connect_on_startup = enabled;
        self
    }

    /// Profile id
    #[must_use]
    pub fn id(&self) -> &str {
        &self.profile.id
    }

    /// Profile display name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.profile.name
    }
}

impl From<ServerProfile> for SavedServerProfile {
    fn from(profile: ServerProfile) -> Self {
        Self::new(profile)
    }
}

/// Partial update applied by `ProfileStore::update`.
///
/// `None` fields are left untouched. `created_at` and `last_connected`
/// are not patchable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    /// New display name
    pub name: Option<String>,
    /// New host
    pub host: Option<String>,
    /// New port
    pub port: Option<u16>,
    /// New user name
    pub username: Option<String>,
    /// New authentication method
    pub auth_method: Option<AuthMethod>,
    /// New startup flag
    pub connect_on_startup: Option<bool>,
}

impl ProfilePatch {
    /// Creates an empty patch
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Patches the name
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Patches the host
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Patches the port
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Patches the user name
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Patches the authentication method
    #[must_use]
    pub fn auth_method(mut self, auth_method: AuthMethod) -> Self {
        self.auth_method = Some(auth_method);
        self
    }

    /// Patches the startup flag
    #[must_use]
    pub const fn connect_on_startup(mut self, enabled: bool) -> Self {
        self.connect_on_startup = Some(enabled);
        self
    }

    /// Returns true if the patch changes nothing
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.host.is_none()
            && self.port.is_none()
            && self.username.is_none()
            && self.auth_method.is_none()
            && self.connect_on_startup.is_none()
    }

    /// Applies the patch in place
    pub fn apply_to(self, saved: &mut SavedServerProfile) {
        let profile = &mut saved.profile;
        if let Some(name) = self.name {
            profile.name = name;
        }
        if let Some(host) = self.host {
            profile.host = host;
        }
        if let Some(port) = self.port {
            profile.port = port;
        }
        if let Some(username) = self.username {
            profile.username = username;
        }
        if let Some(auth_method) = self.auth_method {
            profile.auth_method = auth_method;
        }
        if let Some(enabled) = self.connect_on_startup {
            saved.connect_on_startup = enabled;
        }
    }
}
