//! Session transport seam
//!
//! [`Connector`] opens an authenticated channel to a host; the resulting
//! [`Transport`] runs shell commands on it. The session manager owns the one
//! live transport, the sampler only borrows it per tick.

mod ssh;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::auth::Credential;
use crate::error::ConnectionError;
use crate::models::ServerProfile;

pub use ssh::{SshConnector, SshOptions, SshTransport};

/// Errors raised by a single command on an open transport
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The command did not finish in time
    #[error("Command timed out after {0}s")]
    Timeout(u64),

    /// The command could not be run or exited unsuccessfully
    #[error("Command failed: {0}")]
    Failed(String),

    /// The transport was already closed
    #[error("Transport is closed")]
    Closed,
}

/// Where a transport connects to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectTarget {
    /// Hostname or IP address
    pub host: String,
    /// SSH port
    pub port: u16,
    /// Remote user name
    pub username: String,
}

impl ConnectTarget {
    /// `user@host`
    #[must_use]
    pub fn destination(&self) -> String {
        format!("{}@{}", self.username, self.host)
    }
}

impl From<&ServerProfile> for ConnectTarget {
    fn from(profile: &ServerProfile) -> Self {
        Self {
            host: profile.host.clone(),
            port: profile.port,
            username: profile.username.clone(),
        }
    }
}

/// Opens transports
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens and authenticates a transport.
    ///
    /// The credential is consumed so it is dropped when the attempt ends.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::AuthFailed`], [`ConnectionError::HostUnreachable`]
    /// or [`ConnectionError::Timeout`].
    async fn open(
        &self,
        target: &ConnectTarget,
        credential: Credential,
    ) -> Result<Arc<dyn Transport>, ConnectionError>;
}

/// An open, authenticated channel to one host
#[async_trait]
pub trait Transport: Send + Sync {
    /// Runs `command` in a remote shell and returns its stdout
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the command cannot be run, fails or
    /// times out.
    async fn exec(&self, command: &str) -> Result<String, TransportError>;

    /// Releases the channel. Calling it more than once is harmless.
    async fn close(&self);

    /// The host this transport is connected to
    fn target(&self) -> &ConnectTarget;
}
