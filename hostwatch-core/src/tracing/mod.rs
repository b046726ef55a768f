//! Structured logging setup and the span names used across the crate
//!
//! Library code only emits `tracing` events and spans. Binaries call
//! [`init_tracing`] once to install a subscriber.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static TRACING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Errors that can occur during tracing initialization
#[derive(Debug, Error)]
pub enum TracingError {
    /// The subscriber or filter could not be built
    #[error("Failed to initialize tracing: {0}")]
    InitializationFailed(String),

    /// Tracing already initialized
    #[error("Tracing has already been initialized")]
    AlreadyInitialized,

    /// The log file could not be created
    #[error("Failed to create log file: {0}")]
    FileCreationFailed(String),
}

/// Result type for tracing operations
pub type TracingResult<T> = Result<T, TracingError>;

/// Log verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TracingLevel {
    /// Only errors
    Error,
    /// Errors and warnings
    #[serde(alias = "warning")]
    Warn,
    /// Lifecycle events (default)
    #[default]
    Info,
    /// Per-tick sampler activity
    Debug,
    /// Everything
    Trace,
}

impl TracingLevel {
    /// Converts to the `tracing` crate's level
    #[must_use]
    pub const fn to_tracing_level(self) -> Level {
        match self {
            Self::Error => Level::ERROR,
            Self::Warn => Level::WARN,
            Self::Info => Level::INFO,
            Self::Debug => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// Level selected by a `-v` count on top of `self`, saturating at trace
    #[must_use]
    pub const fn raised_by(self, steps: u8) -> Self {
        let mut level = self;
        let mut remaining = steps;
        while remaining > 0 {
            level = match level {
                Self::Error => Self::Warn,
                Self::Warn => Self::Info,
                Self::Info => Self::Debug,
                Self::Debug | Self::Trace => Self::Trace,
            };
            remaining -= 1;
        }
        level
    }
}

impl std::str::FromStr for TracingLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for TracingLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warn => write!(f, "warn"),
            Self::Info => write!(f, "info"),
            Self::Debug => write!(f, "debug"),
            Self::Trace => write!(f, "trace"),
        }
    }
}

/// Where log lines go
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TracingOutput {
    /// Standard output
    Stdout,
    /// Standard error
    #[default]
    Stderr,
    /// A file, truncated on start
    File(PathBuf),
}

/// Configuration for tracing initialization
#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// Log level
    pub level: TracingLevel,
    /// Output destination
    pub output: TracingOutput,
    /// Include thread ids in each line
    pub thread_ids: bool,
    /// Custom `EnvFilter` directive; overrides `level` when set
    pub filter: Option<String>,
}

impl TracingConfig {
    /// Creates a configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the log level
    #[must_use]
    pub const fn with_level(mut self, level: TracingLevel) -> Self {
        self.level = level;
        self
    }

    /// Sets the output destination
    #[must_use]
    pub fn with_output(mut self, output: TracingOutput) -> Self {
        self.output = output;
        self
    }

    /// Enables thread ids
    #[must_use]
    pub const fn with_thread_ids(mut self, enabled: bool) -> Self {
        self.thread_ids = enabled;
        self
    }

    /// Sets a custom filter string
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Filter directive used when no custom filter is set.
    ///
    /// `RUST_LOG` wins over both when present.
    fn directive(&self) -> String {
        self.filter.clone().unwrap_or_else(|| {
            format!(
                "hostwatch_core={level},hostwatch_cli={level},warn",
                level = self.level
            )
        })
    }
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns an error if tracing was already initialized, the filter is
/// malformed, or the log file cannot be created.
pub fn init_tracing(config: &TracingConfig) -> TracingResult<()> {
    if TRACING_INITIALIZED.swap(true, Ordering::SeqCst) {
        return Err(TracingError::AlreadyInitialized);
    }

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.directive())
            .map_err(|e| TracingError::InitializationFailed(e.to_string()))?,
    };

    let layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_thread_ids(config.thread_ids);

    match &config.output {
        TracingOutput::Stdout => tracing_subscriber::registry()
            .with(filter)
            .with(layer.with_writer(std::io::stdout))
            .try_init(),
        TracingOutput::Stderr => tracing_subscriber::registry()
            .with(filter)
            .with(layer.with_writer(std::io::stderr))
            .try_init(),
        TracingOutput::File(path) => {
            let file = std::fs::File::create(path)
                .map_err(|e| TracingError::FileCreationFailed(e.to_string()))?;
            tracing_subscriber::registry()
                .with(filter)
                .with(layer.with_ansi(false).with_writer(std::sync::Mutex::new(file)))
                .try_init()
        }
    }
    .map_err(|e| TracingError::InitializationFailed(e.to_string()))?;

    tracing::debug!(level = %config.level, "Tracing initialized");
    Ok(())
}

/// Checks if tracing has been initialized
#[must_use]
pub fn is_tracing_initialized() -> bool {
    TRACING_INITIALIZED.load(Ordering::SeqCst)
}

/// Standard span names
pub mod span_names {
    /// Opening a session
    pub const SESSION_CONNECT: &str = "session.connect";
    /// Closing a session
    pub const SESSION_DISCONNECT: &str = "session.disconnect";
    /// Startup reconnect pass
    pub const SESSION_STARTUP: &str = "session.startup";
    /// Turning an auth method into a credential
    pub const CREDENTIAL_RESOLVE: &str = "credential.resolve";
    /// One sampler tick
    pub const SAMPLER_TICK: &str = "sampler.tick";
    /// Loading the profile store
    pub const PROFILES_LOAD: &str = "profiles.load";
    /// Writing the profile store
    pub const PROFILES_SAVE: &str = "profiles.save";
    /// Loading settings
    pub const CONFIG_LOAD: &str = "config.load";
}
