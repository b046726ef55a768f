//! Application settings stored in `config.toml`

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::monitoring::{MAX_HISTORY_CAPACITY, SamplerSettings};
use crate::session::SessionSettings;
use crate::tracing::{TracingConfig, TracingLevel, TracingOutput};

/// Smallest accepted sampling interval
pub const MIN_INTERVAL_MS: u64 = 250;
/// Largest accepted sampling interval
pub const MAX_INTERVAL_MS: u64 = 60_000;

/// Top level of `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    /// `[monitoring]`
    #[serde(default)]
    pub monitoring: MonitoringSettings,
    /// `[connection]`
    #[serde(default)]
    pub connection: ConnectionSettings,
    /// `[logging]`
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl AppSettings {
    /// Sampler configuration with every value clamped to its valid range
    #[must_use]
    pub fn sampler_settings(&self) -> SamplerSettings {
        SamplerSettings::new(
            self.monitoring.effective_interval(),
            self.monitoring.effective_history_capacity(),
            self.monitoring.failure_threshold,
        )
    }

    /// Session manager configuration
    #[must_use]
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            connect_timeout: Duration::from_secs(self.connection.connect_timeout_secs.max(1)),
            sampler: self.sampler_settings(),
        }
    }
}

/// Metrics polling settings (`[monitoring]`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringSettings {
    /// Polling interval in milliseconds (250–60000, default: 3000)
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Samples kept per history (1–3600, default: 10)
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// Consecutive failed ticks before the session is marked `Error` (min 1, default: 3)
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
}

const fn default_interval_ms() -> u64 {
    3000
}

const fn default_history_capacity() -> usize {
    10
}

const fn default_failure_threshold() -> u32 {
    3
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            history_capacity: default_history_capacity(),
            failure_threshold: default_failure_threshold(),
        }
    }
}

impl MonitoringSettings {
    /// Returns the interval clamped to the valid range
    #[must_use]
    pub const fn effective_interval(&self) -> Duration {
        let ms = if self.interval_ms < MIN_INTERVAL_MS {
            MIN_INTERVAL_MS
        } else if self.interval_ms > MAX_INTERVAL_MS {
            MAX_INTERVAL_MS
        } else {
            self.interval_ms
        };
        Duration::from_millis(ms)
    }

    /// Returns the history capacity clamped to the valid range
    #[must_use]
    pub fn effective_history_capacity(&self) -> usize {
        self.history_capacity.clamp(1, MAX_HISTORY_CAPACITY)
    }
}

/// Transport settings (`[connection]`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Limit for opening a session, in seconds
    #[serde(default = "default_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Limit for a single remote command, in seconds
    #[serde(default = "default_timeout_secs")]
    pub exec_timeout_secs: u64,
    /// Refuse hosts whose key is not in `known_hosts`
    #[serde(default)]
    pub strict_host_key_checking: bool,
}

const fn default_timeout_secs() -> u64 {
    10
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_timeout_secs(),
            exec_timeout_secs: default_timeout_secs(),
            strict_host_key_checking: false,
        }
    }
}

/// `[logging]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default verbosity
    #[serde(default)]
    pub level: TracingLevel,
    /// Write logs to this file instead of stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Include thread ids in each line
    #[serde(default)]
    pub thread_ids: bool,
}

impl LoggingSettings {
    /// Subscriber configuration for these settings at `level`
    #[must_use]
    pub fn tracing_config(&self, level: TracingLevel) -> TracingConfig {
        let output = self
            .file
            .clone()
            .map_or(TracingOutput::Stderr, TracingOutput::File);
        TracingConfig::new()
            .with_level(level)
            .with_output(output)
            .with_thread_ids(self.thread_ids)
    }
}
