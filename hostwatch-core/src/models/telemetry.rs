//! Telemetry snapshot models shared with the presentation layer
//!
//! These are the wire shapes the facade publishes. Raw counters used for
//! delta computation live in `monitoring`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cumulative network counters of one interface.
///
/// Counters only grow while the interface is up; a decrease means the
/// interface was restarted or the counter wrapped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkStats {
    /// Total bytes sent
    pub bytes_sent: u64,
    /// Total bytes received
    pub bytes_recv: u64,
    /// Total packets sent
    pub packets_sent: u64,
    /// Total packets received
    pub packets_recv: u64,
    /// Interface name (e.g. `eth0`)
    pub interface: String,
}

/// Per-interval network traffic, derived from two consecutive [`NetworkStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkHistoryPoint {
    /// When the later of the two samples was taken
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// Bytes sent during the interval
    pub bytes_sent: u64,
    /// Bytes received during the interval
    pub bytes_recv: u64,
}

/// Usage of one mounted filesystem.
///
/// `percent` is always derived from `used / total`; any value found in a
/// serialized form is ignored and recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "DiskUsageRepr")]
pub struct DiskUsage {
    /// Mount point (e.g. `/`, `/var`)
    pub mount_point: String,
    /// Used bytes
    pub used: u64,
    /// Total bytes
    pub total: u64,
    /// `used / total` as a percentage (0.0–100.0)
    pub percent: f64,
}

#[derive(Deserialize)]
struct DiskUsageRepr {
    mount_point: String,
    used: u64,
    total: u64,
}

impl From<DiskUsageRepr> for DiskUsage {
    fn from(repr: DiskUsageRepr) -> Self {
        Self::new(repr.mount_point, repr.used, repr.total)
    }
}

impl DiskUsage {
    /// Creates an entry, computing `percent`
    #[must_use]
    pub fn new(mount_point: impl Into<String>, used: u64, total: u64) -> Self {
        Self {
            mount_point: mount_point.into(),
            used,
            total,
            percent: percent_of(used, total),
        }
    }
}

/// `part / whole` as a percentage, 0 when `whole` is 0
#[must_use]
pub fn percent_of(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64) * 100.0
}

/// Latest host snapshot plus the bounded rolling histories
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemMetrics {
    /// CPU busy share (0.0–100.0)
    pub cpu_percent: f64,
    /// Used memory in bytes
    pub memory_used: u64,
    /// Total memory in bytes
    pub memory_total: u64,
    /// Per-mount disk usage
    pub disk_usage: Vec<DiskUsage>,
    /// 1, 5 and 15 minute load averages
    pub load_avg: [f64; 3],
    /// Uptime in seconds
    pub uptime: u64,
    /// Number of processes
    pub process_count: u32,
    /// Cumulative counters of the primary interface
    pub network: NetworkStats,
    /// Recent CPU percentages, oldest first
    pub cpu_history: Vec<f64>,
    /// Recent memory usage percentages, oldest first
    pub memory_history: Vec<f64>,
    /// Recent per-interval network traffic, oldest first
    pub network_history: Vec<NetworkHistoryPoint>,
}

impl SystemMetrics {
    /// Memory usage as a percentage (0.0–100.0)
    #[must_use]
    pub fn memory_percent(&self) -> f64 {
        percent_of(self.memory_used, self.memory_total)
    }
}

/// Outcome of a connect or connection test, as shown to a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionResult {
    /// Whether the attempt succeeded
    pub success: bool,
    /// Human readable message
    pub message: String,
    /// The failure, if any
    pub error: Option<crate::error::SessionError>,
}

impl ConnectionResult {
    /// Successful result with a message
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            error: None,
        }
    }

    /// Failed result carrying the error
    #[must_use]
    pub fn failed(error: crate::error::SessionError) -> Self {
        Self {
            success: false,
            message: error.to_string(),
            error: Some(error),
        }
    }
}

impl<T> From<Result<T, crate::error::SessionError>> for ConnectionResult {
    fn from(result: Result<T, crate::error::SessionError>) -> Self {
        match result {
            Ok(_) => Self::ok("Connected successfully"),
            Err(e) => Self::failed(e),
        }
    }
}
