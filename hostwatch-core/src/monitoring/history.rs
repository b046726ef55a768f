//! Bounded rolling histories and the per-session aggregation built on them

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::models::{NetworkHistoryPoint, NetworkStats, SystemMetrics, percent_of};

use super::metrics::CpuSnapshot;
use super::parser::ParsedTelemetry;

/// Fixed-capacity FIFO; pushing into a full ring evicts the oldest entry
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRing<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> HistoryRing<T> {
    /// Creates a ring holding at most `capacity` entries (at least 1).
    /// Storage grows as entries arrive.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Appends `value`, evicting the oldest entry when full
    pub fn push(&mut self, value: T) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(value);
    }

    /// Entries, oldest first
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the ring is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Maximum number of entries
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Bytes moved between two readings of a cumulative counter.
///
/// A decrease means the counter was reset (interface restart or wrap), so
/// everything counted since the reset is the current value.
#[must_use]
pub const fn counter_delta(previous: u64, current: u64) -> u64 {
    if current >= previous {
        current - previous
    } else {
        current
    }
}

/// One successfully parsed sample with the time it completed
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    /// Completion time; samples are applied in strictly increasing order
    pub taken_at: DateTime<Utc>,
    /// Parsed counters
    pub telemetry: ParsedTelemetry,
}

/// Rolling state of one session: previous counters plus the three histories
#[derive(Debug, Clone)]
pub struct MetricsHistory {
    cpu: HistoryRing<f64>,
    memory: HistoryRing<f64>,
    network: HistoryRing<NetworkHistoryPoint>,
    prev_cpu: Option<CpuSnapshot>,
    prev_net: Option<NetworkStats>,
    last_applied: Option<DateTime<Utc>>,
}

impl MetricsHistory {
    /// Creates empty histories of `capacity` entries each
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            cpu: HistoryRing::new(capacity),
            memory: HistoryRing::new(capacity),
            network: HistoryRing::new(capacity),
            prev_cpu: None,
            prev_net: None,
            last_applied: None,
        }
    }

    /// Timestamp of the last applied sample
    #[must_use]
    pub const fn last_applied(&self) -> Option<DateTime<Utc>> {
        self.last_applied
    }

    /// Folds `sample` into the histories and returns the merged snapshot.
    ///
    /// Returns `None` and changes nothing if the sample is not newer than
    /// the last applied one.
    pub fn apply(&mut self, sample: RawSample) -> Option<SystemMetrics> {
        if let Some(last) = self.last_applied
            && sample.taken_at <= last
        {
            tracing::debug!(
                taken_at = %sample.taken_at,
                last_applied = %last,
                "Discarding out-of-order sample"
            );
            return None;
        }

        let telemetry = sample.telemetry;

        let cpu_percent = self.prev_cpu.as_ref().map_or_else(
            || telemetry.cpu.cpu_percent_since_boot(),
            |prev| telemetry.cpu.cpu_percent_since(prev),
        );
        self.cpu.push(cpu_percent);
        self.memory
            .push(percent_of(telemetry.memory_used, telemetry.memory_total));

        // The first sample has nothing to diff against
        if let Some(prev) = &self.prev_net {
            let current = &telemetry.network;
            let point = if prev.interface == current.interface {
                NetworkHistoryPoint {
                    timestamp: sample.taken_at,
                    bytes_sent: counter_delta(prev.bytes_sent, current.bytes_sent),
                    bytes_recv: counter_delta(prev.bytes_recv, current.bytes_recv),
                }
            } else {
                // Different interface: its counters start a new series
                NetworkHistoryPoint {
                    timestamp: sample.taken_at,
                    bytes_sent: current.bytes_sent,
                    bytes_recv: current.bytes_recv,
                }
            };
            self.network.push(point);
        }

        self.prev_cpu = Some(telemetry.cpu);
        self.prev_net = Some(telemetry.network.clone());
        self.last_applied = Some(sample.taken_at);

        Some(SystemMetrics {
            cpu_percent,
            memory_used: telemetry.memory_used,
            memory_total: telemetry.memory_total,
            disk_usage: telemetry.disks,
            load_avg: telemetry.load_avg,
            uptime: telemetry.uptime,
            process_count: telemetry.process_count,
            network: telemetry.network,
            cpu_history: self.cpu.to_vec(),
            memory_history: self.memory.to_vec(),
            network_history: self.network.to_vec(),
        })
    }
}
