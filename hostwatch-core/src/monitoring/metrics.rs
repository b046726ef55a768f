//! Raw counters read from the remote host
//!
//! These feed the delta computations in [`super::MetricsHistory`]; the
//! published shapes live in [`crate::models`].

use serde::{Deserialize, Serialize};

/// Raw CPU counters from `/proc/stat` for delta calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuSnapshot {
    /// Total user time (jiffies)
    pub user: u64,
    /// Total nice time (jiffies)
    pub nice: u64,
    /// Total system time (jiffies)
    pub system: u64,
    /// Total idle time (jiffies)
    pub idle: u64,
    /// Total iowait time (jiffies)
    pub iowait: u64,
    /// Total irq time (jiffies)
    pub irq: u64,
    /// Total softirq time (jiffies)
    pub softirq: u64,
    /// Total steal time (jiffies)
    pub steal: u64,
}

impl CpuSnapshot {
    /// Total jiffies across all states
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.user
            .saturating_add(self.nice)
            .saturating_add(self.system)
            .saturating_add(self.idle)
            .saturating_add(self.iowait)
            .saturating_add(self.irq)
            .saturating_add(self.softirq)
            .saturating_add(self.steal)
    }

    /// Idle jiffies (idle + iowait)
    #[must_use]
    pub const fn idle_total(&self) -> u64 {
        self.idle.saturating_add(self.iowait)
    }

    /// Busy share between two snapshots (0.0–100.0)
    #[must_use]
    pub fn cpu_percent_since(&self, prev: &Self) -> f64 {
        let total_delta = self.total().saturating_sub(prev.total());
        if total_delta == 0 {
            return 0.0;
        }
        let idle_delta = self.idle_total().saturating_sub(prev.idle_total());
        let busy_delta = total_delta.saturating_sub(idle_delta);
        (busy_delta as f64 / total_delta as f64) * 100.0
    }

    /// Busy share since boot, used before a second snapshot exists
    #[must_use]
    pub fn cpu_percent_since_boot(&self) -> f64 {
        self.cpu_percent_since(&Self::default())
    }
}

/// Static host facts, fetched once per session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    /// Kernel release (e.g. "6.8.0-45-generic")
    pub kernel_version: String,
    /// Distribution name (e.g. "Ubuntu 24.04.1 LTS")
    pub distro_name: String,
    /// CPU architecture (e.g. "x86_64")
    pub arch: String,
    /// Physical cores
    pub cpu_cores: u16,
    /// Logical CPUs
    pub cpu_threads: u16,
}
