//! Parser for remote telemetry output
//!
//! [`METRICS_COMMAND`] gathers everything in one round trip; marker lines
//! split the output so a misbehaving section cannot bleed into the next.

use crate::error::SamplingError;
use crate::models::{DiskUsage, NetworkStats};

use super::metrics::{CpuSnapshot, SystemInfo};

/// Shell command that collects one telemetry sample.
pub const METRICS_COMMAND: &str = concat!(
    "echo '---HOSTWATCH_PROC_STAT---';",
    "head -1 /proc/stat;",
    "echo '---HOSTWATCH_MEMINFO---';",
    "grep -E '^(MemTotal|MemAvailable|MemFree|Buffers|Cached):' /proc/meminfo;",
    "echo '---HOSTWATCH_LOADAVG---';",
    "cat /proc/loadavg;",
    "echo '---HOSTWATCH_UPTIME---';",
    "cat /proc/uptime;",
    "echo '---HOSTWATCH_PROCS---';",
    "ls -d /proc/[0-9]* 2>/dev/null | wc -l;",
    "echo '---HOSTWATCH_ROUTE---';",
    "cat /proc/net/route 2>/dev/null;",
    "echo '---HOSTWATCH_NET_DEV---';",
    "tail -n +3 /proc/net/dev;",
    "echo '---HOSTWATCH_DF---';",
    "df -P -B1 2>/dev/null | tail -n +2;",
    "echo '---HOSTWATCH_END---'",
);

/// Shell command that collects static host facts (run once per session).
pub const SYSTEM_INFO_COMMAND: &str = concat!(
    "echo '---HOSTWATCH_UNAME---';",
    "uname -r;",
    "echo '---HOSTWATCH_OSRELEASE---';",
    "cat /etc/os-release 2>/dev/null;",
    "echo '---HOSTWATCH_HWINFO---';",
    "echo 'CPUTHREADS='$(grep -c '^processor' /proc/cpuinfo);",
    "echo 'CPUCORES='$(grep '^cpu cores' /proc/cpuinfo | head -1 | awk '{print $NF}');",
    "echo 'ARCH='$(uname -m);",
    "echo '---HOSTWATCH_SYSINFO_END---'",
);

/// Raw values from one run of [`METRICS_COMMAND`]
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTelemetry {
    /// CPU counters (for delta calculation)
    pub cpu: CpuSnapshot,
    /// Used memory in bytes
    pub memory_used: u64,
    /// Total memory in bytes
    pub memory_total: u64,
    /// 1, 5 and 15 minute load averages
    pub load_avg: [f64; 3],
    /// Uptime in seconds
    pub uptime: u64,
    /// Number of processes
    pub process_count: u32,
    /// Cumulative counters of the primary interface
    pub network: NetworkStats,
    /// Mounted filesystems under `/`
    pub disks: Vec<DiskUsage>,
}

fn parse_error(msg: impl Into<String>) -> SamplingError {
    SamplingError::Transient(msg.into())
}

/// Stateless parser for remote telemetry output
pub struct MetricsParser;

impl MetricsParser {
    /// Parses the combined output of [`METRICS_COMMAND`].
    ///
    /// Load average, uptime, process count and disks fall back to zero or
    /// empty values when their section is missing.
    ///
    /// # Errors
    ///
    /// Returns [`SamplingError::Transient`] if the CPU, memory or network
    /// section is missing or unparseable.
    pub fn parse(output: &str) -> Result<ParsedTelemetry, SamplingError> {
        let cpu = Self::parse_proc_stat(output)?;
        let (memory_used, memory_total) = Self::parse_meminfo(output)?;
        let network = Self::parse_network(output)?;

        let (load_avg, loadavg_procs) = Self::parse_loadavg(output).unwrap_or_default();
        let process_count = Self::section(output, "---HOSTWATCH_PROCS---", "---HOSTWATCH_ROUTE---")
            .and_then(|s| s.trim().parse::<u32>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(loadavg_procs);

        Ok(ParsedTelemetry {
            cpu,
            memory_used,
            memory_total,
            load_avg,
            uptime: Self::parse_uptime(output).unwrap_or(0),
            process_count,
            network,
            disks: Self::parse_df(output),
        })
    }

    /// Extracts text between two marker lines
    fn section<'a>(output: &'a str, start: &str, end: &str) -> Option<&'a str> {
        let start_idx = output.find(start).map(|i| i + start.len())?;
        let end_idx = output[start_idx..].find(end).map(|i| start_idx + i)?;
        Some(output[start_idx..end_idx].trim())
    }

    /// Parses the aggregate `cpu` line of `/proc/stat`.
    ///
    /// Format: `cpu  user nice system idle iowait irq softirq steal ...`
    fn parse_proc_stat(output: &str) -> Result<CpuSnapshot, SamplingError> {
        let section = Self::section(output, "---HOSTWATCH_PROC_STAT---", "---HOSTWATCH_MEMINFO---")
            .ok_or_else(|| parse_error("Missing /proc/stat section"))?;

        let line = section
            .lines()
            .find(|l| l.starts_with("cpu "))
            .ok_or_else(|| parse_error("No aggregate cpu line in /proc/stat"))?;

        let fields: Vec<u64> = line
            .split_whitespace()
            .skip(1)
            .map(|v| v.parse().unwrap_or(0))
            .collect();
        if fields.len() < 4 {
            return Err(parse_error("Too few fields in /proc/stat cpu line"));
        }
        let field = |i: usize| fields.get(i).copied().unwrap_or(0);

        Ok(CpuSnapshot {
            user: field(0),
            nice: field(1),
            system: field(2),
            idle: field(3),
            iowait: field(4),
            irq: field(5),
            softirq: field(6),
            steal: field(7),
        })
    }

    /// Returns `(used, total)` in bytes from `/proc/meminfo`
    fn parse_meminfo(output: &str) -> Result<(u64, u64), SamplingError> {
        let section = Self::section(output, "---HOSTWATCH_MEMINFO---", "---HOSTWATCH_LOADAVG---")
            .ok_or_else(|| parse_error("Missing /proc/meminfo section"))?;

        let mut total = 0;
        let mut available = None;
        let mut free = 0;
        let mut buffers = 0;
        let mut cached = 0;

        for line in section.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let kib = Self::parse_kib_value(value);
            match key.trim() {
                "MemTotal" => total = kib,
                "MemAvailable" => available = Some(kib),
                "MemFree" => free = kib,
                "Buffers" => buffers = kib,
                "Cached" => cached = kib,
                _ => {}
            }
        }

        if total == 0 {
            return Err(parse_error("MemTotal not found in /proc/meminfo"));
        }

        // Old kernels lack MemAvailable
        let available = available.unwrap_or_else(|| free.saturating_add(buffers).saturating_add(cached));
        let used = total.saturating_sub(available);
        Ok((used.saturating_mul(1024), total.saturating_mul(1024)))
    }

    /// Parses a value like `  16384000 kB` into KiB
    fn parse_kib_value(s: &str) -> u64 {
        s.split_whitespace()
            .next()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    /// Parses `/proc/loadavg`: `0.52 0.34 0.28 2/1234 56789`
    fn parse_loadavg(output: &str) -> Option<([f64; 3], u32)> {
        let section = Self::section(output, "---HOSTWATCH_LOADAVG---", "---HOSTWATCH_UPTIME---")?;
        let parts: Vec<&str> = section.split_whitespace().collect();
        if parts.len() < 3 {
            return None;
        }
        let load = |i: usize| parts[i].parse::<f64>().unwrap_or(0.0);
        let total_procs = parts
            .get(3)
            .and_then(|p| p.split_once('/'))
            .and_then(|(_, total)| total.parse().ok())
            .unwrap_or(0);
        Some(([load(0), load(1), load(2)], total_procs))
    }

    /// Parses `/proc/uptime`: `12345.67 54321.00`
    fn parse_uptime(output: &str) -> Option<u64> {
        Self::section(output, "---HOSTWATCH_UPTIME---", "---HOSTWATCH_PROCS---")?
            .split_whitespace()
            .next()?
            .parse::<f64>()
            .ok()
            .map(|secs| secs.max(0.0) as u64)
    }

    /// Interface carrying the default route, from `/proc/net/route`
    fn default_route_interface(output: &str) -> Option<&str> {
        Self::section(output, "---HOSTWATCH_ROUTE---", "---HOSTWATCH_NET_DEV---")?
            .lines()
            .skip(1)
            .find_map(|line| {
                let mut parts = line.split_whitespace();
                let iface = parts.next()?;
                (parts.next()? == "00000000").then_some(iface)
            })
    }

    /// Picks the primary interface from `/proc/net/dev`: the default-route
    /// interface, else the first non-loopback one, else loopback.
    fn parse_network(output: &str) -> Result<NetworkStats, SamplingError> {
        let section = Self::section(output, "---HOSTWATCH_NET_DEV---", "---HOSTWATCH_DF---")
            .ok_or_else(|| parse_error("Missing /proc/net/dev section"))?;

        let interfaces: Vec<NetworkStats> = section
            .lines()
            .filter_map(|line| {
                let (iface, stats) = line.trim().split_once(':')?;
                let parts: Vec<u64> = stats
                    .split_whitespace()
                    .map(|v| v.parse().unwrap_or(0))
                    .collect();
                if parts.len() < 10 {
                    return None;
                }
                Some(NetworkStats {
                    bytes_recv: parts[0],
                    packets_recv: parts[1],
                    bytes_sent: parts[8],
                    packets_sent: parts[9],
                    interface: iface.trim().to_string(),
                })
            })
            .collect();

        let default_iface = Self::default_route_interface(output);
        default_iface
            .and_then(|name| interfaces.iter().find(|i| i.interface == name))
            .or_else(|| interfaces.iter().find(|i| i.interface != "lo"))
            .or_else(|| interfaces.first())
            .cloned()
            .ok_or_else(|| parse_error("No network interface in /proc/net/dev"))
    }

    /// Parses `df -P -B1` rows, keeping mounts under `/`.
    ///
    /// Format: `Filesystem  1-blocks  Used  Available  Capacity  Mounted on`
    fn parse_df(output: &str) -> Vec<DiskUsage> {
        let Some(section) = Self::section(output, "---HOSTWATCH_DF---", "---HOSTWATCH_END---")
        else {
            return Vec::new();
        };

        section
            .lines()
            .filter_map(|line| {
                let parts: Vec<&str> = line.split_whitespace().collect();
                if parts.len() < 6 {
                    return None;
                }
                let mount_point = parts[5..].join(" ");
                if !mount_point.starts_with('/') {
                    return None;
                }
                let total = parts[1].parse::<u64>().ok()?;
                let used = parts[2].parse::<u64>().ok()?;
                Some(DiskUsage::new(mount_point, used, total))
            })
            .collect()
    }

    /// Parses the output of [`SYSTEM_INFO_COMMAND`].
    ///
    /// # Errors
    ///
    /// Returns [`SamplingError::Transient`] if no section is present at all.
    pub fn parse_system_info(output: &str) -> Result<SystemInfo, SamplingError> {
        let kernel = Self::section(output, "---HOSTWATCH_UNAME---", "---HOSTWATCH_OSRELEASE---");
        let os_release = Self::section(output, "---HOSTWATCH_OSRELEASE---", "---HOSTWATCH_HWINFO---");
        let hwinfo = Self::section(output, "---HOSTWATCH_HWINFO---", "---HOSTWATCH_SYSINFO_END---");

        if kernel.is_none() && os_release.is_none() && hwinfo.is_none() {
            return Err(parse_error("System info output has no sections"));
        }
        let hwinfo = hwinfo.unwrap_or("");

        let cpu_threads = Self::extract_hwinfo_u16(hwinfo, "CPUTHREADS=");
        let cpu_cores = match Self::extract_hwinfo_u16(hwinfo, "CPUCORES=") {
            0 => cpu_threads,
            cores => cores,
        };

        Ok(SystemInfo {
            kernel_version: kernel.unwrap_or("").to_string(),
            distro_name: os_release
                .and_then(Self::extract_pretty_name)
                .unwrap_or_default(),
            arch: hwinfo
                .lines()
                .find_map(|l| l.strip_prefix("ARCH="))
                .unwrap_or("")
                .trim()
                .to_string(),
            cpu_cores,
            cpu_threads,
        })
    }

    fn extract_hwinfo_u16(hwinfo: &str, prefix: &str) -> u16 {
        hwinfo
            .lines()
            .find_map(|l| l.strip_prefix(prefix))
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }

    /// `PRETTY_NAME`, else `NAME VERSION`, from `/etc/os-release`
    fn extract_pretty_name(os_release: &str) -> Option<String> {
        let value = |key: &str| {
            os_release
                .lines()
                .find_map(|l| l.strip_prefix(key))
                .map(|v| v.trim_matches('"').to_string())
        };
        value("PRETTY_NAME=").or_else(|| {
            let name = value("NAME=")?;
            Some(value("VERSION=").map_or_else(|| name.clone(), |v| format!("{name} {v}")))
        })
    }
}
