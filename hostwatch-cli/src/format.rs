//! Human readable rendering of sizes, rates and percentages.

use std::fmt::Write as _;

use hostwatch_core::models::{NetworkHistoryPoint, SystemMetrics};

const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

/// Formats a byte count with a binary unit, e.g. `1.5 GiB`
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

/// Formats seconds as `3d 4h 5m`
#[must_use]
pub fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Ten-cell bar for a percentage
#[must_use]
pub fn percent_bar(percent: f64) -> String {
    let filled = (percent.clamp(0.0, 100.0) / 10.0).round() as usize;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(10 - filled))
}

/// Multi-line table view of one snapshot
#[must_use]
pub fn format_metrics(metrics: &SystemMetrics) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "CPU     {} {:5.1}%   load {:.2} {:.2} {:.2}",
        percent_bar(metrics.cpu_percent),
        metrics.cpu_percent,
        metrics.load_avg[0],
        metrics.load_avg[1],
        metrics.load_avg[2]
    );
    let _ = writeln!(
        out,
        "Memory  {} {:5.1}%   {} / {}",
        percent_bar(metrics.memory_percent()),
        metrics.memory_percent(),
        format_bytes(metrics.memory_used),
        format_bytes(metrics.memory_total)
    );
    match metrics.network_history.last() {
        Some(point) => {
            let _ = writeln!(
                out,
                "Network {}   {}",
                metrics.network.interface,
                format_traffic(point)
            );
        }
        None => {
            let _ = writeln!(out, "Network {}   (collecting)", metrics.network.interface);
        }
    }
    for disk in &metrics.disk_usage {
        let _ = writeln!(
            out,
            "Disk    {} {:5.1}%   {} ({} / {})",
            percent_bar(disk.percent),
            disk.percent,
            disk.mount_point,
            format_bytes(disk.used),
            format_bytes(disk.total)
        );
    }
    let _ = write!(
        out,
        "Uptime  {}   {} processes",
        format_uptime(metrics.uptime),
        metrics.process_count
    );
    out
}

fn format_traffic(point: &NetworkHistoryPoint) -> String {
    format!(
        "tx {}  rx {}",
        format_bytes(point.bytes_sent),
        format_bytes(point.bytes_recv)
    )
}
