//! Property-based tests for rolling histories
//!
//! Histories keep the most recent N entries in order, and counter deltas
//! never go negative across a counter reset.

use chrono::{DateTime, Duration, Utc};
use hostwatch_core::models::NetworkStats;
use hostwatch_core::monitoring::{
    CpuSnapshot, HistoryRing, MetricsHistory, ParsedTelemetry, RawSample, counter_delta,
};
use proptest::prelude::*;

fn telemetry(rx: u64, tx: u64, mem_used: u64) -> ParsedTelemetry {
    ParsedTelemetry {
        cpu: CpuSnapshot::default(),
        memory_used: mem_used,
        memory_total: 1_000,
        load_avg: [0.0; 3],
        uptime: 0,
        process_count: 0,
        network: NetworkStats {
            bytes_sent: tx,
            bytes_recv: rx,
            packets_sent: 0,
            packets_recv: 0,
            interface: "eth0".to_string(),
        },
        disks: Vec::new(),
    }
}

fn at(seconds: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default() + Duration::seconds(seconds)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// A ring holds exactly the last `capacity` pushed values, oldest first.
    #[test]
    fn prop_ring_keeps_most_recent(
        values in prop::collection::vec(any::<u32>(), 0..64),
        capacity in 1usize..16,
    ) {
        let mut ring = HistoryRing::new(capacity);
        for v in &values {
            ring.push(*v);
        }

        let expected: Vec<u32> = values
            .iter()
            .skip(values.len().saturating_sub(capacity))
            .copied()
            .collect();
        prop_assert_eq!(ring.to_vec(), expected);
        prop_assert!(ring.len() <= capacity);
    }

    /// The delta is the difference for growing counters and the current
    /// value after a reset; it never exceeds the current value otherwise.
    #[test]
    fn prop_counter_delta_never_wraps(previous in any::<u64>(), current in any::<u64>()) {
        let delta = counter_delta(previous, current);
        if current >= previous {
            prop_assert_eq!(delta, current - previous);
        } else {
            prop_assert_eq!(delta, current);
        }
        prop_assert!(delta <= current);
    }

    /// Applying samples in any arrival order only ever merges strictly newer
    /// ones, so every history stays in timestamp order and bounded.
    #[test]
    fn prop_history_is_monotonic_and_bounded(
        offsets in prop::collection::vec(0i64..50, 1..40),
        capacity in 1usize..8,
    ) {
        let mut history = MetricsHistory::new(capacity);
        let mut newest: Option<i64> = None;

        for (i, offset) in offsets.iter().enumerate() {
            let rx = (i as u64) * 100;
            let sample = RawSample {
                taken_at: at(*offset),
                telemetry: telemetry(rx, rx * 2, 500),
            };
            let applied = history.apply(sample);

            let is_newer = newest.is_none_or(|n| *offset > n);
            prop_assert_eq!(applied.is_some(), is_newer);
            if is_newer {
                newest = Some(*offset);
            }

            if let Some(metrics) = applied {
                prop_assert!(metrics.cpu_history.len() <= capacity);
                prop_assert!(metrics.memory_history.len() <= capacity);
                prop_assert!(metrics.network_history.len() <= capacity);
                prop_assert!(metrics
                    .network_history
                    .windows(2)
                    .all(|w| w[0].timestamp < w[1].timestamp));
            }
        }
        prop_assert_eq!(history.last_applied(), newest.map(at));
    }
}
