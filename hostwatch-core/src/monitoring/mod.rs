//! Remote host telemetry
//!
//! A [`MetricsSampler`] polls the active session with [`METRICS_COMMAND`],
//! [`MetricsParser`] turns the output into raw counters and
//! [`MetricsHistory`] derives percentages, network deltas and the bounded
//! rolling histories published as [`crate::models::SystemMetrics`].

mod history;
mod metrics;
mod parser;
mod sampler;
mod settings;

pub use history::{HistoryRing, MetricsHistory, RawSample, counter_delta};
pub use metrics::{CpuSnapshot, SystemInfo};
pub use parser::{METRICS_COMMAND, MetricsParser, ParsedTelemetry, SYSTEM_INFO_COMMAND};
pub use sampler::{MetricsSampler, SampleTarget};
pub use settings::{MAX_HISTORY_CAPACITY, SamplerSettings};
