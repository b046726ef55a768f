//! Periodic telemetry polling
//!
//! The sampler runs on its own task and reaches the session only through a
//! [`SampleTarget`]. It owns the rolling histories of the session it was
//! started for; stopping it drops them.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::Instrument;

use crate::error::SamplingError;
use crate::models::SystemMetrics;

use super::history::{MetricsHistory, RawSample};
use super::metrics::SystemInfo;
use super::parser::{METRICS_COMMAND, MetricsParser, SYSTEM_INFO_COMMAND};
use super::settings::SamplerSettings;

/// The session a sampler polls
#[async_trait]
pub trait SampleTarget: Send + Sync + 'static {
    /// Runs `command` on the session transport.
    ///
    /// # Errors
    ///
    /// Returns [`SamplingError::Detached`] once the session is gone, or
    /// [`SamplingError::Transient`] for a failed round trip.
    async fn fetch(&self, command: &str) -> Result<String, SamplingError>;

    /// Publishes a merged snapshot. Returns `false` if the session is gone
    /// and the snapshot was discarded.
    fn publish(&self, metrics: SystemMetrics) -> bool;

    /// Publishes static host facts
    fn publish_system_info(&self, info: SystemInfo);

    /// Reports that the failure threshold was reached
    fn escalate(&self, error: SamplingError);
}

/// Handle to the polling task of one session
#[derive(Debug)]
pub struct MetricsSampler {
    settings: SamplerSettings,
    task: Option<JoinHandle<()>>,
}

impl MetricsSampler {
    /// Creates a stopped sampler
    #[must_use]
    pub const fn new(settings: SamplerSettings) -> Self {
        Self {
            settings,
            task: None,
        }
    }

    /// Settings in use
    #[must_use]
    pub const fn settings(&self) -> &SamplerSettings {
        &self.settings
    }

    /// Returns true while the polling task is alive
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Starts polling `target` every `settings.interval`; the first tick
    /// fires immediately. No-op while already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, target: Arc<dyn SampleTarget>) {
        if self.is_running() {
            return;
        }
        self.task = Some(tokio::spawn(run(self.settings, target)));
    }

    /// Stops polling. Takes effect before returning: the task never runs
    /// another tick, and a tick in flight is dropped at its next await.
    /// No-op when already stopped.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for MetricsSampler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run(settings: SamplerSettings, target: Arc<dyn SampleTarget>) {
    let mut ticker = tokio::time::interval(settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut history = MetricsHistory::new(settings.history_capacity);
    let mut consecutive_errors: u32 = 0;
    let mut sysinfo_fetched = false;

    loop {
        ticker.tick().await;
        let span = tracing::trace_span!(
            crate::tracing::span_names::SAMPLER_TICK,
            failures = consecutive_errors
        );

        // Static facts once per session, best effort
        if !sysinfo_fetched {
            sysinfo_fetched = true;
            match target
                .fetch(SYSTEM_INFO_COMMAND)
                .instrument(span.clone())
                .await
            {
                Ok(output) => {
                    if let Ok(info) = MetricsParser::parse_system_info(&output) {
                        target.publish_system_info(info);
                    }
                }
                Err(SamplingError::Detached) => break,
                Err(err) => tracing::debug!(error = %err, "System info unavailable"),
            }
        }

        let result = match target.fetch(METRICS_COMMAND).instrument(span).await {
            Ok(output) => MetricsParser::parse(&output),
            Err(err) => Err(err),
        };

        match result {
            Ok(telemetry) => {
                consecutive_errors = 0;
                let sample = RawSample {
                    taken_at: Utc::now(),
                    telemetry,
                };
                if let Some(metrics) = history.apply(sample)
                    && !target.publish(metrics)
                {
                    break; // session gone
                }
            }
            Err(SamplingError::Detached) => break,
            Err(err) => {
                consecutive_errors += 1;
                tracing::debug!(
                    error = %err,
                    attempt = consecutive_errors,
                    "Sampling tick failed"
                );
                if consecutive_errors >= settings.failure_threshold {
                    tracing::warn!(
                        failures = consecutive_errors,
                        last_error = %err,
                        "Sampling stopped after consecutive failures"
                    );
                    target.escalate(SamplingError::Fatal {
                        failures: consecutive_errors,
                        last_error: err.to_string(),
                    });
                    break;
                }
            }
        }
    }
}
