//! Connect and stream metrics command.

use std::time::Duration;

use hostwatch_core::error::{AuthError, SessionError};
use hostwatch_core::facade::{FacadeSnapshot, SessionFacade};
use hostwatch_core::models::{ConnectionResult, SystemMetrics};
use hostwatch_core::monitoring::SamplerSettings;
use hostwatch_core::session::ConnectionState;
use secrecy::SecretString;
use tokio::sync::watch;

use crate::cli::OutputFormat;
use crate::error::CliError;
use crate::format::format_metrics;
use crate::util::find_profile;

use super::Context;

/// Connect command handler: connects, prints `samples` snapshots and
/// disconnects.
pub async fn cmd_connect(
    ctx: &Context,
    name: &str,
    samples: u32,
    interval_ms: Option<u64>,
    format: OutputFormat,
) -> Result<(), CliError> {
    let mut session = ctx.settings.session_settings();
    if let Some(ms) = interval_ms {
        let mut monitoring = ctx.settings.monitoring.clone();
        monitoring.interval_ms = ms;
        session.sampler = session
            .sampler
            .with_interval(monitoring.effective_interval());
    }

    let facade = ctx.facade_with(session)?;
    let profiles = facade.profiles();
    let saved = find_profile(&profiles, name)?;
    let id = saved.id().to_string();

    let mut updates = facade.subscribe();
    let result = connect_with_prompt(&facade, &id).await?;
    if !result.success {
        return Err(CliError::Connection(result.message));
    }

    if format == OutputFormat::Table {
        println!("Connected to {} ({})", saved.name(), saved.profile.destination());
    }

    let wait = sample_wait(&session.sampler, ctx.settings.connection.exec_timeout_secs);

    let outcome = print_samples(&mut updates, samples, format, wait).await;
    facade.teardown().await;
    outcome
}

/// Long enough for a full run of failed ticks before escalation
fn sample_wait(sampler: &SamplerSettings, exec_timeout_secs: u64) -> Duration {
    sampler
        .interval
        .saturating_mul(sampler.failure_threshold.saturating_add(1))
        .saturating_add(Duration::from_secs(exec_timeout_secs))
}

/// Connects, asking for a key passphrase once if the key needs one
async fn connect_with_prompt(
    facade: &SessionFacade,
    id: &str,
) -> Result<ConnectionResult, CliError> {
    let result = facade.connect(id).await;

    let Some(SessionError::Auth(AuthError::PassphraseRequired(ref key))) = result.error else {
        return Ok(result);
    };

    let passphrase = rpassword::prompt_password(format!("Passphrase for {key}: "))?;
    Ok(facade
        .connect_with_passphrase(id, SecretString::from(passphrase))
        .await)
}

async fn print_samples(
    updates: &mut watch::Receiver<FacadeSnapshot>,
    samples: u32,
    format: OutputFormat,
    wait: Duration,
) -> Result<(), CliError> {
    let mut printed = 0;
    let mut last: Option<SystemMetrics> = None;

    while printed < samples {
        let snapshot = updates.borrow_and_update().clone();

        match snapshot.state {
            ConnectionState::Connected => {}
            ConnectionState::Error => {
                return Err(CliError::Connection(
                    snapshot
                        .last_error
                        .unwrap_or_else(|| "Session failed".to_string()),
                ));
            }
            ConnectionState::Disconnected | ConnectionState::Connecting => {
                return Err(CliError::Connection("Session ended".to_string()));
            }
        }

        if let Some(metrics) = snapshot.metrics
            && last.as_ref() != Some(&metrics)
        {
            print_snapshot(&metrics, format)?;
            printed += 1;
            last = Some(metrics);
            continue;
        }

        match tokio::time::timeout(wait, updates.changed()).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => return Err(CliError::Connection("Session closed".to_string())),
            Err(_) => {
                return Err(CliError::Connection(format!(
                    "No metrics received within {}s",
                    wait.as_secs()
                )));
            }
        }
    }

    Ok(())
}

fn print_snapshot(metrics: &SystemMetrics, format: OutputFormat) -> Result<(), CliError> {
    match format {
        OutputFormat::Table => println!("\n{}", format_metrics(metrics)),
        OutputFormat::Json => {
            let json = serde_json::to_string(metrics)
                .map_err(|e| CliError::Config(format!("Failed to serialize metrics: {e}")))?;
            println!("{json}");
        }
    }
    Ok(())
}
