//! Startup reconnect command.

use crate::error::CliError;

use super::Context;

/// Runs the startup reconnect and reports the outcome
pub async fn cmd_startup(ctx: &Context) -> Result<(), CliError> {
    let facade = ctx.facade()?;
    let report = facade.startup().await;

    if report.is_empty() {
        println!("No profiles are flagged for startup.");
        return Ok(());
    }

    let name_of = |id: &str| {
        facade
            .store()
            .get(id)
            .map_or_else(|| id.to_string(), |p| p.name().to_string())
    };

    for (id, err) in &report.failures {
        println!("✗ {}: {err}", name_of(id));
    }

    let outcome = match report.connected {
        Some(ref id) => {
            println!("✓ Connected to {}", name_of(id));
            Ok(())
        }
        None => Err(CliError::Connection(
            "No startup profile could be connected".to_string(),
        )),
    };

    facade.teardown().await;
    outcome
}
