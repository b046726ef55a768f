//! Shared utility functions used across command modules.

use std::path::Path;
use std::sync::Arc;

use hostwatch_core::config::{AppSettings, ConfigManager};
use hostwatch_core::facade::SessionFacade;
use hostwatch_core::models::SavedServerProfile;
use hostwatch_core::session::SessionSettings;
use hostwatch_core::transport::{SshConnector, SshOptions};

use crate::error::CliError;

/// Creates a `ConfigManager` using the optional custom config directory
/// from CLI args.
pub fn create_config_manager(config_path: Option<&Path>) -> Result<ConfigManager, CliError> {
    match config_path {
        Some(path) => Ok(ConfigManager::with_config_dir(path.to_path_buf())),
        None => ConfigManager::new()
            .map_err(|e| CliError::Config(format!("Failed to initialize config: {e}"))),
    }
}

/// Loads settings, falling back to defaults with a warning
pub fn load_settings(config: &ConfigManager) -> AppSettings {
    config.load_settings().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Using default settings");
        AppSettings::default()
    })
}

/// Builds a facade over the saved profiles without running the startup
/// reconnect. Must be called inside the runtime.
pub fn open_facade(
    config: &ConfigManager,
    settings: &AppSettings,
    session: SessionSettings,
) -> Result<SessionFacade, CliError> {
    let store = config
        .load_profiles()
        .map_err(|e| CliError::Config(format!("Failed to load profiles: {e}")))?;
    let connector = SshConnector::new(SshOptions::from_settings(&settings.connection));
    Ok(SessionFacade::new(
        Arc::new(store),
        Arc::new(connector),
        session,
    ))
}

/// Find a profile by name or ID
pub fn find_profile<'a>(
    profiles: &'a [SavedServerProfile],
    name_or_id: &str,
) -> Result<&'a SavedServerProfile, CliError> {
    // Exact name, then exact id
    if let Some(profile) = profiles
        .iter()
        .find(|p| p.name() == name_or_id || p.id() == name_or_id)
    {
        return Ok(profile);
    }

    if let Some(profile) = profiles
        .iter()
        .find(|p| p.name().eq_ignore_ascii_case(name_or_id))
    {
        return Ok(profile);
    }

    // Prefix of name or id
    let needle = name_or_id.to_lowercase();
    let matches: Vec<_> = profiles
        .iter()
        .filter(|p| p.name().to_lowercase().starts_with(&needle) || p.id().starts_with(&needle))
        .collect();

    match matches.as_slice() {
        [] => Err(CliError::ProfileNotFound(name_or_id.to_string())),
        [profile] => Ok(*profile),
        _ => {
            let names: Vec<_> = matches.iter().map(|p| p.name()).collect();
            Err(CliError::Input(format!(
                "Ambiguous profile name '{}'. Matches: {}",
                name_or_id,
                names.join(", ")
            )))
        }
    }
}

/// Creates the runtime commands block on
pub fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Config(format!("Failed to create async runtime: {e}")))
}
