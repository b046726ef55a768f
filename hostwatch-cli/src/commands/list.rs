//! List profiles command.

use std::fmt::Write as _;

use hostwatch_core::models::SavedServerProfile;

use crate::cli::OutputFormat;
use crate::error::CliError;

use super::Context;

/// List profiles command handler
pub fn cmd_list(ctx: &Context, format: OutputFormat) -> Result<(), CliError> {
    let facade = ctx.facade()?;
    let profiles = facade.profiles();

    match format {
        OutputFormat::Table => println!("{}", format_table(&profiles)),
        OutputFormat::Json => println!("{}", format_json(&profiles)?),
    }

    Ok(())
}

/// Format profiles as a table string
#[must_use]
pub fn format_table(profiles: &[SavedServerProfile]) -> String {
    if profiles.is_empty() {
        return "No profiles found.".to_string();
    }

    let mut output = String::new();

    let name_width = profiles
        .iter()
        .map(|p| p.name().len())
        .max()
        .unwrap_or(4)
        .max(4);
    let host_width = profiles
        .iter()
        .map(|p| p.profile.host.len())
        .max()
        .unwrap_or(4)
        .max(4);
    let user_width = profiles
        .iter()
        .map(|p| p.profile.username.len())
        .max()
        .unwrap_or(4)
        .max(4);
    let port_width = 5;
    let auth_width = 11;

    let _ = writeln!(
        output,
        "{:<name_width$}  {:<host_width$}  {:<port_width$}  {:<user_width$}  \
         {:<auth_width$}  STARTUP",
        "NAME", "HOST", "PORT", "USER", "AUTH"
    );
    let _ = writeln!(
        output,
        "{:-<name_width$}  {:-<host_width$}  {:-<port_width$}  {:-<user_width$}  \
         {:-<auth_width$}  -------",
        "", "", "", "", ""
    );

    for saved in profiles {
        let p = &saved.profile;
        let _ = writeln!(
            output,
            "{:<name_width$}  {:<host_width$}  {:<port_width$}  {:<user_width$}  \
             {:<auth_width$}  {}",
            p.name,
            p.host,
            p.port,
            p.username,
            p.auth_method.kind(),
            if saved.connect_on_startup { "yes" } else { "" }
        );
    }

    output.trim_end().to_string()
}

/// Format profiles as JSON string
///
/// # Errors
///
/// Returns `CliError::Config` if JSON serialization fails.
pub fn format_json(profiles: &[SavedServerProfile]) -> Result<String, CliError> {
    let output: Vec<ProfileOutput> = profiles.iter().map(ProfileOutput::from).collect();
    serde_json::to_string_pretty(&output)
        .map_err(|e| CliError::Config(format!("Failed to serialize to JSON: {e}")))
}

/// Profile listing without secrets
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ProfileOutput {
    pub id: String,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub auth_method: String,
    pub connect_on_startup: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_connected: Option<String>,
}

impl From<&SavedServerProfile> for ProfileOutput {
    fn from(saved: &SavedServerProfile) -> Self {
        let p = &saved.profile;
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            host: p.host.clone(),
            port: p.port,
            username: p.username.clone(),
            auth_method: p.auth_method.kind().to_string(),
            connect_on_startup: saved.connect_on_startup,
            last_connected: saved.last_connected.map(|t| t.to_rfc3339()),
        }
    }
}
