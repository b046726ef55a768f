//! Add profile command.

use hostwatch_core::models::{AuthMethod, SavedServerProfile, ServerProfile};

use crate::error::CliError;

use super::Context;

/// Parameters for the `add` command
pub struct AddParams<'a> {
    pub name: &'a str,
    pub host: &'a str,
    pub port: u16,
    pub user: &'a str,
    pub password: Option<String>,
    pub key: Option<String>,
    pub passphrase: Option<String>,
    pub startup: bool,
}

/// Add profile command handler
pub fn cmd_add(ctx: &Context, params: AddParams<'_>) -> Result<(), CliError> {
    let auth_method = auth_method_from_args(params.password, params.key, params.passphrase)?
        .map_or_else(prompt_password, Ok)?;

    let profile = ServerProfile::new(
        params.name,
        params.host,
        params.port,
        params.user,
        auth_method,
    );
    let saved = SavedServerProfile::new(profile).with_connect_on_startup(params.startup);
    let id = saved.id().to_string();

    let facade = ctx.facade()?;
    facade.add_profile(saved)?;

    println!("Added profile '{}' (ID: {id})", params.name);

    Ok(())
}

/// Builds an auth method from `--password` / `--key` / `--passphrase`.
/// Returns `None` when neither a password nor a key was given.
pub fn auth_method_from_args(
    password: Option<String>,
    key: Option<String>,
    passphrase: Option<String>,
) -> Result<Option<AuthMethod>, CliError> {
    match (password, key) {
        (Some(_), Some(_)) => Err(CliError::Input(
            "--password and --key are mutually exclusive".to_string(),
        )),
        (Some(password), None) => Ok(Some(AuthMethod::Password { password })),
        (None, Some(key_path)) => Ok(Some(AuthMethod::PrivateKey {
            key_path,
            passphrase: passphrase.filter(|p| !p.is_empty()),
        })),
        (None, None) => {
            if passphrase.is_some() {
                return Err(CliError::Input("--passphrase requires --key".to_string()));
            }
            Ok(None)
        }
    }
}

fn prompt_password() -> Result<AuthMethod, CliError> {
    let password = rpassword::prompt_password("Password: ")?;
    Ok(AuthMethod::Password { password })
}
