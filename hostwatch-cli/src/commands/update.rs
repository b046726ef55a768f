//! Update profile command.

use hostwatch_core::models::ProfilePatch;

use crate::commands::add::auth_method_from_args;
use crate::error::CliError;
use crate::util::find_profile;

use super::Context;

/// Parameters for the `update` command
pub struct UpdateParams<'a> {
    pub name: &'a str,
    pub new_name: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub key: Option<String>,
    pub passphrase: Option<String>,
    pub startup: Option<bool>,
}

/// Update profile command handler
pub fn cmd_update(ctx: &Context, params: UpdateParams<'_>) -> Result<(), CliError> {
    let facade = ctx.facade()?;
    let profiles = facade.profiles();
    let id = find_profile(&profiles, params.name)?.id().to_string();

    let patch = ProfilePatch {
        name: params.new_name,
        host: params.host,
        port: params.port,
        username: params.user,
        auth_method: auth_method_from_args(params.password, params.key, params.passphrase)?,
        connect_on_startup: params.startup,
    };

    if patch.is_empty() {
        return Err(CliError::Input("Nothing to update".to_string()));
    }

    let updated = facade.update_profile(&id, patch)?;

    println!("Updated profile '{}' (ID: {id})", updated.name());

    Ok(())
}
