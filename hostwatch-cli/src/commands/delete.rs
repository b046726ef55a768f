//! Delete profile command.

use crate::error::CliError;
use crate::util::find_profile;

use super::Context;

/// Delete profile command handler
pub async fn cmd_delete(ctx: &Context, name: &str) -> Result<(), CliError> {
    let facade = ctx.facade()?;
    let profiles = facade.profiles();
    let id = find_profile(&profiles, name)?.id().to_string();

    let removed = facade.remove_profile(&id).await?;

    println!("Deleted profile '{}' (ID: {id})", removed.name());

    Ok(())
}
