//! Show profile details command.

use chrono::{DateTime, Local, Utc};
use hostwatch_core::models::AuthMethod;

use crate::error::CliError;
use crate::format::format_uptime;
use crate::util::find_profile;

use super::Context;

/// Show profile details command handler
pub fn cmd_show(ctx: &Context, name: &str) -> Result<(), CliError> {
    let facade = ctx.facade()?;
    let profiles = facade.profiles();
    let saved = find_profile(&profiles, name)?;
    let profile = &saved.profile;

    println!("Profile Details:");
    println!("  ID:       {}", profile.id);
    println!("  Name:     {}", profile.name);
    println!("  Host:     {}", profile.host);
    println!("  Port:     {}", profile.port);
    println!("  Username: {}", profile.username);

    match profile.auth_method {
        AuthMethod::Password { .. } => println!("  Auth:     password"),
        AuthMethod::PrivateKey {
            ref key_path,
            ref passphrase,
        } => {
            println!("  Auth:     private key");
            println!("  Key Path: {key_path}");
            if passphrase.is_some() {
                println!("  Passphrase: stored");
            }
        }
    }

    println!(
        "  Startup:  {}",
        if saved.connect_on_startup { "yes" } else { "no" }
    );
    println!("  Created:  {}", local_time(saved.created_at));
    match saved.last_connected {
        Some(at) => {
            let ago = Utc::now().signed_duration_since(at).num_seconds().max(0);
            println!(
                "  Last Connected: {} ({} ago)",
                local_time(at),
                format_uptime(ago.unsigned_abs())
            );
        }
        None => println!("  Last Connected: never"),
    }

    Ok(())
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
