//! Command handler modules for the CLI.

mod add;
mod connect;
mod delete;
mod list;
mod show;
mod startup;
mod update;

use std::path::Path;

use hostwatch_core::config::{AppSettings, ConfigManager};
use hostwatch_core::facade::SessionFacade;
use hostwatch_core::session::SessionSettings;

use crate::cli::Commands;
use crate::error::CliError;
use crate::util::{create_config_manager, load_settings, open_facade, runtime};

/// Configuration shared by every command
pub struct Context {
    pub config: ConfigManager,
    pub settings: AppSettings,
}

impl Context {
    /// Facade with the configured session settings
    pub fn facade(&self) -> Result<SessionFacade, CliError> {
        self.facade_with(self.settings.session_settings())
    }

    /// Facade with overridden session settings
    pub fn facade_with(&self, session: SessionSettings) -> Result<SessionFacade, CliError> {
        open_facade(&self.config, &self.settings, session)
    }
}

/// Dispatch a CLI command to the appropriate handler.
pub fn dispatch(config_path: Option<&Path>, command: Commands) -> Result<(), CliError> {
    let config = create_config_manager(config_path)?;
    let settings = load_settings(&config);
    let ctx = Context { config, settings };

    runtime()?.block_on(async {
        match command {
            Commands::List { format } => list::cmd_list(&ctx, format),
            Commands::Show { name } => show::cmd_show(&ctx, &name),
            Commands::Add {
                name,
                host,
                port,
                user,
                password,
                key,
                passphrase,
                startup,
            } => add::cmd_add(
                &ctx,
                add::AddParams {
                    name: &name,
                    host: &host,
                    port,
                    user: &user,
                    password,
                    key,
                    passphrase,
                    startup,
                },
            ),
            Commands::Update {
                name,
                new_name,
                host,
                port,
                user,
                password,
                key,
                passphrase,
                startup,
            } => update::cmd_update(
                &ctx,
                update::UpdateParams {
                    name: &name,
                    new_name,
                    host,
                    port,
                    user,
                    password,
                    key,
                    passphrase,
                    startup,
                },
            ),
            Commands::Delete { name } => delete::cmd_delete(&ctx, &name).await,
            Commands::Test { name } => test::cmd_test(&ctx, &name).await,
            Commands::Connect {
                name,
                samples,
                interval_ms,
                format,
            } => connect::cmd_connect(&ctx, &name, samples, interval_ms, format).await,
            Commands::Startup => startup::cmd_startup(&ctx).await,
        }
    })
}
