//! `Hostwatch` CLI - Command-line interface for `Hostwatch`
//!
//! Manages saved server profiles, tests connectivity and prints live
//! metrics from a remote host.

mod cli;
mod commands;
mod error;
mod format;
mod util;

use clap::Parser;
use cli::Cli;
use hostwatch_core::tracing::{TracingLevel, init_tracing};

fn main() {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    let logging = util::create_config_manager(config_path)
        .map(|config| util::load_settings(&config).logging)
        .unwrap_or_default();
    let level = if cli.quiet {
        TracingLevel::Error
    } else if cli.verbose > 0 {
        TracingLevel::Warn.raised_by(cli.verbose)
    } else {
        logging.level
    };
    if let Err(e) = init_tracing(&logging.tracing_config(level)) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let result = commands::dispatch(config_path, cli.command);

    if let Err(e) = result {
        if !cli.quiet {
            eprintln!("Error: {e}");
        }
        std::process::exit(e.exit_code());
    }
}
