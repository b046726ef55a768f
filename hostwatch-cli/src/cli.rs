//! CLI argument parsing types using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// `Hostwatch` command-line interface for server profiles and live metrics
#[derive(Parser)]
#[command(name = "hostwatch-cli")]
#[command(author, version, about = "Hostwatch command-line interface")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration directory
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase output verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// List all server profiles
    #[command(about = "List all saved server profiles")]
    List {
        /// Output format for the profile list
        #[arg(short, long, default_value = "table", value_enum)]
        format: OutputFormat,
    },

    /// Show one profile
    #[command(about = "Show the details of a saved server profile")]
    Show {
        /// Profile name or ID
        name: String,
    },

    /// Add a new server profile
    #[command(about = "Add a new server profile")]
    Add {
        /// Name for the new profile
        #[arg(short, long)]
        name: String,

        /// Host address (hostname or IP)
        #[arg(short = 'H', long)]
        host: String,

        /// SSH port
        #[arg(short, long, default_value_t = hostwatch_core::models::DEFAULT_SSH_PORT)]
        port: u16,

        /// Username for authentication
        #[arg(short, long)]
        user: String,

        /// Password (prompted for when neither --password nor --key is given)
        #[arg(long, env = "HOSTWATCH_PASSWORD", hide_env_values = true, conflicts_with = "key")]
        password: Option<String>,

        /// Path to an SSH private key file
        #[arg(short, long)]
        key: Option<String>,

        /// Passphrase of the private key, stored with the profile
        #[arg(long, env = "HOSTWATCH_KEY_PASSPHRASE", hide_env_values = true, requires = "key")]
        passphrase: Option<String>,

        /// Connect to this profile when a session starts up
        #[arg(long)]
        startup: bool,
    },

    /// Update an existing profile
    #[command(about = "Update fields of a saved server profile")]
    Update {
        /// Profile name or ID
        name: String,

        /// New name
        #[arg(long)]
        new_name: Option<String>,

        /// New host
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// New port
        #[arg(short, long)]
        port: Option<u16>,

        /// New username
        #[arg(short, long)]
        user: Option<String>,

        /// Switch to password authentication with this password
        #[arg(long, env = "HOSTWATCH_PASSWORD", hide_env_values = true, conflicts_with = "key")]
        password: Option<String>,

        /// Switch to key authentication with this key file
        #[arg(short, long)]
        key: Option<String>,

        /// Passphrase for the new key
        #[arg(long, env = "HOSTWATCH_KEY_PASSPHRASE", hide_env_values = true, requires = "key")]
        passphrase: Option<String>,

        /// Whether to connect on startup (true or false)
        #[arg(long, value_name = "BOOL")]
        startup: Option<bool>,
    },

    /// Delete a profile
    #[command(about = "Delete a saved server profile")]
    Delete {
        /// Profile name or ID
        name: String,
    },

    /// Test that a profile can connect
    #[command(about = "Open and close a session to check credentials and reachability")]
    Test {
        /// Profile name or ID
        name: String,
    },

    /// Connect and print live metrics
    #[command(about = "Connect to a server and print metrics snapshots")]
    Connect {
        /// Profile name or ID
        name: String,

        /// Number of snapshots to print before disconnecting
        #[arg(short, long, default_value_t = 3)]
        samples: u32,

        /// Sampling interval in milliseconds (defaults to the configured one)
        #[arg(short, long)]
        interval_ms: Option<u64>,

        /// Output format for snapshots
        #[arg(short, long, default_value = "table", value_enum)]
        format: OutputFormat,
    },

    /// Run the startup reconnect
    #[command(about = "Connect to the first profile flagged for startup")]
    Startup,
}

/// Output format options
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Display as formatted table
    #[default]
    Table,
    /// Output as JSON
    Json,
}
