//! Configuration management
//!
//! Settings live in `config.toml`, profiles in `server_profiles.json`, both
//! under one config directory.

mod manager;
mod settings;

pub use manager::{CONFIG_DIR_ENV, ConfigManager, SETTINGS_FILENAME};
pub use settings::{
    AppSettings, ConnectionSettings, LoggingSettings, MAX_INTERVAL_MS, MIN_INTERVAL_MS,
    MonitoringSettings,
};
