//! Config directory resolution and settings persistence

use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult, ProfileResult};
use crate::profiles::{PROFILE_STORE_FILENAME, ProfileStore};

use super::settings::AppSettings;

/// Environment variable overriding the config directory
pub const CONFIG_DIR_ENV: &str = "HOSTWATCH_CONFIG_DIR";

/// Settings file name
pub const SETTINGS_FILENAME: &str = "config.toml";

/// Owns the config directory and the files inside it
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Resolves the config directory from `$HOSTWATCH_CONFIG_DIR`, falling
    /// back to the platform config dir.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoConfigDir`] if neither is available.
    pub fn new() -> ConfigResult<Self> {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::with_config_dir(PathBuf::from(dir)));
        }
        let dir = dirs::config_dir()
            .ok_or(ConfigError::NoConfigDir)?
            .join("hostwatch");
        Ok(Self::with_config_dir(dir))
    }

    /// Uses an explicit directory
    #[must_use]
    pub fn with_config_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: dir.into(),
        }
    }

    /// The config directory
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Path of `config.toml`
    #[must_use]
    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join(SETTINGS_FILENAME)
    }

    /// Path of the profile store
    #[must_use]
    pub fn profiles_path(&self) -> PathBuf {
        self.config_dir.join(PROFILE_STORE_FILENAME)
    }

    /// Loads settings; a missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file exists but cannot be read,
    /// or [`ConfigError::Parse`] if it is not valid TOML.
    pub fn load_settings(&self) -> ConfigResult<AppSettings> {
        let path = self.settings_path();
        let _span = tracing::debug_span!(
            crate::tracing::span_names::CONFIG_LOAD,
            path = %path.display()
        )
        .entered();

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No settings file, using defaults");
                return Ok(AppSettings::default());
            }
            Err(e) => {
                return Err(ConfigError::Io {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                });
            }
        };

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Writes settings to `config.toml`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Serialize`] or [`ConfigError::Io`].
    pub fn save_settings(&self, settings: &AppSettings) -> ConfigResult<()> {
        let content =
            toml::to_string_pretty(settings).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::create_dir_all(&self.config_dir).map_err(|e| ConfigError::Io {
            path: self.config_dir.display().to_string(),
            reason: e.to_string(),
        })?;
        let path = self.settings_path();
        std::fs::write(&path, content).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Opens the profile store kept in this directory.
    ///
    /// # Errors
    ///
    /// See [`ProfileStore::load`].
    pub fn load_profiles(&self) -> ProfileResult<ProfileStore> {
        ProfileStore::load(self.profiles_path())
    }
}
