//! Settings loading
//!
//! Supports loading with precedence: env > file > defaults

mod env;
mod file;

use std::path::Path;

use serde::Deserialize;

pub use file::find_config_file;
use file::load_from_file;

use crate::Result;
#[cfg(feature = "mongo")]
use crate::mongo::MongoOptions;
#[cfg(feature = "mysql")]
use crate::mysql::MySqlOptions;
use crate::observability::LoggingConfig;

/// Everything a settings file can configure. Absent backends stay `None`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[cfg(feature = "mongo")]
    pub mongo: Option<MongoOptions>,
    #[cfg(feature = "mysql")]
    pub mysql: Option<MySqlOptions>,
    pub logging: LoggingConfig,
}

/// Load settings with precedence: env > file > defaults
pub fn load_settings() -> Result<Settings> {
    let mut settings = Settings::default();

    if let Some(path) = find_config_file() {
        tracing::info!("Loading configuration from {}", path.display());
        settings = load_from_file(&path)?;
    }

    env::load_from_env(settings)
}

/// Load settings from a specific file path, then apply env overrides
pub fn load_settings_from_path(path: &Path) -> Result<Settings> {
    let settings = load_from_file(path)?;
    env::load_from_env(settings)
}

/// Serializes tests that read or write process environment variables.
#[cfg(test)]
pub(crate) static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
