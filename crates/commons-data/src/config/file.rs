//! TOML settings file loading

use std::path::{Path, PathBuf};

use super::Settings;
use crate::Result;

/// Settings file locations checked in order
const CONFIG_PATHS: &[&str] = &[
    "./commons-data.toml",
    "~/.config/commons-data/config.toml",
    "/etc/commons-data/config.toml",
];

/// Find the first existing settings file
pub fn find_config_file() -> Option<PathBuf> {
    for path_str in CONFIG_PATHS {
        let path = if path_str.starts_with('~') {
            if let Ok(home) = std::env::var("HOME") {
                PathBuf::from(path_str.replacen('~', &home, 1))
            } else {
                continue;
            }
        } else {
            PathBuf::from(path_str)
        };

        if path.exists() {
            return Some(path);
        }
    }
    None
}

/// Load settings from a TOML file
pub fn load_from_file(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::Error::Config(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    toml::from_str(&content).map_err(|e| {
        crate::Error::Config(format!(
            "Failed to parse config file {}: {}",
            path.display(),
            e
        ))
    })
}
