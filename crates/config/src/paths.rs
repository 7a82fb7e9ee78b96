//! Path utilities

use std::path::PathBuf;

/// Data directory (~/.chartwise), or ./.chartwise when no home is known
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".chartwise"))
        .unwrap_or_else(|| PathBuf::from(".chartwise"))
}

/// Config file location
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}
