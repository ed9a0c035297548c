//! Configuration file utilities
//!
//! Provides helper functions for reading and writing uploader configuration files.
//! All config files are stored in the platform-specific config directory
//! under "gitgenei-uploader/".

use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "gitgenei-uploader";

/// Get the app's config directory path.
///
/// Returns: `~/.config/gitgenei-uploader` (Linux)
///          `~/Library/Application Support/gitgenei-uploader` (macOS)
///          `C:\Users\<User>\AppData\Roaming\gitgenei-uploader` (Windows)
pub fn get_config_dir() -> Result<PathBuf, String> {
    let config_dir = dirs::config_dir()
        .ok_or("Could not find config directory")?;
    Ok(config_dir.join(APP_DIR_NAME))
}

/// Get the directory where rolling log files are written.
///
/// Returns: `~/.gitgenei-uploader/logs`
pub fn get_logs_dir() -> Result<PathBuf, String> {
    let home_dir = dirs::home_dir()
        .ok_or_else(|| "Could not find home directory".to_string())?;
    Ok(home_dir.join(format!(".{}", APP_DIR_NAME)).join("logs"))
}

/// Get the full path to a config file.
pub fn config_file_path(filename: &str) -> Result<PathBuf, String> {
    Ok(get_config_dir()?.join(filename))
}

/// Ensure the config directory exists.
pub fn ensure_config_dir() -> Result<PathBuf, String> {
    let dir = get_config_dir()?;
    fs::create_dir_all(&dir)
        .map_err(|e| format!("Failed to create config directory: {}", e))?;
    Ok(dir)
}

/// Save data to a config file in the app config directory as JSON.
///
/// # Returns
/// The path where the file was saved
pub fn save_config_file<T: Serialize>(filename: &str, data: &T) -> Result<PathBuf, String> {
    let config_file = ensure_config_dir()?.join(filename);
    write_json(&config_file, data)?;
    Ok(config_file)
}

/// Load data from a config file in the app config directory.
///
/// # Returns
/// * `Ok(Some(data))` if file exists and was parsed successfully
/// * `Ok(None)` if file doesn't exist
/// * `Err(...)` if file exists but couldn't be read/parsed
pub fn load_config_file<T: DeserializeOwned>(filename: &str) -> Result<Option<T>, String> {
    read_json(&config_file_path(filename)?)
}

/// Write `data` as pretty JSON to an explicit path.
pub fn write_json<T: Serialize>(path: &Path, data: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;

    fs::write(path, json)
        .map_err(|e| format!("Failed to write config file: {}", e))
}

/// Read JSON from an explicit path, `Ok(None)` when it doesn't exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, String> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file: {}", e))?;

    let data = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse config file: {}", e))?;

    Ok(Some(data))
}
