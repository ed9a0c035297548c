//! Configuration commands.

use crate::config::UploaderConfig;
use std::path::PathBuf;
use tracing::info;

const REDACTED: &str = "********";

/// Persist `config` to the app config directory
pub fn save_config(config: &UploaderConfig) -> Result<PathBuf, String> {
    let path = config.save()?;
    info!(path = %path.display(), "Configuration saved");
    Ok(path)
}

/// Copy of `config` safe to print: credentials are masked.
pub fn redacted(config: &UploaderConfig) -> UploaderConfig {
    UploaderConfig {
        access_token: config.access_token.as_ref().map(|_| REDACTED.to_string()),
        session_cookie: config.session_cookie.as_ref().map(|_| REDACTED.to_string()),
        ..config.clone()
    }
}
