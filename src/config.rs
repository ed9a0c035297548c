//! Uploader configuration.
//!
//! Resolution order: built-in defaults, then `config.json` in the app config
//! directory, then environment variables. The CLI applies its flags last.

use crate::archive::MAX_ARCHIVE_SIZE;
use crate::config_utils;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "config.json";

/// Smallest streamed body chunk
pub const MIN_CHUNK_SIZE: usize = 1024;

const DEFAULT_API_HOST: &str = "http://localhost:8080";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploaderConfig {
    /// Backend base URL, without trailing slash
    pub api_base_url: String,
    /// Sent as `Authorization: Bearer <token>` when set
    pub access_token: Option<String>,
    /// Sent verbatim as the `Cookie` header when set (backend session login)
    pub session_cookie: Option<String>,
    pub poll_interval_ms: u64,
    /// Status requests before a session is failed as timed out
    pub max_poll_attempts: u32,
    /// Per-request timeout for everything except the upload itself
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub max_file_size: u64,
    /// Bytes read from disk per streamed body chunk
    pub chunk_size: usize,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_HOST.to_string(),
            access_token: None,
            session_cookie: None,
            poll_interval_ms: 2000,
            max_poll_attempts: 900,
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            max_file_size: MAX_ARCHIVE_SIZE,
            chunk_size: 64 * 1024,
        }
    }
}

impl UploaderConfig {
    /// Defaults, overlaid with the config file and environment.
    pub fn load() -> Result<Self, String> {
        let mut config = config_utils::load_config_file::<UploaderConfig>(CONFIG_FILE_NAME)?
            .unwrap_or_default();
        config.apply_env();
        Ok(config)
    }

    /// Priority: runtime env var > compile-time env var > current value.
    /// - Runtime: GITGENEI_API_HOST=http://localhost:8080 gitgenei-uploader ...
    /// - Compile: GITGENEI_API_HOST=https://api.example.com cargo build
    pub fn apply_env(&mut self) {
        if let Some(host) = env::var("GITGENEI_API_HOST")
            .ok()
            .or_else(|| option_env!("GITGENEI_API_HOST").map(String::from))
        {
            self.api_base_url = host;
        }
        if let Ok(token) = env::var("GITGENEI_ACCESS_TOKEN") {
            self.access_token = Some(token);
        }
        if let Ok(cookie) = env::var("GITGENEI_SESSION_COOKIE") {
            self.session_cookie = Some(cookie);
        }
        self.normalize();
    }

    /// Save to the app config directory
    pub fn save(&self) -> Result<std::path::PathBuf, String> {
        config_utils::save_config_file(CONFIG_FILE_NAME, self)
    }

    /// Strip trailing slashes and keep numeric knobs in usable ranges.
    pub fn normalize(&mut self) {
        while self.api_base_url.ends_with('/') {
            self.api_base_url.pop();
        }
        self.poll_interval_ms = self.poll_interval_ms.max(1);
        self.max_poll_attempts = self.max_poll_attempts.max(1);
        self.chunk_size = self.chunk_size.max(MIN_CHUNK_SIZE);
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Same config pointed at a different host (tests and `--api-host`)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api_base_url = base_url.into();
        self.normalize();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = UploaderConfig::default();
        assert_eq!(config.api_base_url, "http://localhost:8080");
        assert_eq!(config.poll_interval(), Duration::from_secs(2));
        assert_eq!(config.max_file_size, 5 * 1024 * 1024 * 1024);
        assert!(config.access_token.is_none());
    }

    #[test]
    fn test_partial_file_uses_defaults_for_missing_fields() {
        let json = r#"{"api_base_url": "https://api.gitgenei.dev", "poll_interval_ms": 500}"#;
        let config: UploaderConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.api_base_url, "https://api.gitgenei.dev");
        assert_eq!(config.poll_interval_ms, 500);
        assert_eq!(config.max_poll_attempts, 900);
        assert_eq!(config.chunk_size, 64 * 1024);
    }

    #[test]
    fn test_with_base_url_strips_trailing_slash() {
        let config = UploaderConfig::default().with_base_url("http://127.0.0.1:1234//");
        assert_eq!(config.api_base_url, "http://127.0.0.1:1234");
    }

    #[test]
    fn test_normalize_clamps_zero_values() {
        let mut config = UploaderConfig {
            poll_interval_ms: 0,
            max_poll_attempts: 0,
            chunk_size: 0,
            ..UploaderConfig::default()
        };
        config.normalize();
        assert_eq!(config.poll_interval_ms, 1);
        assert_eq!(config.max_poll_attempts, 1);
        assert_eq!(config.chunk_size, 1024);
    }

    #[test]
    fn test_config_serialize() {
        let config = UploaderConfig {
            access_token: Some("secret".to_string()),
            ..UploaderConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"api_base_url\":\"http://localhost:8080\""));
        assert!(json.contains("secret"));
    }
}
