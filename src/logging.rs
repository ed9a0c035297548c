//! Tracing setup for the CLI.
//!
//! Library code only emits `tracing` events. The binary installs a subscriber
//! writing human-readable lines to stderr and a daily rolling file under
//! `~/.gitgenei-uploader/logs`.

use crate::config_utils::get_logs_dir;
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

const LOG_FILE_PREFIX: &str = "gitgenei-uploader.log";

/// Filter used when `RUST_LOG` is not set
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "gitgenei_uploader_lib=debug,gitgenei_uploader=debug"
    } else {
        "gitgenei_uploader_lib=info,gitgenei_uploader=info"
    }
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the lifetime of the process.
pub fn init_logging(verbose: bool, json: bool) -> Result<WorkerGuard, String> {
    let logs_dir = get_logs_dir()?;
    fs::create_dir_all(&logs_dir)
        .map_err(|e| format!("Failed to create logs directory: {}", e))?;

    let file_appender = tracing_appender::rolling::daily(&logs_dir, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    // The CLI prints its own progress; stderr only gets problems unless verbose
    let stderr_level = if verbose { LevelFilter::DEBUG } else { LevelFilter::WARN };
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_filter(stderr_level);
    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false);

    let result = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .with(file_layer.json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .with(file_layer)
            .try_init()
    };

    result.map_err(|e| format!("Failed to initialize logging: {}", e))?;
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_levels() {
        assert!(default_filter(false).contains("=info"));
        assert!(default_filter(true).contains("=debug"));
    }

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(default_filter(false)).is_ok());
        assert!(EnvFilter::try_new(default_filter(true)).is_ok());
    }
}
