//! Command-line commands.
//!
//! `Cli` is parsed in `main.rs` and handed to [`dispatch`]. Each submodule
//! owns one concern and returns `Result<_, String>` so `main` can print the
//! error and pick an exit code.

pub mod browser;
pub mod project;
pub mod settings;
pub mod upload;

use crate::config::UploaderConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(
    name = "gitgenei-uploader",
    author,
    version,
    about = "Upload a project archive to GitGenei and follow its analysis",
    arg_required_else_help = true
)]
pub struct Cli {
    /// Backend base URL (overrides GITGENEI_API_HOST and the config file)
    #[arg(long, global = true, value_name = "URL")]
    pub api_host: Option<String>,

    /// Bearer token sent with every request
    #[arg(long, global = true, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Raw Cookie header for a backend session login
    #[arg(long, global = true, value_name = "COOKIE")]
    pub cookie: Option<String>,

    #[arg(long, global = true, value_name = "MS")]
    pub poll_interval_ms: Option<u64>,

    #[arg(long, global = true, value_name = "N")]
    pub max_poll_attempts: Option<u32>,

    /// Debug-level logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Write the log file as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Upload an archive and wait for its analysis to finish
    Upload {
        path: PathBuf,
        /// Open the repository in the browser when done
        #[arg(long)]
        open: bool,
        /// Print the final result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Trigger and follow analysis of an archive that is already uploaded
    Analyze {
        file_id: String,
        #[arg(long)]
        open: bool,
        #[arg(long)]
        json: bool,
    },
    /// Print the current analysis status
    Status { file_id: String },
    /// Print the full analysis results
    Results { file_id: String },
    /// Delete an uploaded project
    Delete { file_id: String },
    /// Show the effective configuration
    Config {
        /// Persist it to the config file
        #[arg(long)]
        save: bool,
    },
}

impl Cli {
    /// Stored config and environment, with command-line flags on top
    pub fn resolve_config(&self) -> Result<UploaderConfig, String> {
        let config = UploaderConfig::load()?;
        Ok(self.apply_overrides(config))
    }

    pub fn apply_overrides(&self, mut config: UploaderConfig) -> UploaderConfig {
        if let Some(ref host) = self.api_host {
            config.api_base_url = host.clone();
        }
        if let Some(ref token) = self.token {
            config.access_token = Some(token.clone());
        }
        if let Some(ref cookie) = self.cookie {
            config.session_cookie = Some(cookie.clone());
        }
        if let Some(interval) = self.poll_interval_ms {
            config.poll_interval_ms = interval;
        }
        if let Some(attempts) = self.max_poll_attempts {
            config.max_poll_attempts = attempts;
        }
        config.normalize();
        config
    }
}

/// Run one parsed command against `config`
pub async fn dispatch(command: Command, config: UploaderConfig) -> Result<(), String> {
    debug!(?command, api = %config.api_base_url, "Dispatching command");

    match command {
        Command::Upload { path, open, json } => {
            let result = upload::upload_archive(&config, &path).await?;
            upload::report(&result, open, json)
        }
        Command::Analyze { file_id, open, json } => {
            let result = upload::analyze_uploaded(&config, &file_id).await?;
            upload::report(&result, open, json)
        }
        Command::Status { file_id } => {
            let status = project::get_status(&config, &file_id).await?;
            print_json(&status)
        }
        Command::Results { file_id } => {
            let results = project::get_results(&config, &file_id).await?;
            print_json(&results)
        }
        Command::Delete { file_id } => {
            project::delete(&config, &file_id).await?;
            println!("Deleted project {}", file_id);
            Ok(())
        }
        Command::Config { save } => {
            if save {
                let path = settings::save_config(&config)?;
                eprintln!("Saved configuration to {}", path.display());
            }
            print_json(&settings::redacted(&config))
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize output: {}", e))?;
    println!("{}", text);
    Ok(())
}
