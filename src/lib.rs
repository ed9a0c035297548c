pub mod api_contracts;
pub mod archive;
pub mod commands;
pub mod config;
pub mod config_utils;
pub mod error;
pub mod events;
pub mod logging;
pub mod project_uploader;
pub mod state;
pub mod upload_coordinator;
mod services;

#[cfg(test)]
mod test_harness;

pub use api_contracts::{AnalysisResult, ProjectStatus};
pub use archive::SelectedFile;
pub use commands::{Cli, Command};
pub use config::UploaderConfig;
pub use error::UploadError;
pub use events::UploaderEvent;
pub use project_uploader::ProjectUploader;
pub use state::{AnalysisStep, SessionPhase, StepStatus, UploadProgress, UploadSession};
pub use upload_coordinator::{PollOutcome, UploadCallbacks, UploadCoordinator};

use tracing::{error, info};

/// Resolve configuration for `cli` and run its command
pub async fn run(cli: Cli) -> Result<(), String> {
    let config = cli.resolve_config()?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        api = %config.api_base_url,
        "GitGenei uploader starting"
    );

    commands::dispatch(cli.command, config).await.map_err(|e| {
        error!("{}", e);
        e
    })
}
