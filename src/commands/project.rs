//! One-shot project commands: status, results, delete.

use crate::config::UploaderConfig;
use crate::project_uploader::ProjectUploader;
use tracing::{error, info};

/// Fetch the analysis status once
pub async fn get_status(config: &UploaderConfig, file_id: &str) -> Result<serde_json::Value, String> {
    let uploader = ProjectUploader::new(config);
    uploader.get_status(file_id).await.map_err(|e| {
        let error_msg = format!("Failed to get status: {}", e);
        error!("{}", error_msg);
        error_msg
    })
}

/// Fetch the full analysis results
pub async fn get_results(config: &UploaderConfig, file_id: &str) -> Result<serde_json::Value, String> {
    let uploader = ProjectUploader::new(config);
    uploader.get_analysis_results(file_id).await.map_err(|e| {
        let error_msg = format!("Failed to get analysis results: {}", e);
        error!("{}", error_msg);
        error_msg
    })
}

pub async fn delete(config: &UploaderConfig, file_id: &str) -> Result<(), String> {
    let uploader = ProjectUploader::new(config);
    match uploader.delete_project(file_id).await {
        Ok(()) => {
            info!(%file_id, "Project deleted");
            Ok(())
        }
        Err(e) => {
            let error_msg = format!("Failed to delete project: {}", e);
            error!("{}", error_msg);
            Err(error_msg)
        }
    }
}
