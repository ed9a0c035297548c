//! Upload and analyze commands with a terminal progress display.

use super::browser;
use crate::api_contracts::AnalysisResult;
use crate::config::UploaderConfig;
use crate::error::UploadError;
use crate::events::UploaderEvent;
use crate::state::{SessionPhase, StepStatus};
use crate::upload_coordinator::UploadCoordinator;
use std::path::Path;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// How long the display may take to drain its last events
const DISPLAY_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Upload `path`, then follow its analysis to the end
pub async fn upload_archive(config: &UploaderConfig, path: &Path) -> Result<AnalysisResult, String> {
    let coordinator = UploadCoordinator::new(config);
    let display = spawn_progress_display(coordinator.subscribe());

    let started = coordinator.select_file(path).await;
    follow(&coordinator, started, display).await
}

/// Follow analysis of an archive uploaded earlier
pub async fn analyze_uploaded(config: &UploaderConfig, file_id: &str) -> Result<AnalysisResult, String> {
    let coordinator = UploadCoordinator::new(config);
    let display = spawn_progress_display(coordinator.subscribe());

    let started = coordinator.start_analysis(file_id).await;
    follow(&coordinator, started, display).await
}

async fn follow(
    coordinator: &UploadCoordinator,
    started: Result<(), UploadError>,
    display: JoinHandle<()>,
) -> Result<AnalysisResult, String> {
    let phase = match started {
        Ok(()) => coordinator.wait_for_outcome().await,
        Err(_) => coordinator.phase(),
    };
    let _ = tokio::time::timeout(DISPLAY_DRAIN_TIMEOUT, display).await;

    let session = coordinator.session();
    if phase == SessionPhase::Completed {
        return session
            .result
            .ok_or_else(|| "Analysis completed without a result".to_string());
    }
    Err(session
        .error
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| "Session ended before analysis finished".to_string()))
}

/// Print the final result, and open the repository if asked to
pub fn report(result: &AnalysisResult, open: bool, json: bool) -> Result<(), String> {
    if json {
        let text = serde_json::to_string_pretty(result)
            .map_err(|e| format!("Failed to serialize result: {}", e))?;
        println!("{}", text);
    } else {
        println!("{}", result.message);
        if let Some(ref url) = result.repository_url {
            println!("Repository: {}", url);
        }
        if !result.branches.is_empty() {
            println!("Branches: {}", result.branches.join(", "));
        }
    }

    if open {
        match result.repository_url {
            Some(ref url) => {
                // The upload already succeeded; a missing browser is not a failure
                if let Err(e) = browser::open_browser(url) {
                    warn!("{}", e);
                    eprintln!("{}", e);
                }
            }
            None => eprintln!("No repository URL to open"),
        }
    }
    Ok(())
}

/// Print events to stderr until the session settles
fn spawn_progress_display(mut events: broadcast::Receiver<UploaderEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut display = ProgressDisplay::default();
        loop {
            match events.recv().await {
                Ok(event) => {
                    let terminal = matches!(
                        event,
                        UploaderEvent::AnalysisComplete { .. } | UploaderEvent::SessionFailed { .. }
                    );
                    if let Some(line) = display.render(&event) {
                        eprintln!("{}", line);
                    }
                    if terminal {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Progress display fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Turns events into terminal lines, skipping ones that add nothing new
#[derive(Debug, Default)]
struct ProgressDisplay {
    last_percentage: Option<u8>,
    last_step_line: Option<String>,
}

impl ProgressDisplay {
    fn render(&mut self, event: &UploaderEvent) -> Option<String> {
        match event {
            UploaderEvent::FileSelected { filename, size, .. } => {
                Some(format!("Uploading {} ({})", filename, format_bytes(*size)))
            }
            UploaderEvent::UploadProgress { progress, .. } => {
                // One line per 10% step
                let bucket = progress.percentage / 10;
                if self.last_percentage.map(|p| p / 10) == Some(bucket) {
                    return None;
                }
                self.last_percentage = Some(progress.percentage);
                Some(format!(
                    "  {:>3}%  {} / {}",
                    progress.percentage,
                    format_bytes(progress.uploaded_bytes),
                    format_bytes(progress.total_bytes)
                ))
            }
            UploaderEvent::UploadComplete { file_id, .. } => match file_id {
                Some(id) => Some(format!("Upload complete (file id {})", id)),
                None => Some("Upload complete".to_string()),
            },
            UploaderEvent::AnalysisStarted { file_id, .. } => {
                info!(%file_id, "Analysis requested");
                Some("Analysis started".to_string())
            }
            UploaderEvent::StepsUpdated { steps, message, .. } => {
                let current = steps
                    .iter()
                    .find(|s| s.status == StepStatus::Processing)
                    .map(|s| format!("  [{}] {}", s.name, message))?;
                if self.last_step_line.as_deref() == Some(current.as_str()) {
                    return None;
                }
                self.last_step_line = Some(current.clone());
                Some(current)
            }
            UploaderEvent::AnalysisComplete { .. } => Some("Analysis complete".to_string()),
            UploaderEvent::SessionFailed { message, .. } => Some(format!("Failed: {}", message)),
            UploaderEvent::SessionReset { .. } => None,
        }
    }
}

/// Human-readable byte count
fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}
