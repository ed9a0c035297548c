//! Upload session state.

use super::steps::AnalysisStep;
use crate::api_contracts::AnalysisResult;
use crate::archive::SelectedFile;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle phase of the current session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Idle,
    Uploading,
    Analyzing,
    Completed,
    Failed,
}

impl SessionPhase {
    /// Uploading or analyzing; a new file may not be selected
    pub fn is_active(self) -> bool {
        matches!(self, SessionPhase::Uploading | SessionPhase::Analyzing)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SessionPhase::Completed | SessionPhase::Failed)
    }
}

/// Byte progress of an in-flight upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadProgress {
    pub percentage: u8,
    pub uploaded_bytes: u64,
    pub total_bytes: u64,
}

impl UploadProgress {
    pub fn new(uploaded_bytes: u64, total_bytes: u64) -> Self {
        Self {
            percentage: percentage(uploaded_bytes, total_bytes),
            uploaded_bytes,
            total_bytes,
        }
    }
}

/// `round(uploaded / total * 100)` in [0, 100]; zero total is 0%.
pub fn percentage(uploaded: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (uploaded as f64 / total as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

/// One user-initiated upload attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSession {
    pub id: Uuid,
    pub phase: SessionPhase,
    pub selected_file: Option<SelectedFile>,
    pub progress: Option<UploadProgress>,
    pub file_id: Option<String>,
    pub error: Option<String>,
    pub steps: Vec<AnalysisStep>,
    pub analysis_progress: u8,
    pub status_message: Option<String>,
    pub result: Option<AnalysisResult>,
    pub started_at: Option<String>,  // RFC 3339
}

impl UploadSession {
    /// Empty idle session with a fresh id
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            phase: SessionPhase::Idle,
            selected_file: None,
            progress: None,
            file_id: None,
            error: None,
            steps: Vec::new(),
            analysis_progress: 0,
            status_message: None,
            result: None,
            started_at: None,
        }
    }

    /// Same contents as a fresh session, ignoring the id
    pub fn is_empty(&self) -> bool {
        self.phase == SessionPhase::Idle
            && self.selected_file.is_none()
            && self.progress.is_none()
            && self.file_id.is_none()
            && self.error.is_none()
            && self.steps.is_empty()
            && self.result.is_none()
    }
}

impl Default for UploadSession {
    fn default() -> Self {
        Self::new()
    }
}
