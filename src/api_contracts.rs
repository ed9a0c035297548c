/**
 * API Contract Types for the GitGenei Uploader
 *
 * These types define the structure of API requests/responses between
 * the uploader (Rust) and the GitGenei backend's `/api/upload` endpoints.
 *
 * IMPORTANT: The backend speaks camelCase JSON. Keep the serde attributes in
 * sync with the controller responses.
 *
 * Principles:
 * - Use explicit Option<T> for every field the backend may omit or send as null
 * - Unknown fields are ignored so backend additions never break polling
 */

use serde::{Deserialize, Serialize};

// =============================================================================
// Upload Endpoint
// =============================================================================

/// Response from POST /api/upload/project
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub file_id: Option<String>,    // Polling key, absent on failure
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Error body returned by every endpoint on non-2xx
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

// =============================================================================
// Analysis Trigger Endpoint
// =============================================================================

/// Response from POST /api/upload/analyze/{fileId}
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisTriggerResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub file_id: Option<String>,
}

// =============================================================================
// Status Endpoint
// =============================================================================

/// Server-reported analysis stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    Uploaded,
    Extracting,
    SecurityScanning,
    Analyzing,
    Organizing,
    CreatingRepo,
    PushingToGithub,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl ProjectStatus {
    /// Index of the analysis step this stage is working on.
    ///
    /// `None` for stages that have no step of their own (`UPLOADED` comes
    /// before the first step; `COMPLETED`, `FAILED` and unknown stages are
    /// handled separately by the coordinator).
    pub fn step_position(self) -> Option<usize> {
        match self {
            ProjectStatus::Extracting => Some(0),
            ProjectStatus::SecurityScanning => Some(1),
            ProjectStatus::Analyzing => Some(2),
            ProjectStatus::Organizing => Some(3),
            ProjectStatus::CreatingRepo | ProjectStatus::PushingToGithub => Some(4),
            ProjectStatus::Uploaded
            | ProjectStatus::Completed
            | ProjectStatus::Failed
            | ProjectStatus::Unknown => None,
        }
    }

    /// Message shown when the server does not send a `statusMessage`.
    pub fn default_message(self) -> &'static str {
        match self {
            ProjectStatus::Uploaded => "File uploaded successfully",
            ProjectStatus::Extracting => "Extracting project files...",
            ProjectStatus::SecurityScanning => "Performing security scan...",
            ProjectStatus::Analyzing => "AI is analyzing your project...",
            ProjectStatus::Organizing => "Organizing project structure...",
            ProjectStatus::CreatingRepo => "Creating GitHub repository...",
            ProjectStatus::PushingToGithub => "Pushing to GitHub...",
            ProjectStatus::Completed => "Analysis completed successfully!",
            ProjectStatus::Failed => "Analysis failed",
            ProjectStatus::Unknown => "Processing...",
        }
    }
}

/// Response from GET /api/upload/status/{fileId}
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    #[serde(default)]
    pub file_id: Option<String>,
    pub status: ProjectStatus,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub analysis_progress: Option<u32>,     // 0-100
    #[serde(default)]
    pub status_message: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,      // Set by the backend on FAILED
    #[serde(default)]
    pub repository_url: Option<String>,
    #[serde(default)]
    pub github_repo_url: Option<String>,    // Older backends use this name
    #[serde(default)]
    pub branches: Option<serde_json::Value>,
}

impl StatusResponse {
    /// Status message, falling back to the stage default
    pub fn message(&self) -> String {
        self.status_message
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| self.status.default_message().to_string())
    }

    /// Reason for a FAILED stage: errorMessage, then statusMessage, then a generic fallback
    pub fn failure_message(&self) -> String {
        self.error_message
            .clone()
            .or_else(|| self.status_message.clone())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| ProjectStatus::Failed.default_message().to_string())
    }

    pub fn repo_url(&self) -> Option<String> {
        self.repository_url.clone().or_else(|| self.github_repo_url.clone())
    }

    /// Branch names, accepting either `["main"]` or `[{"name": "main"}]`
    pub fn branch_names(&self) -> Vec<String> {
        let Some(serde_json::Value::Array(items)) = &self.branches else {
            return Vec::new();
        };

        items
            .iter()
            .filter_map(|item| match item {
                serde_json::Value::String(name) => Some(name.clone()),
                serde_json::Value::Object(obj) => obj
                    .get("name")
                    .and_then(|n| n.as_str())
                    .map(String::from),
                _ => None,
            })
            .collect()
    }

    /// Clamped progress percentage
    pub fn progress(&self) -> u8 {
        self.analysis_progress.map(|p| p.min(100) as u8).unwrap_or(0)
    }
}

// =============================================================================
// Completion payload
// =============================================================================

/// Normalized payload handed to `on_analysis_complete`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub file_id: String,
    pub message: String,
    pub data: serde_json::Value,            // Raw terminal status payload
    pub repository_url: Option<String>,
    pub branches: Vec<String>,
}

// =============================================================================
// Tests
// =============================================================================
