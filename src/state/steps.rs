//! Analysis steps: the display projection of server-reported stages.

use crate::api_contracts::ProjectStatus;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

/// One stage of the remote analysis pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisStep {
    pub id: String,
    pub name: String,
    pub status: StepStatus,
    pub description: String,
}

/// (id, name, initial description), in pipeline order
const STEP_DEFINITIONS: [(&str, &str, &str); 5] = [
    ("extract", "Extracting Files", "Unpacking your project files..."),
    ("scan", "Security Scan", "Checking for security issues..."),
    ("analyze", "AI Analysis", "Understanding project structure..."),
    ("organize", "Auto-Organize", "Creating optimal branch structure..."),
    ("github", "GitHub Setup", "Creating GitHub repository and pushing..."),
];

/// The five steps, all pending
pub fn initial_steps() -> Vec<AnalysisStep> {
    STEP_DEFINITIONS
        .iter()
        .map(|(id, name, description)| AnalysisStep {
            id: (*id).to_string(),
            name: (*name).to_string(),
            status: StepStatus::Pending,
            description: (*description).to_string(),
        })
        .collect()
}

/// Project a non-failure stage onto the steps.
///
/// Steps before the stage's step are completed, the stage's own step is
/// processing (and takes `message` as its description), later steps are
/// pending. `COMPLETED` completes everything. `FAILED` and unknown stages
/// leave the steps untouched.
pub fn project_stage(steps: &mut [AnalysisStep], status: ProjectStatus, message: &str) {
    match status {
        ProjectStatus::Completed => complete_all(steps),
        ProjectStatus::Failed | ProjectStatus::Unknown => {}
        _ => {
            let current = status.step_position();
            for (index, step) in steps.iter_mut().enumerate() {
                step.status = match current {
                    Some(pos) if index < pos => StepStatus::Completed,
                    Some(pos) if index == pos => {
                        step.description = message.to_string();
                        StepStatus::Processing
                    }
                    _ => StepStatus::Pending,
                };
            }
        }
    }
}

pub fn complete_all(steps: &mut [AnalysisStep]) {
    for step in steps.iter_mut() {
        step.status = StepStatus::Completed;
    }
}

/// Whatever was running when the backend gave up is marked as the error.
pub fn fail_processing(steps: &mut [AnalysisStep]) {
    for step in steps.iter_mut().filter(|s| s.status == StepStatus::Processing) {
        step.status = StepStatus::Error;
    }
}

pub fn step_status<'a>(steps: &'a [AnalysisStep], id: &str) -> Option<&'a StepStatus> {
    steps.iter().find(|s| s.id == id).map(|s| &s.status)
}
