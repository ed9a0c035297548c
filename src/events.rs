//! Change notifications emitted by the upload coordinator.
//!
//! Observers subscribe to a broadcast channel. Sends never block and are
//! dropped silently when nobody is listening.

use crate::api_contracts::{AnalysisResult, ProjectStatus};
use crate::state::{AnalysisStep, UploadProgress};
use chrono::Utc;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum UploaderEvent {
    FileSelected {
        session_id: Uuid,
        filename: String,
        size: u64,
        at: String,
    },
    UploadProgress {
        session_id: Uuid,
        progress: UploadProgress,
    },
    UploadComplete {
        session_id: Uuid,
        file_id: Option<String>,
        at: String,
    },
    AnalysisStarted {
        session_id: Uuid,
        file_id: String,
        at: String,
    },
    StepsUpdated {
        session_id: Uuid,
        status: ProjectStatus,
        message: String,
        analysis_progress: u8,
        steps: Vec<AnalysisStep>,
    },
    AnalysisComplete {
        session_id: Uuid,
        result: AnalysisResult,
        at: String,
    },
    SessionFailed {
        session_id: Uuid,
        message: String,
        at: String,
    },
    SessionReset {
        session_id: Uuid,
    },
}

/// RFC 3339 timestamp for event payloads
pub fn now() -> String {
    Utc::now().to_rfc3339()
}

/// Cloneable sender side of the event channel
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<UploaderEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn emit(&self, event: UploaderEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UploaderEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
