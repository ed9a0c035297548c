//! Drives one project archive through upload and remote analysis.
//!
//! State machine: `Idle -> Uploading -> Analyzing -> {Completed, Failed}`,
//! `Idle -> Analyzing` for an archive uploaded earlier, and any state back to
//! `Idle` through [`UploadCoordinator::reset`].
//!
//! Every asynchronous continuation (progress chunks, the upload response, the
//! trigger response, each poll) carries the id of the session it was started
//! for and is dropped when that session has been reset or replaced.

use crate::api_contracts::{AnalysisResult, ProjectStatus, StatusResponse, UploadResponse};
use crate::archive::SelectedFile;
use crate::config::UploaderConfig;
use crate::error::UploadError;
use crate::events::{self, EventBus, UploaderEvent};
use crate::project_uploader::ProjectUploader;
use crate::services::StatusPoller;
use crate::state::steps::{complete_all, fail_processing, initial_steps, project_stage};
use crate::state::{SessionPhase, UploadProgress, UploadSession};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

const COMPLETION_MESSAGE: &str = "Your project has been pushed to GitHub with organized branches!";

pub type UploadCompleteCallback = Arc<dyn Fn(&serde_json::Value) + Send + Sync>;
pub type AnalysisCompleteCallback = Arc<dyn Fn(&AnalysisResult) + Send + Sync>;

/// Caller-supplied completion hooks, each fired at most once per session
#[derive(Clone, Default)]
pub struct UploadCallbacks {
    pub on_upload_complete: Option<UploadCompleteCallback>,
    pub on_analysis_complete: Option<AnalysisCompleteCallback>,
}

impl UploadCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_upload_complete<F>(mut self, f: F) -> Self
    where
        F: Fn(&serde_json::Value) + Send + Sync + 'static,
    {
        self.on_upload_complete = Some(Arc::new(f));
        self
    }

    pub fn on_analysis_complete<F>(mut self, f: F) -> Self
    where
        F: Fn(&AnalysisResult) + Send + Sync + 'static,
    {
        self.on_analysis_complete = Some(Arc::new(f));
        self
    }
}

/// What applying one status response did to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Non-terminal stage (or a response we could not use); keep polling
    Continue,
    Completed,
    Failed,
    /// The session is gone or no longer analyzing
    Stale,
}

/// Owns the single upload session and everything that mutates it
#[derive(Clone)]
pub struct UploadCoordinator {
    uploader: Arc<ProjectUploader>,
    session: Arc<Mutex<UploadSession>>,
    poll_task: Arc<Mutex<Option<JoinHandle<()>>>>,
    phase_tx: Arc<watch::Sender<SessionPhase>>,
    events: EventBus,
    callbacks: UploadCallbacks,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

impl UploadCoordinator {
    pub fn new(config: &UploaderConfig) -> Self {
        Self::with_uploader(Arc::new(ProjectUploader::new(config)), config)
    }

    pub fn with_uploader(uploader: Arc<ProjectUploader>, config: &UploaderConfig) -> Self {
        let (phase_tx, _rx) = watch::channel(SessionPhase::Idle);
        Self {
            uploader,
            session: Arc::new(Mutex::new(UploadSession::new())),
            poll_task: Arc::new(Mutex::new(None)),
            phase_tx: Arc::new(phase_tx),
            events: EventBus::new(),
            callbacks: UploadCallbacks::default(),
            poll_interval: config.poll_interval().max(MIN_POLL_INTERVAL),
            max_poll_attempts: config.max_poll_attempts.max(1),
        }
    }

    pub fn with_callbacks(mut self, callbacks: UploadCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    /// Snapshot of the current session
    pub fn session(&self) -> UploadSession {
        self.lock_session().clone()
    }

    pub fn phase(&self) -> SessionPhase {
        self.lock_session().phase
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UploaderEvent> {
        self.events.subscribe()
    }

    /// Whether a status poll task is currently alive
    pub fn is_polling(&self) -> bool {
        self.lock_poll_task()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Resolve once the session is no longer uploading or analyzing.
    pub async fn wait_for_outcome(&self) -> SessionPhase {
        let mut rx = self.phase_tx.subscribe();
        // Bound to a local so the borrowed Ref is dropped before `rx`
        let outcome = match rx.wait_for(|phase| !phase.is_active()).await {
            Ok(phase) => *phase,
            Err(_) => self.phase(),
        };
        outcome
    }

    pub(crate) fn uploader(&self) -> &ProjectUploader {
        &self.uploader
    }

    // -------------------------------------------------------------------------
    // Upload
    // -------------------------------------------------------------------------

    /// Select an archive and upload it.
    ///
    /// Rejected with [`UploadError::SessionActive`] while another session is
    /// uploading or analyzing. A finished session is reset implicitly.
    /// Returns once analysis polling has started, or with the error that
    /// failed the session (the session itself records the same failure).
    pub async fn select_file(&self, path: impl AsRef<Path>) -> Result<(), UploadError> {
        let session_id = self.begin_session(SessionPhase::Uploading)?;

        let file = match SelectedFile::from_path(path.as_ref()) {
            Ok(file) => file,
            Err(e) => {
                self.upload_failed(Some(session_id), &e.to_string());
                return Err(e);
            }
        };

        {
            let mut session = self.lock_session();
            if session.id == session_id {
                session.selected_file = Some(file.clone());
                session.progress = Some(UploadProgress::new(0, file.size));
            }
        }

        info!(session = %session_id, filename = %file.name, size = file.size, "Uploading project archive");
        self.events.emit(UploaderEvent::FileSelected {
            session_id,
            filename: file.name.clone(),
            size: file.size,
            at: events::now(),
        });

        let progress_target = self.clone();
        let upload = self
            .uploader
            .upload_project(&file, move |sent, total| {
                progress_target.record_progress(Some(session_id), sent, total);
            })
            .await;

        match upload {
            Ok(body) => self.upload_succeeded(Some(session_id), body).await,
            Err(e) => {
                self.upload_failed(Some(session_id), &e.to_string());
                Err(e)
            }
        }
    }

    /// Transport progress callback for the current upload
    pub fn on_upload_progress(&self, bytes_uploaded: u64, bytes_total: u64) {
        self.record_progress(None, bytes_uploaded, bytes_total);
    }

    /// Transport success callback for the current upload
    pub async fn on_upload_success(&self, response_body: serde_json::Value) -> Result<(), UploadError> {
        self.upload_succeeded(None, response_body).await
    }

    /// Transport error callback for the current upload
    pub fn on_upload_error(&self, message: &str) {
        self.upload_failed(None, message);
    }

    fn record_progress(&self, expected: Option<Uuid>, bytes_uploaded: u64, bytes_total: u64) {
        let progress = UploadProgress::new(bytes_uploaded, bytes_total);
        let session_id = {
            let mut session = self.lock_session();
            if !accepts(&session, expected, SessionPhase::Uploading) {
                return;
            }
            session.progress = Some(progress);
            session.id
        };

        debug!(
            session = %session_id,
            uploaded = bytes_uploaded,
            total = bytes_total,
            percentage = progress.percentage,
            "Upload progress"
        );
        self.events.emit(UploaderEvent::UploadProgress { session_id, progress });
    }

    async fn upload_succeeded(
        &self,
        expected: Option<Uuid>,
        body: serde_json::Value,
    ) -> Result<(), UploadError> {
        let session_id = {
            let mut session = self.lock_session();
            if !accepts(&session, expected, SessionPhase::Uploading) {
                debug!("Ignoring upload response for a session that is no longer uploading");
                return Ok(());
            }
            session.progress = None;
            session.id
        };

        let file_id = serde_json::from_value::<UploadResponse>(body.clone())
            .ok()
            .and_then(|response| response.file_id)
            .filter(|id| !id.is_empty());

        info!(session = %session_id, file_id = ?file_id, "Upload complete");

        if let Some(ref callback) = self.callbacks.on_upload_complete {
            callback(&body);
        }
        self.events.emit(UploaderEvent::UploadComplete {
            session_id,
            file_id: file_id.clone(),
            at: events::now(),
        });

        match file_id {
            Some(file_id) => self.begin_analysis(session_id, file_id).await,
            None => {
                let err = UploadError::MissingFileId;
                self.fail(session_id, err.to_string());
                Err(err)
            }
        }
    }

    fn upload_failed(&self, expected: Option<Uuid>, message: &str) {
        let session_id = {
            let mut session = self.lock_session();
            if !accepts(&session, expected, SessionPhase::Uploading) {
                return;
            }
            session.progress = None;
            session.id
        };
        self.fail(session_id, format!("Upload failed: {}", message));
    }

    // -------------------------------------------------------------------------
    // Analysis
    // -------------------------------------------------------------------------

    /// Trigger and track analysis of an archive that is already on the server.
    ///
    /// Starts a fresh session from `Idle`, `Completed` or `Failed`.
    pub async fn start_analysis(&self, file_id: &str) -> Result<(), UploadError> {
        let session_id = self.begin_session(SessionPhase::Analyzing)?;
        self.begin_analysis(session_id, file_id.to_string()).await
    }

    async fn begin_analysis(&self, session_id: Uuid, file_id: String) -> Result<(), UploadError> {
        {
            let mut session = self.lock_session();
            if session.id != session_id {
                return Ok(());
            }
            session.file_id = Some(file_id.clone());
            session.steps = initial_steps();
            session.analysis_progress = 0;
            session.status_message = None;
            session.progress = None;
            session.error = None;
            session.phase = SessionPhase::Analyzing;
        }
        self.publish_phase();

        info!(session = %session_id, %file_id, "Starting analysis");
        self.events.emit(UploaderEvent::AnalysisStarted {
            session_id,
            file_id: file_id.clone(),
            at: events::now(),
        });

        if let Err(e) = self.uploader.start_analysis(&file_id).await {
            self.fail(session_id, format!("Analysis failed: {}", e));
            return Err(e);
        }

        let poller = StatusPoller::new(
            self.clone(),
            session_id,
            file_id,
            self.poll_interval,
            self.max_poll_attempts,
        );
        let handle = tokio::spawn(poller.run());

        // Check and store under the session lock so a reset cannot slip in between
        let previous = {
            let session = self.lock_session();
            if session.id != session_id {
                handle.abort();
                return Ok(());
            }
            self.lock_poll_task().replace(handle)
        };
        if let Some(previous) = previous {
            previous.abort();
        }
        Ok(())
    }

    /// Apply one status payload to the current session
    pub fn apply_status(&self, raw: serde_json::Value) -> PollOutcome {
        self.apply_status_for(None, raw)
    }

    pub(crate) fn apply_status_for(&self, expected: Option<Uuid>, raw: serde_json::Value) -> PollOutcome {
        let status: StatusResponse = match serde_json::from_value(raw.clone()) {
            Ok(status) => status,
            Err(e) => {
                warn!(error = %e, "Ignoring unparseable status response");
                return PollOutcome::Continue;
            }
        };

        if status.status == ProjectStatus::Unknown {
            warn!(payload = %raw, "Ignoring unknown analysis stage");
            return PollOutcome::Continue;
        }

        let message = status.message();
        let mut completed = None;
        let mut failure = None;

        let (session_id, steps, analysis_progress) = {
            let mut session = self.lock_session();
            if !accepts(&session, expected, SessionPhase::Analyzing) {
                return PollOutcome::Stale;
            }

            session.analysis_progress = status.progress();
            session.status_message = Some(message.clone());

            match status.status {
                ProjectStatus::Completed => {
                    complete_all(&mut session.steps);
                    session.analysis_progress = 100;
                    let result = AnalysisResult {
                        file_id: session
                            .file_id
                            .clone()
                            .or_else(|| status.file_id.clone())
                            .unwrap_or_default(),
                        message: COMPLETION_MESSAGE.to_string(),
                        data: raw,
                        repository_url: status.repo_url(),
                        branches: status.branch_names(),
                    };
                    session.result = Some(result.clone());
                    session.phase = SessionPhase::Completed;
                    completed = Some(result);
                }
                ProjectStatus::Failed => {
                    fail_processing(&mut session.steps);
                    let reason = UploadError::AnalysisFailed(status.failure_message()).to_string();
                    session.error = Some(reason.clone());
                    session.phase = SessionPhase::Failed;
                    failure = Some(reason);
                }
                stage => project_stage(&mut session.steps, stage, &message),
            }

            (session.id, session.steps.clone(), session.analysis_progress)
        };

        debug!(session = %session_id, status = ?status.status, %message, "Analysis status");
        self.events.emit(UploaderEvent::StepsUpdated {
            session_id,
            status: status.status,
            message,
            analysis_progress,
            steps,
        });

        if let Some(result) = completed {
            info!(
                session = %session_id,
                repository = ?result.repository_url,
                branches = result.branches.len(),
                "Analysis completed"
            );
            if let Some(ref callback) = self.callbacks.on_analysis_complete {
                callback(&result);
            }
            self.events.emit(UploaderEvent::AnalysisComplete {
                session_id,
                result,
                at: events::now(),
            });
            self.publish_phase();
            return PollOutcome::Completed;
        }

        if let Some(reason) = failure {
            error!(session = %session_id, %reason, "Analysis failed");
            self.events.emit(UploaderEvent::SessionFailed {
                session_id,
                message: reason,
                at: events::now(),
            });
            self.publish_phase();
            return PollOutcome::Failed;
        }

        PollOutcome::Continue
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Cancel polling and return to an empty idle session. Always succeeds.
    pub fn reset(&self) {
        // Replace the session before taking the poll handle; a poll task
        // stored in between is then either seen as stale or aborted here
        let previous_id = {
            let mut session = self.lock_session();
            let previous_id = session.id;
            *session = UploadSession::new();
            previous_id
        };
        self.abort_polling();
        self.publish_phase();

        info!(session = %previous_id, "Session reset");
        self.events.emit(UploaderEvent::SessionReset { session_id: previous_id });
    }

    /// Replace a finished or idle session with a fresh one in `phase`.
    fn begin_session(&self, phase: SessionPhase) -> Result<Uuid, UploadError> {
        let (session_id, settled) = {
            let mut session = self.lock_session();
            if session.phase.is_active() {
                warn!(session = %session.id, phase = ?session.phase, "Rejecting new session while one is active");
                return Err(UploadError::SessionActive);
            }
            let settled = session.phase.is_terminal().then_some(session.id);
            *session = UploadSession::new();
            session.phase = phase;
            session.started_at = Some(events::now());
            (session.id, settled)
        };
        self.abort_polling();

        if let Some(previous_id) = settled {
            debug!(session = %previous_id, "Finished session replaced");
            self.events.emit(UploaderEvent::SessionReset { session_id: previous_id });
        }
        self.publish_phase();
        Ok(session_id)
    }

    /// Move `session_id` to `Failed`. No-op for stale or already settled sessions.
    pub(crate) fn fail(&self, session_id: Uuid, message: String) -> bool {
        {
            let mut session = self.lock_session();
            if session.id != session_id || !session.phase.is_active() {
                return false;
            }
            session.error = Some(message.clone());
            session.progress = None;
            session.phase = SessionPhase::Failed;
        }

        error!(session = %session_id, %message, "Session failed");
        self.events.emit(UploaderEvent::SessionFailed {
            session_id,
            message,
            at: events::now(),
        });
        self.publish_phase();
        true
    }

    pub(crate) fn is_current(&self, session_id: Uuid) -> bool {
        self.lock_session().id == session_id
    }

    fn abort_polling(&self) {
        if let Some(handle) = self.lock_poll_task().take() {
            handle.abort();
        }
    }

    /// Push the session's phase to `wait_for_outcome` watchers
    fn publish_phase(&self) {
        let phase = self.phase();
        self.phase_tx.send_replace(phase);
    }

    fn lock_session(&self) -> MutexGuard<'_, UploadSession> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_poll_task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.poll_task.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// `session` is in `phase` and, when an id is expected, is that session
fn accepts(session: &UploadSession, expected: Option<Uuid>, phase: SessionPhase) -> bool {
    session.phase == phase && expected.map_or(true, |id| id == session.id)
}
