//! Analysis status polling service
//!
//! Runs as a spawned task for exactly one session. Each tick fetches the
//! status, hands it to the coordinator, and stops on a terminal outcome, a
//! reset, or when the attempt budget is spent.

use crate::error::UploadError;
use crate::upload_coordinator::{PollOutcome, UploadCoordinator};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Polls `GET /api/upload/status/{id}` for a single session
pub struct StatusPoller {
    coordinator: UploadCoordinator,
    session_id: Uuid,
    file_id: String,
    interval: Duration,
    max_attempts: u32,
}

impl StatusPoller {
    pub fn new(
        coordinator: UploadCoordinator,
        session_id: Uuid,
        file_id: String,
        interval: Duration,
        max_attempts: u32,
    ) -> Self {
        Self {
            coordinator,
            session_id,
            file_id,
            interval: interval.max(Duration::from_millis(1)),
            max_attempts: max_attempts.max(1),
        }
    }

    /// Poll until the session settles. The first tick fires immediately.
    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = IntervalStream::new(interval);
        let mut attempts: u32 = 0;

        info!(
            session = %self.session_id,
            file_id = %self.file_id,
            interval_ms = self.interval.as_millis() as u64,
            max_attempts = self.max_attempts,
            "Polling analysis status"
        );

        while ticks.next().await.is_some() {
            if !self.coordinator.is_current(self.session_id) {
                debug!(session = %self.session_id, "Session replaced, polling stopped");
                return;
            }

            attempts += 1;
            match self.coordinator.uploader().get_status(&self.file_id).await {
                Ok(raw) => match self.coordinator.apply_status_for(Some(self.session_id), raw) {
                    PollOutcome::Continue => {}
                    outcome => {
                        debug!(session = %self.session_id, ?outcome, attempts, "Polling finished");
                        return;
                    }
                },
                // A single failed poll never ends the session
                Err(e) => warn!(
                    session = %self.session_id,
                    attempt = attempts,
                    error = %e,
                    "Status check failed, retrying"
                ),
            }

            if attempts >= self.max_attempts {
                let err = UploadError::PollTimeout { attempts };
                self.coordinator.fail(self.session_id, err.to_string());
                return;
            }
        }
    }
}
