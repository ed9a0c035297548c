//! Upload session state.
//!
//! This module contains the session record owned by the coordinator and
//! the analysis-step projection of server stages.

mod session;
pub mod steps;

pub use session::{percentage, SessionPhase, UploadProgress, UploadSession};
pub use steps::{AnalysisStep, StepStatus};
