//! Error type shared by the transport client and the upload coordinator.

use thiserror::Error;

/// Everything that can end an upload session (and a few things that can't).
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Unsupported file type: {0}. Please upload ZIP, TAR, TAR.GZ, RAR or 7Z archives")]
    UnsupportedFileType(String),

    #[error("File size ({size} bytes) exceeds the {max} byte limit")]
    FileTooLarge { size: u64, max: u64 },

    #[error("File is empty")]
    EmptyFile,

    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    InvalidResponse(String),

    #[error("Upload succeeded but no file ID received")]
    MissingFileId,

    #[error("{0}")]
    AnalysisFailed(String),

    #[error("Analysis timed out after {attempts} status checks")]
    PollTimeout { attempts: u32 },

    #[error("An upload is already in progress")]
    SessionActive,
}

impl From<serde_json::Error> for UploadError {
    fn from(e: serde_json::Error) -> Self {
        UploadError::InvalidResponse(e.to_string())
    }
}
