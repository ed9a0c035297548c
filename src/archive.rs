//! Project archive metadata and boundary validation.
//!
//! The backend only accepts a handful of archive formats up to 5 GiB. The
//! transport checks these limits before opening a connection so a rejected
//! file never costs a request.

use crate::error::UploadError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Accepted archive extensions (matched case-insensitively)
pub const ALLOWED_EXTENSIONS: [&str; 5] = [".zip", ".tar", ".tar.gz", ".rar", ".7z"];

/// 5 GiB
pub const MAX_ARCHIVE_SIZE: u64 = 5 * 1024 * 1024 * 1024;

/// The archive chosen by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedFile {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub path: PathBuf,
}

impl SelectedFile {
    /// Read name and size from disk
    pub fn from_path(path: &Path) -> Result<Self, UploadError> {
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(UploadError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a file", path.display()),
            )));
        }

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| UploadError::UnsupportedFileType(path.display().to_string()))?
            .to_string();

        Ok(Self {
            mime_type: mime_for(&name).to_string(),
            name,
            size: metadata.len(),
            path: path.to_path_buf(),
        })
    }

    /// Check extension, emptiness and size against `max_size`
    pub fn validate(&self, max_size: u64) -> Result<(), UploadError> {
        if !has_allowed_extension(&self.name) {
            return Err(UploadError::UnsupportedFileType(self.name.clone()));
        }
        if self.size == 0 {
            return Err(UploadError::EmptyFile);
        }
        if self.size > max_size {
            return Err(UploadError::FileTooLarge { size: self.size, max: max_size });
        }
        Ok(())
    }
}

pub fn has_allowed_extension(name: &str) -> bool {
    let lower = name.to_lowercase();
    ALLOWED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// MIME type sent with the multipart part
pub fn mime_for(name: &str) -> &'static str {
    let lower = name.to_lowercase();
    if lower.ends_with(".tar.gz") {
        "application/gzip"
    } else if lower.ends_with(".zip") {
        "application/zip"
    } else if lower.ends_with(".tar") {
        "application/x-tar"
    } else if lower.ends_with(".rar") {
        "application/x-rar-compressed"
    } else if lower.ends_with(".7z") {
        "application/x-7z-compressed"
    } else {
        "application/octet-stream"
    }
}
