//! Integration test harness for a mock GitGenei backend
//!
//! This module provides utilities for running integration tests against mock servers
//! instead of requiring the real backend to be running.

use crate::config::UploaderConfig;
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::json;
use std::path::{Path, PathBuf};

/// A test harness that sets up a mock backend for integration testing
pub struct TestHarness {
    pub server: ServerGuard,
}

impl TestHarness {
    /// Create a new test harness with a mock server
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        Self { server }
    }

    /// Get the mock server URL
    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Config pointed at the mock server with fast polling
    pub fn config(&self) -> UploaderConfig {
        UploaderConfig {
            poll_interval_ms: 10,
            max_poll_attempts: 50,
            chunk_size: 1024,
            ..UploaderConfig::default()
        }
        .with_base_url(self.url())
    }

    /// Mock POST /api/upload/project returning a file id
    pub async fn mock_upload_success(&mut self, file_id: &str) -> Mock {
        self.server.mock("POST", "/api/upload/project")
            .match_header("content-type", Matcher::Regex(r"^multipart/form-data".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({
                "success": true,
                "fileId": file_id,
                "filename": "project.zip",
                "message": "File uploaded successfully. Analysis will begin shortly."
            }).to_string())
            .create_async()
            .await
    }

    /// Mock POST /api/upload/project with an arbitrary 200 body
    pub async fn mock_upload_body(&mut self, body: serde_json::Value) -> Mock {
        self.server.mock("POST", "/api/upload/project")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await
    }

    /// Mock POST /api/upload/project failing
    pub async fn mock_upload_failure(&mut self, status: usize, error_message: &str) -> Mock {
        self.server.mock("POST", "/api/upload/project")
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(json!({ "error": error_message }).to_string())
            .create_async()
            .await
    }

    /// Mock POST /api/upload/analyze/{file_id}
    pub async fn mock_trigger(&mut self, file_id: &str, status: usize) -> Mock {
        let body = if (200..300).contains(&status) {
            json!({ "success": true, "message": "Analysis started", "fileId": file_id })
        } else {
            json!({ "error": "Failed to start analysis: worker pool exhausted" })
        };

        self.server.mock("POST", format!("/api/upload/analyze/{}", file_id).as_str())
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await
    }

    /// Mock GET /api/upload/status/{file_id} with a fixed body
    pub async fn mock_status(&mut self, file_id: &str, body: serde_json::Value) -> Mock {
        self.server.mock("GET", format!("/api/upload/status/{}", file_id).as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await
    }

    /// Mock GET /api/upload/status/{file_id} failing
    pub async fn mock_status_error(&mut self, file_id: &str, status: usize) -> Mock {
        self.server.mock("GET", format!("/api/upload/status/{}", file_id).as_str())
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(json!({ "error": "Failed to get status" }).to_string())
            .create_async()
            .await
    }

    /// Mock GET /api/upload/analysis/{file_id}
    pub async fn mock_analysis_results(&mut self, file_id: &str, body: serde_json::Value) -> Mock {
        self.server.mock("GET", format!("/api/upload/analysis/{}", file_id).as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await
    }

    /// Mock DELETE /api/upload/project/{file_id}
    pub async fn mock_delete(&mut self, file_id: &str, status: usize) -> Mock {
        self.server.mock("DELETE", format!("/api/upload/project/{}", file_id).as_str())
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(json!({ "success": true, "message": "Project deleted successfully" }).to_string())
            .create_async()
            .await
    }
}

/// Write a fake archive of `size` bytes
pub fn create_test_archive(dir: &Path, name: &str, size: usize) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, vec![0x50u8; size]).unwrap();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::SelectedFile;
    use crate::error::UploadError;
    use crate::project_uploader::ProjectUploader;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_upload_project_with_mock_server() {
        let mut harness = TestHarness::new().await;
        let mock = harness.mock_upload_success("abc123").await;

        let temp_dir = TempDir::new().unwrap();
        let path = create_test_archive(temp_dir.path(), "project.zip", 10_000);
        let file = SelectedFile::from_path(&path).unwrap();

        let uploader = ProjectUploader::new(&harness.config());
        let last_sent = Arc::new(AtomicU64::new(0));
        let last_sent_clone = Arc::clone(&last_sent);

        let body = assert_ok!(
            uploader
                .upload_project(&file, move |sent, _total| {
                    last_sent_clone.store(sent, Ordering::SeqCst);
                })
                .await
        );

        assert_eq!(body["fileId"], "abc123");
        assert_eq!(last_sent.load(Ordering::SeqCst), 10_000);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_with_zero_chunk_size_sends_whole_file() {
        let mut harness = TestHarness::new().await;
        let mock = harness.mock_upload_success("abc123").await;

        let temp_dir = TempDir::new().unwrap();
        let path = create_test_archive(temp_dir.path(), "project.zip", 5000);
        let file = SelectedFile::from_path(&path).unwrap();

        let config = UploaderConfig { chunk_size: 0, ..harness.config() };
        let uploader = ProjectUploader::new(&config);
        let last_sent = Arc::new(AtomicU64::new(0));
        let last_sent_clone = Arc::clone(&last_sent);

        assert_ok!(
            uploader
                .upload_project(&file, move |sent, _total| {
                    last_sent_clone.store(sent, Ordering::SeqCst);
                })
                .await
        );

        assert_eq!(last_sent.load(Ordering::SeqCst), 5000);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_status_malformed_body() {
        let mut harness = TestHarness::new().await;
        let _mock = harness.server.mock("GET", "/api/upload/status/abc123")
            .with_status(200)
            .with_body("<html>gateway</html>")
            .create_async()
            .await;

        let uploader = ProjectUploader::new(&harness.config());
        let err = assert_err!(uploader.get_status("abc123").await);
        assert!(matches!(err, UploadError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_upload_sends_bearer_token() {
        let mut harness = TestHarness::new().await;
        let mock = harness.server.mock("POST", "/api/upload/project")
            .match_header("authorization", "Bearer test-token")
            .with_status(200)
            .with_body(json!({ "fileId": "abc123" }).to_string())
            .create_async()
            .await;

        let temp_dir = TempDir::new().unwrap();
        let path = create_test_archive(temp_dir.path(), "project.7z", 100);
        let file = SelectedFile::from_path(&path).unwrap();

        let config = UploaderConfig {
            access_token: Some("test-token".to_string()),
            ..harness.config()
        };
        let uploader = ProjectUploader::new(&config);

        assert_ok!(uploader.upload_project(&file, |_, _| {}).await);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_server_error_uses_error_body() {
        let mut harness = TestHarness::new().await;
        let _mock = harness.mock_upload_failure(400, "File failed security scan").await;

        let temp_dir = TempDir::new().unwrap();
        let path = create_test_archive(temp_dir.path(), "project.zip", 100);
        let file = SelectedFile::from_path(&path).unwrap();

        let uploader = ProjectUploader::new(&harness.config());
        let err = assert_err!(uploader.upload_project(&file, |_, _| {}).await);

        match err {
            UploadError::Server { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "File failed security scan");
            }
            other => panic!("Expected server error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_upload_rejects_bad_extension_without_request() {
        let mut harness = TestHarness::new().await;
        let mock = harness.server.mock("POST", "/api/upload/project")
            .expect(0)
            .create_async()
            .await;

        let temp_dir = TempDir::new().unwrap();
        let path = create_test_archive(temp_dir.path(), "project.exe", 100);
        let file = SelectedFile::from_path(&path).unwrap();

        let uploader = ProjectUploader::new(&harness.config());
        let err = assert_err!(uploader.upload_project(&file, |_, _| {}).await);

        assert!(matches!(err, UploadError::UnsupportedFileType(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_rejects_oversized_file() {
        let harness = TestHarness::new().await;

        let temp_dir = TempDir::new().unwrap();
        let path = create_test_archive(temp_dir.path(), "project.zip", 2048);
        let file = SelectedFile::from_path(&path).unwrap();

        let config = UploaderConfig { max_file_size: 1024, ..harness.config() };
        let uploader = ProjectUploader::new(&config);
        let err = assert_err!(uploader.upload_project(&file, |_, _| {}).await);

        assert!(matches!(err, UploadError::FileTooLarge { size: 2048, max: 1024 }));
    }

    #[tokio::test]
    async fn test_start_analysis_success_and_failure() {
        let mut harness = TestHarness::new().await;
        let _ok = harness.mock_trigger("good", 200).await;
        let _bad = harness.mock_trigger("bad", 500).await;

        let uploader = ProjectUploader::new(&harness.config());

        assert_ok!(uploader.start_analysis("good").await);

        let err = assert_err!(uploader.start_analysis("bad").await);
        assert!(matches!(err, UploadError::Server { status: 500, .. }));
        assert!(err.to_string().contains("worker pool exhausted"));
    }

    #[tokio::test]
    async fn test_get_status_with_mock() {
        let mut harness = TestHarness::new().await;
        let _mock = harness.mock_status("abc123", json!({
            "fileId": "abc123",
            "status": "ORGANIZING",
            "analysisProgress": 70
        })).await;

        let uploader = ProjectUploader::new(&harness.config());
        let status = assert_ok!(uploader.get_status("abc123").await);

        assert_eq!(status["status"], "ORGANIZING");
        assert_eq!(status["analysisProgress"], 70);
    }

    #[tokio::test]
    async fn test_get_status_not_found() {
        let mut harness = TestHarness::new().await;
        let _mock = harness.mock_status_error("missing", 404).await;

        let uploader = ProjectUploader::new(&harness.config());
        let err = assert_err!(uploader.get_status("missing").await);
        assert!(matches!(err, UploadError::Server { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_get_analysis_results_with_mock() {
        let mut harness = TestHarness::new().await;
        let _mock = harness.mock_analysis_results("abc123", json!({
            "projectType": "node",
            "branches": ["main", "frontend", "api"]
        })).await;

        let uploader = ProjectUploader::new(&harness.config());
        let results = assert_ok!(uploader.get_analysis_results("abc123").await);
        assert_eq!(results["branches"][2], "api");
    }

    #[tokio::test]
    async fn test_delete_project_with_mock() {
        let mut harness = TestHarness::new().await;
        let ok = harness.mock_delete("abc123", 200).await;
        let _missing = harness.mock_delete("gone", 404).await;

        let uploader = ProjectUploader::new(&harness.config());
        assert_ok!(uploader.delete_project("abc123").await);
        ok.assert_async().await;

        let err = assert_err!(uploader.delete_project("gone").await);
        assert!(matches!(err, UploadError::Server { status: 404, .. }));
    }
}
