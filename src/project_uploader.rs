use crate::api_contracts::{AnalysisTriggerResponse, ErrorResponse};
use crate::archive::SelectedFile;
use crate::config::{UploaderConfig, MIN_CHUNK_SIZE};
use crate::error::UploadError;
use futures::stream;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::debug;

/// API client for the GitGenei upload and analysis endpoints
pub struct ProjectUploader {
    base_url: String,
    access_token: Option<String>,
    session_cookie: Option<String>,
    request_timeout: std::time::Duration,
    max_file_size: u64,
    chunk_size: usize,
    client: reqwest::Client,
}

impl ProjectUploader {
    /// Create a client from configuration
    pub fn new(config: &UploaderConfig) -> Self {
        // No total timeout on the client: a multi-GB upload legitimately takes
        // minutes. Short calls set their own per-request timeout instead.
        let version = env!("CARGO_PKG_VERSION");
        let user_agent = format!("GitGeneiUploader/{}", version);

        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .user_agent(&user_agent)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: config.api_base_url.clone(),
            access_token: config.access_token.clone(),
            session_cookie: config.session_cookie.clone(),
            request_timeout: config.request_timeout(),
            max_file_size: config.max_file_size,
            chunk_size: config.chunk_size.max(MIN_CHUNK_SIZE),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn upload_url(&self) -> String {
        format!("{}/api/upload/project", self.base_url)
    }

    fn analyze_url(&self, file_id: &str) -> String {
        format!("{}/api/upload/analyze/{}", self.base_url, file_id)
    }

    fn status_url(&self, file_id: &str) -> String {
        format!("{}/api/upload/status/{}", self.base_url, file_id)
    }

    fn analysis_url(&self, file_id: &str) -> String {
        format!("{}/api/upload/analysis/{}", self.base_url, file_id)
    }

    fn project_url(&self, file_id: &str) -> String {
        format!("{}/api/upload/project/{}", self.base_url, file_id)
    }

    /// Attach whichever credentials are configured
    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let mut request = request;
        if let Some(ref token) = self.access_token {
            request = request.bearer_auth(token);
        }
        if let Some(ref cookie) = self.session_cookie {
            request = request.header(reqwest::header::COOKIE, cookie);
        }
        request
    }

    /// Upload an archive as multipart field `file`, streaming it from disk.
    ///
    /// `on_progress(bytes_sent, bytes_total)` is called once per chunk as the
    /// body is consumed. Returns the raw JSON response body.
    pub async fn upload_project<F>(
        &self,
        file: &SelectedFile,
        on_progress: F,
    ) -> Result<serde_json::Value, UploadError>
    where
        F: Fn(u64, u64) + Send + Sync + 'static,
    {
        file.validate(self.max_file_size)?;

        let handle = tokio::fs::File::open(&file.path).await?;
        let total = file.size;
        let chunk_size = self.chunk_size;
        let on_progress = Arc::new(on_progress);

        let body_stream = stream::try_unfold((handle, 0u64), move |(mut handle, sent)| {
            let on_progress = Arc::clone(&on_progress);
            async move {
                let mut buf = vec![0u8; chunk_size];
                let n = handle.read(&mut buf).await?;
                if n == 0 {
                    return Ok::<_, std::io::Error>(None);
                }
                buf.truncate(n);
                let sent = sent + n as u64;
                on_progress(sent, total);
                Ok(Some((buf, (handle, sent))))
            }
        });

        let part = reqwest::multipart::Part::stream_with_length(
            reqwest::Body::wrap_stream(body_stream),
            total,
        )
        .file_name(file.name.clone())
        .mime_str(&file.mime_type)?;

        let form = reqwest::multipart::Form::new().part("file", part);

        debug!(url = %self.upload_url(), filename = %file.name, size = total, "Uploading archive");

        let response = self
            .authorize(self.client.post(self.upload_url()))
            .header(reqwest::header::ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await?;

        let response = check_status(response).await?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Ask the backend to start analyzing an uploaded archive.
    /// A 2xx response means polling may begin.
    pub async fn start_analysis(&self, file_id: &str) -> Result<(), UploadError> {
        let url = self.analyze_url(file_id);
        debug!(%url, "Triggering analysis");

        let response = self
            .authorize(self.client.post(&url))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .timeout(self.request_timeout)
            .send()
            .await?;

        let response = check_status(response).await?;
        // The body is informational only; a 2xx is what matters
        let message = response
            .json::<AnalysisTriggerResponse>()
            .await
            .ok()
            .and_then(|body| body.message);
        debug!(?message, "Analysis trigger accepted");
        Ok(())
    }

    /// Fetch the current analysis status as raw JSON
    pub async fn get_status(&self, file_id: &str) -> Result<serde_json::Value, UploadError> {
        self.get_json(&self.status_url(file_id)).await
    }

    /// Fetch the full analysis results for a processed archive
    pub async fn get_analysis_results(&self, file_id: &str) -> Result<serde_json::Value, UploadError> {
        self.get_json(&self.analysis_url(file_id)).await
    }

    /// Delete an uploaded project and its server-side data
    pub async fn delete_project(&self, file_id: &str) -> Result<(), UploadError> {
        let response = self
            .authorize(self.client.delete(self.project_url(file_id)))
            .timeout(self.request_timeout)
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }

    async fn get_json(&self, url: &str) -> Result<serde_json::Value, UploadError> {
        let response = self
            .authorize(self.client.get(url))
            .timeout(self.request_timeout)
            .send()
            .await?;

        let response = check_status(response).await?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Turn a non-2xx response into `UploadError::Server`, using the backend's
/// `{"error": ...}` body when there is one.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, UploadError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&text)
        .map(|e| e.error)
        .unwrap_or_else(|_| {
            if text.is_empty() {
                status.canonical_reason().unwrap_or("Unknown error").to_string()
            } else {
                text
            }
        });

    Err(UploadError::Server { status: status.as_u16(), message })
}
