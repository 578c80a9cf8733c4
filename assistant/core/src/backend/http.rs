//! HTTP Backend Implementation
//!
//! Chat backend for the claims assistant REST API.
//!
//! # Endpoints
//!
//! - `POST /api/chat/stream` - Streaming answer (server-sent events)
//! - `POST /api/chat` - Complete answer in one JSON response
//! - `GET /api/health`, `/api/config`, `/api/schema`, `/api/datasets`, `/api/documents`
//! - `GET /api/chat/history/{id}` - Stored conversation
//! - `POST /api/upload/csv`, `/api/upload/pdf` - Multipart file upload

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::traits::{ByteStream, ChatBackend};
use crate::config::{ClientConfig, DEFAULT_BASE_URL};
use crate::error::TransportError;
use crate::messages::{
    AgentResponse, ChatRequest, ConfigResponse, ConversationHistory, ConversationId,
    HealthResponse, UploadResponse,
};

/// Kind of file accepted by the upload endpoints
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadKind {
    /// Claims table, loaded into the SQL engine
    Csv,
    /// Plan document, indexed for retrieval
    Pdf,
}

impl UploadKind {
    /// Infer the upload kind from a file extension
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(Self::Csv),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    fn endpoint(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Pdf => "pdf",
        }
    }

    fn mime(self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Pdf => "application/pdf",
        }
    }
}

/// HTTP backend client
#[derive(Clone)]
pub struct HttpBackend {
    /// Base URL without trailing slash
    base_url: String,
    /// Timeout applied to non-streaming requests
    request_timeout: Duration,
    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpBackend {
    /// Create a backend for a base URL with default timeouts
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        let mut config = ClientConfig::default();
        config.base_url = base_url.into();
        Self::from_config(&config)
    }

    /// Create from a resolved [`ClientConfig`]
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self, TransportError> {
        // No overall timeout: answer streams may legitimately run for minutes.
        let http_client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            request_timeout: config.request_timeout,
            http_client,
        })
    }

    /// Get the base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    /// Fetch backend health details
    ///
    /// # Errors
    ///
    /// Returns an error on network failure, non-success status, or bad JSON.
    pub async fn health(&self) -> Result<HealthResponse, TransportError> {
        self.get_json("health").await
    }

    /// Fetch backend configuration
    ///
    /// # Errors
    ///
    /// Returns an error on network failure, non-success status, or bad JSON.
    pub async fn config(&self) -> Result<ConfigResponse, TransportError> {
        self.get_json("config").await
    }

    /// Fetch the claims database schema
    ///
    /// # Errors
    ///
    /// Returns an error on network failure, non-success status, or bad JSON.
    pub async fn schema(&self) -> Result<Value, TransportError> {
        self.get_json("schema").await
    }

    /// List loaded datasets
    ///
    /// # Errors
    ///
    /// Returns an error on network failure, non-success status, or bad JSON.
    pub async fn datasets(&self) -> Result<Value, TransportError> {
        self.get_json("datasets").await
    }

    /// List indexed documents
    ///
    /// # Errors
    ///
    /// Returns an error on network failure, non-success status, or bad JSON.
    pub async fn documents(&self) -> Result<Value, TransportError> {
        self.get_json("documents").await
    }

    /// Fetch the stored history of a conversation
    ///
    /// # Errors
    ///
    /// Returns an error on network failure, non-success status, or bad JSON.
    pub async fn history(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<ConversationHistory, TransportError> {
        self.get_json(&format!("chat/history/{conversation_id}"))
            .await
    }

    /// Upload a claims CSV
    ///
    /// # Errors
    ///
    /// Returns an error if the file is not a `.csv`, cannot be read, or the
    /// backend rejects it.
    pub async fn upload_csv(&self, path: &Path) -> Result<UploadResponse, TransportError> {
        self.upload(path, UploadKind::Csv).await
    }

    /// Upload a plan document PDF
    ///
    /// # Errors
    ///
    /// Returns an error if the file is not a `.pdf`, cannot be read, or the
    /// backend rejects it.
    pub async fn upload_pdf(&self, path: &Path) -> Result<UploadResponse, TransportError> {
        self.upload(path, UploadKind::Pdf).await
    }

    /// Upload a file to the endpoint matching `kind`
    ///
    /// # Errors
    ///
    /// Returns an error if the extension does not match `kind`, the file
    /// cannot be read, or the backend rejects it.
    pub async fn upload(
        &self,
        path: &Path,
        kind: UploadKind,
    ) -> Result<UploadResponse, TransportError> {
        if UploadKind::from_path(path) != Some(kind) {
            return Err(TransportError::InvalidUpload {
                path: path.to_path_buf(),
                reason: format!("file must be a {}", kind.endpoint().to_uppercase()),
            });
        }

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| TransportError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        tracing::info!(file = %file_name, bytes = data.len(), kind = ?kind, "Uploading file");

        let part = Part::bytes(data).file_name(file_name).mime_str(kind.mime())?;
        let form = Form::new().part("file", part);

        let response = self
            .http_client
            .post(self.url(&format!("upload/{}", kind.endpoint())))
            .timeout(self.request_timeout)
            .multipart(form)
            .send()
            .await?;

        read_json(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        let response = self
            .http_client
            .get(self.url(path))
            .timeout(self.request_timeout)
            .send()
            .await?;

        read_json(response).await
    }
}

impl Default for HttpBackend {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(120),
            http_client: reqwest::Client::new(),
        }
    }
}

/// Reject non-success responses with their body text
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(TransportError::Status {
        status: status.as_u16(),
        body: body.trim().to_string(),
    })
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, TransportError> {
    let response = check_status(response).await?;
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl ChatBackend for HttpBackend {
    fn name(&self) -> &str {
        "HTTP"
    }

    async fn health_check(&self) -> bool {
        self.http_client
            .get(self.url("health"))
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .is_ok_and(|r| r.status().is_success())
    }

    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream, TransportError> {
        tracing::debug!(
            conversation_id = %request.conversation_id,
            query_len = request.query.len(),
            "Opening answer stream"
        );

        let response = self
            .http_client
            .post(self.url("chat/stream"))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await?;

        let response = check_status(response).await?;
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(TransportError::from));

        Ok(Box::pin(stream))
    }

    async fn send(&self, request: &ChatRequest) -> Result<AgentResponse, TransportError> {
        let response = self
            .http_client
            .post(self.url("chat"))
            .timeout(self.request_timeout)
            .json(request)
            .send()
            .await?;

        read_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_backend_creation() {
        let backend = HttpBackend::new("http://localhost:8000/").unwrap();
        assert_eq!(backend.base_url(), "http://localhost:8000");
        assert_eq!(backend.url("chat/stream"), "http://localhost:8000/api/chat/stream");
    }

    #[test]
    fn test_from_config() {
        let mut config = ClientConfig::default();
        config.base_url = "https://claims.example.com".to_string();
        config.request_timeout = Duration::from_secs(3);
        let backend = HttpBackend::from_config(&config).unwrap();
        assert_eq!(backend.base_url(), "https://claims.example.com");
        assert_eq!(backend.request_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_upload_kind_from_path() {
        assert_eq!(UploadKind::from_path(Path::new("claims.csv")), Some(UploadKind::Csv));
        assert_eq!(UploadKind::from_path(Path::new("SBC.PDF")), Some(UploadKind::Pdf));
        assert_eq!(UploadKind::from_path(Path::new("notes.txt")), None);
        assert_eq!(UploadKind::from_path(Path::new("noext")), None);
    }

    #[tokio::test]
    async fn test_upload_rejects_wrong_extension() {
        let backend = HttpBackend::default();
        let result = backend.upload_csv(Path::new("plan.pdf")).await;
        assert!(matches!(result, Err(TransportError::InvalidUpload { .. })));
    }

    #[tokio::test]
    async fn test_upload_missing_file_is_io_error() {
        let backend = HttpBackend::default();
        let result = backend
            .upload_pdf(Path::new("/nonexistent/benefits.pdf"))
            .await;
        assert!(matches!(result, Err(TransportError::Io { .. })));
    }
}
