use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::api::{
    Ack, ComplianceReport, ComplianceRequest, DomainResult, DownloadRequest, GuidelinesStatus,
    HealthResponse, InitializationStatusResponse, PdfUpload, SafetyReport,
    SafetyValidationRequest, SearchResponse, SynthesizedResponse, SystemStats,
};
use crate::config::ApiClientConfig;
use crate::dispatch::{SearchOutcome, SearchRequest};
use crate::error::ApiError;

/// HTTP client for the guidelines service.
///
/// Every call is a single attempt; the only repetition in the dashboard comes from the
/// pollers. Cloning is cheap and shares the connection pool.
#[derive(Clone)]
pub struct GuidelinesClient {
    config: ApiClientConfig,
    http: reqwest::Client,
}

impl GuidelinesClient {
    pub fn new(config: ApiClientConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("cardio-dashboard/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ApiClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    // --- System ---

    pub async fn health(&self) -> Result<HealthResponse, ApiError> {
        self.get_json("/health").await
    }

    /// Ask the service to start initializing. The outcome is observed by polling
    /// [`initialization_status`](Self::initialization_status).
    pub async fn initialize(&self) -> Result<Ack, ApiError> {
        let ack: Ack = self.post_empty("/system/initialize").await?;
        check_domain(ack)
    }

    pub async fn initialization_status(&self) -> Result<InitializationStatusResponse, ApiError> {
        self.get_json("/system/initialization-status").await
    }

    pub async fn stats(&self) -> Result<SystemStats, ApiError> {
        self.get_json("/stats").await
    }

    pub async fn guidelines_status(&self) -> Result<GuidelinesStatus, ApiError> {
        self.get_json("/guidelines/status").await
    }

    // --- Queries ---

    /// Run a search; the endpoint and the decoded variant both follow from the mode.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchOutcome, ApiError> {
        let endpoint = request.endpoint();
        let body = request.body();
        debug!(endpoint = %endpoint, top_k = request.top_k, "search");
        if endpoint.is_synthesized() {
            let resp: SynthesizedResponse = self.post_json(endpoint.path(), &body).await?;
            Ok(SearchOutcome::Synthesized(check_domain(resp)?))
        } else {
            let resp: SearchResponse = self.post_json(endpoint.path(), &body).await?;
            Ok(SearchOutcome::Results(check_domain(resp)?))
        }
    }

    pub async fn validate_safety(
        &self,
        request: &SafetyValidationRequest,
    ) -> Result<SafetyReport, ApiError> {
        let report: SafetyReport = self.post_json("/safety/validate", request).await?;
        check_domain(report)
    }

    pub async fn check_compliance(
        &self,
        request: &ComplianceRequest,
    ) -> Result<ComplianceReport, ApiError> {
        let report: ComplianceReport = self.post_json("/compliance/check", request).await?;
        let report = check_domain(report)?;
        for mismatch in report.summary_mismatches() {
            warn!(mismatch = %mismatch, "compliance summary disagrees with guideline list");
        }
        Ok(report)
    }

    // --- Ingestion ---

    pub async fn download_guidelines(&self, request: &DownloadRequest) -> Result<Ack, ApiError> {
        let ack: Ack = self.post_json("/guidelines/download", request).await?;
        check_domain(ack)
    }

    pub async fn download_from_drive(&self, request: &DownloadRequest) -> Result<Ack, ApiError> {
        let ack: Ack = self.post_json("/guidelines/download-from-drive", request).await?;
        check_domain(ack)
    }

    pub async fn process_guidelines(&self) -> Result<Ack, ApiError> {
        let ack: Ack = self.post_empty("/guidelines/process").await?;
        check_domain(ack)
    }

    pub async fn process_drive_pdfs(&self) -> Result<Ack, ApiError> {
        let ack: Ack = self.post_empty("/guidelines/process-drive-pdfs").await?;
        check_domain(ack)
    }

    pub async fn upload_pdf(&self, upload: &PdfUpload) -> Result<Ack, ApiError> {
        let file = reqwest::multipart::Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str("application/pdf")?;
        let mut form = reqwest::multipart::Form::new()
            .part("file", file)
            .text("society", upload.society.as_str())
            .text("guideline_name", upload.guideline_name.clone());
        if let Some(year) = upload.year {
            form = form.text("year", year.to_string());
        }

        let url = self.config.url("/guidelines/upload-pdf");
        debug!(file = %upload.file_name, bytes = upload.bytes.len(), "uploading guideline pdf");
        let resp = self.with_timeout(self.http.post(&url).multipart(form)).send().await?;
        let ack: Ack = self.parse_json_response(resp).await?;
        check_domain(ack)
    }

    // --- Plumbing ---

    fn with_timeout(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.request_timeout {
            Some(timeout) => builder.timeout(timeout),
            None => builder,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.config.url(path);
        let resp = self.with_timeout(self.http.get(&url)).send().await?;
        self.parse_json_response(resp).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.config.url(path);
        let resp = self.with_timeout(self.http.post(&url).json(body)).send().await?;
        self.parse_json_response(resp).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.config.url(path);
        let resp = self
            .with_timeout(
                self.http
                    .post(&url)
                    .header(reqwest::header::CONTENT_TYPE, "application/json"),
            )
            .send()
            .await?;
        self.parse_json_response(resp).await
    }

    async fn parse_json_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, ApiError> {
        if !resp.status().is_success() {
            return Err(to_upstream_error(resp, self.config.max_error_body_bytes).await);
        }
        let bytes = resp.bytes().await?;
        // Acks are sometimes empty; treat an empty body as `{}`.
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::from_slice(b"{}")?);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn check_domain<T: DomainResult>(value: T) -> Result<T, ApiError> {
    match value.domain_error() {
        Some(message) => Err(ApiError::Domain(message.to_string())),
        None => Ok(value),
    }
}

async fn to_upstream_error(resp: reqwest::Response, max_error_body_bytes: usize) -> ApiError {
    let status = resp.status();
    let body = read_limited_text(resp, max_error_body_bytes).await;
    match error_message(&body) {
        Some(message) => ApiError::Upstream { status, message },
        None => ApiError::UpstreamBody { status, body },
    }
}

/// Pulls a human-readable message out of the service's error envelopes
/// (`{"detail": ...}`, `{"error": ...}` or `{"message": ...}`).
fn error_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct Envelope {
        detail: Option<serde_json::Value>,
        error: Option<String>,
        message: Option<String>,
    }

    let envelope: Envelope = serde_json::from_str(body).ok()?;
    let detail = envelope.detail.and_then(|d| match d {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    });
    detail
        .or(envelope.error)
        .or(envelope.message)
        .filter(|m| !m.trim().is_empty())
}

/// Reads an error body chunk by chunk and stops once `max_bytes` are buffered, so an
/// oversized body is never held in full.
async fn read_limited_text(mut resp: reqwest::Response, max_bytes: usize) -> String {
    let mut buf = Vec::with_capacity(max_bytes.min(1024));
    loop {
        match resp.chunk().await {
            Ok(Some(chunk)) => {
                if fill_capped(&mut buf, &chunk, max_bytes) {
                    debug!(max_bytes, "error body truncated");
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, read = buf.len(), "error body read interrupted");
                if buf.is_empty() {
                    return "<unreadable error body>".to_string();
                }
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Appends as much of `chunk` as fits under `cap`; true once the cap is reached.
fn fill_capped(buf: &mut Vec<u8>, chunk: &[u8], cap: usize) -> bool {
    let room = cap.saturating_sub(buf.len());
    buf.extend_from_slice(&chunk[..chunk.len().min(room)]);
    buf.len() >= cap
}
