//! Guideline ingestion: download/process triggers, the delayed status refetch and the
//! sequential PDF upload loop.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::api::{Ack, DownloadRequest, GuidelinesStatus, PdfUpload, SocietyFilter, SystemStats};
use crate::client::GuidelinesClient;
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestAction {
    Download { society: SocietyFilter, force_redownload: bool },
    DownloadFromDrive { society: SocietyFilter, force_redownload: bool },
    Process,
    ProcessDrive,
}

impl IngestAction {
    pub fn label(self) -> &'static str {
        match self {
            IngestAction::Download { .. } => "Guideline download",
            IngestAction::DownloadFromDrive { .. } => "Drive download",
            IngestAction::Process => "Guideline processing",
            IngestAction::ProcessDrive => "Drive PDF processing",
        }
    }

    pub async fn run(self, client: &GuidelinesClient) -> Result<Ack, ApiError> {
        match self {
            IngestAction::Download { society, force_redownload } => {
                client
                    .download_guidelines(&DownloadRequest { society, force_redownload })
                    .await
            }
            IngestAction::DownloadFromDrive { society, force_redownload } => {
                client
                    .download_from_drive(&DownloadRequest { society, force_redownload })
                    .await
            }
            IngestAction::Process => client.process_guidelines().await,
            IngestAction::ProcessDrive => client.process_drive_pdfs().await,
        }
    }
}

/// `/stats` and `/guidelines/status`, fetched together.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestionSnapshot {
    pub stats: Option<SystemStats>,
    pub guidelines: Option<GuidelinesStatus>,
    /// First fetch error, if either call failed.
    pub error: Option<String>,
}

impl IngestionSnapshot {
    /// Processing is pointless until something has been downloaded.
    pub fn can_process(&self) -> bool {
        self.guidelines.as_ref().is_some_and(GuidelinesStatus::can_process)
    }
}

pub async fn fetch_snapshot(client: &GuidelinesClient) -> IngestionSnapshot {
    let (stats, guidelines) = futures::join!(client.stats(), client.guidelines_status());
    let mut error = None;
    let stats = stats
        .map_err(|e| {
            warn!(error = %e, "failed to fetch stats");
            error.get_or_insert(e.to_string());
        })
        .ok();
    let guidelines = guidelines
        .map_err(|e| {
            warn!(error = %e, "failed to fetch guidelines status");
            error.get_or_insert(e.to_string());
        })
        .ok();
    IngestionSnapshot { stats, guidelines, error }
}

/// Outcome line shown after an ingestion action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub ok: bool,
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BoardState {
    pub snapshot: IngestionSnapshot,
    pub notice: Option<Notice>,
    /// A delayed refetch is scheduled but has not landed yet.
    pub refresh_pending: bool,
}

/// Shared ingestion status for the status page.
#[derive(Clone, Default)]
pub struct IngestionBoard {
    state: Arc<RwLock<BoardState>>,
}

impl IngestionBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn state(&self) -> BoardState {
        self.state.read().await.clone()
    }

    pub async fn refresh(&self, client: &GuidelinesClient) -> IngestionSnapshot {
        let snapshot = fetch_snapshot(client).await;
        self.state.write().await.snapshot = snapshot.clone();
        snapshot
    }

    pub async fn set_notice(&self, ok: bool, text: impl Into<String>) {
        self.state.write().await.notice = Some(Notice { ok, text: text.into() });
    }

    pub async fn clear_notice(&self) {
        self.state.write().await.notice = None;
    }

    /// Refetch once the configured delay has passed. The trigger endpoints only
    /// acknowledge; there is nothing to wait on.
    pub async fn schedule_refresh(&self, client: &GuidelinesClient) -> JoinHandle<()> {
        self.state.write().await.refresh_pending = true;
        let board = self.clone();
        let client = client.clone();
        tokio::spawn(async move {
            tokio::time::sleep(client.config().refresh_delay).await;
            let snapshot = fetch_snapshot(&client).await;
            let mut state = board.state.write().await;
            state.snapshot = snapshot;
            state.refresh_pending = false;
        })
    }

    /// Fire an ingestion action. On acceptance a delayed refetch is scheduled; either way
    /// the outcome is posted as the board's notice.
    pub async fn trigger(&self, client: &GuidelinesClient, action: IngestAction) -> Result<Ack, ApiError> {
        match action.run(client).await {
            Ok(ack) => {
                info!(action = action.label(), "ingestion action accepted");
                let text = ack
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("{} started", action.label()));
                self.set_notice(true, text).await;
                self.schedule_refresh(client).await;
                Ok(ack)
            }
            Err(e) => {
                error!(action = action.label(), error = %e, "ingestion action failed");
                self.set_notice(false, format!("{} failed: {e}", action.label())).await;
                Err(e)
            }
        }
    }
}

// --- Upload ---

#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    pub file_name: String,
    /// `None` on success.
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UploadReport {
    pub outcomes: Vec<UploadOutcome>,
}

impl UploadReport {
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.error.is_none()).count()
    }

    pub fn failed(&self) -> usize {
        self.attempted() - self.succeeded()
    }

    pub fn message(&self) -> String {
        let mut message = format!(
            "Upload complete: {} of {} files uploaded",
            self.succeeded(),
            self.attempted()
        );
        if self.failed() > 0 {
            message.push_str(&format!(", {} failed", self.failed()));
        }
        message
    }
}

/// Uploads one file at a time, in order. A failure is logged and the loop moves on.
pub async fn upload_all(client: &GuidelinesClient, uploads: &[PdfUpload]) -> UploadReport {
    let mut report = UploadReport::default();
    for upload in uploads {
        let error = match client.upload_pdf(upload).await {
            Ok(_) => {
                info!(file = %upload.file_name, "uploaded guideline pdf");
                None
            }
            Err(e) => {
                error!(file = %upload.file_name, error = %e, "guideline upload failed");
                Some(e.to_string())
            }
        };
        report.outcomes.push(UploadOutcome {
            file_name: upload.file_name.clone(),
            error,
        });
    }
    report
}
