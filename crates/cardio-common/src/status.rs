//! System status reducer.
//!
//! The health poller and the initialization poller both report into one
//! [`StatusReducer`]. Each request takes a sequence number from the shared counter
//! before it is sent; the reducer drops any result older than the last one it applied,
//! so a slow response can never overwrite a newer one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::api::{HealthResponse, InitializationStatusResponse};

pub type Seq = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InitializationStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Failed,
}

impl InitializationStatus {
    /// Unrecognised values read as `NotStarted`.
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "in_progress" => InitializationStatus::InProgress,
            "completed" => InitializationStatus::Completed,
            "failed" => InitializationStatus::Failed,
            _ => InitializationStatus::NotStarted,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InitializationStatus::NotStarted => "not_started",
            InitializationStatus::InProgress => "in_progress",
            InitializationStatus::Completed => "completed",
            InitializationStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, InitializationStatus::Completed | InitializationStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SystemStatus {
    pub initialized: bool,
    pub status: InitializationStatus,
    /// Percent, 0..=100.
    pub progress: u8,
}

impl SystemStatus {
    pub fn from_health(resp: &HealthResponse) -> Self {
        Self {
            initialized: resp.system_initialized,
            status: resp
                .initialization_status
                .as_deref()
                .map(InitializationStatus::parse)
                .unwrap_or_default(),
            progress: clamp_progress(resp.initialization_progress),
        }
    }

    /// A missing status on this endpoint means the run is still going.
    pub fn from_initialization(resp: &InitializationStatusResponse) -> Self {
        Self {
            initialized: resp.is_initialized,
            status: resp
                .status
                .as_deref()
                .map(InitializationStatus::parse)
                .unwrap_or(InitializationStatus::InProgress),
            progress: clamp_progress(resp.progress),
        }
    }
}

fn clamp_progress(progress: Option<f64>) -> u8 {
    match progress {
        Some(p) if p.is_finite() => p.round().clamp(0.0, 100.0) as u8,
        _ => 0,
    }
}

/// What the rest of the dashboard sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatusSnapshot {
    /// Outcome of the latest applied `/health` call.
    pub connected: bool,
    /// False until the first `/health` call settles.
    pub checked: bool,
    pub system: SystemStatus,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatusEvent {
    HealthSucceeded { seq: Seq, status: SystemStatus },
    HealthFailed { seq: Seq },
    Initialization { seq: Seq, status: SystemStatus },
    /// The service accepted `POST /system/initialize`.
    InitializeAccepted { seq: Seq },
}

impl StatusEvent {
    pub fn seq(&self) -> Seq {
        match *self {
            StatusEvent::HealthSucceeded { seq, .. }
            | StatusEvent::HealthFailed { seq }
            | StatusEvent::Initialization { seq, .. }
            | StatusEvent::InitializeAccepted { seq } => seq,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Applied,
    Stale,
}

/// Sequence-aware reducer over [`StatusEvent`]s.
///
/// Connectivity and system status are fenced separately: a health failure settles
/// connectivity but carries no status, so it must not block a later status update.
#[derive(Debug, Default)]
pub struct StatusReducer {
    snapshot: StatusSnapshot,
    last_health_seq: Seq,
    last_status_seq: Seq,
}

impl StatusReducer {
    pub fn snapshot(&self) -> StatusSnapshot {
        self.snapshot
    }

    pub fn apply(&mut self, event: StatusEvent) -> Applied {
        match event {
            StatusEvent::HealthSucceeded { seq, status } => {
                if seq <= self.last_health_seq {
                    return self.stale(event);
                }
                self.last_health_seq = seq;
                self.snapshot.connected = true;
                self.snapshot.checked = true;
                self.set_status(seq, status);
                Applied::Applied
            }
            StatusEvent::HealthFailed { seq } => {
                if seq <= self.last_health_seq {
                    return self.stale(event);
                }
                self.last_health_seq = seq;
                self.snapshot.connected = false;
                self.snapshot.checked = true;
                Applied::Applied
            }
            StatusEvent::Initialization { seq, status } => {
                if !self.set_status(seq, status) {
                    return self.stale(event);
                }
                Applied::Applied
            }
            StatusEvent::InitializeAccepted { seq } => {
                let status = SystemStatus {
                    initialized: self.snapshot.system.initialized,
                    status: InitializationStatus::InProgress,
                    progress: 0,
                };
                if !self.set_status(seq, status) {
                    return self.stale(event);
                }
                Applied::Applied
            }
        }
    }

    fn set_status(&mut self, seq: Seq, status: SystemStatus) -> bool {
        if seq <= self.last_status_seq {
            return false;
        }
        self.last_status_seq = seq;
        self.snapshot.system = status;
        true
    }

    fn stale(&self, event: StatusEvent) -> Applied {
        debug!(seq = event.seq(), "discarding stale status result");
        Applied::Stale
    }
}

/// Shared handle to the reducer plus the request sequence counter.
#[derive(Clone, Default)]
pub struct StatusStore {
    reducer: Arc<RwLock<StatusReducer>>,
    seq: Arc<AtomicU64>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the sequence number for a request about to be sent.
    pub fn next_seq(&self) -> Seq {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub async fn apply(&self, event: StatusEvent) -> Applied {
        self.reducer.write().await.apply(event)
    }

    pub async fn snapshot(&self) -> StatusSnapshot {
        self.reducer.read().await.snapshot()
    }
}
