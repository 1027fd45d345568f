//! Shared dashboard state, injected into handlers via the `State` extractor.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use cardio_common::api::{ComplianceReport, SafetyReport, Urgency};
use cardio_common::client::GuidelinesClient;
use cardio_common::dispatch::{ResponseType, SearchOutcome, DEFAULT_TOP_K};
use cardio_common::error::ApiError;
use cardio_common::form::{FormKind, PatientProfileInput, QueryForm};
use cardio_common::ingest::{IngestionBoard, UploadReport};
use cardio_common::poller::{self, PollerHandle};
use cardio_common::status::StatusStore;

/// A query page: form state plus the non-text controls last submitted.
#[derive(Debug)]
pub struct Page<T, P> {
    pub form: QueryForm<T>,
    pub params: P,
}

impl<T, P: Default> Page<T, P> {
    fn new(kind: FormKind) -> Mutex<Self> {
        Mutex::new(Self {
            form: QueryForm::new(kind),
            params: P::default(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct SearchParams {
    pub search_type: String,
    pub top_k: u32,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            search_type: "semantic".to_string(),
            top_k: DEFAULT_TOP_K,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnhancedParams {
    pub search_type: String,
    pub response_type: ResponseType,
    pub top_k: u32,
}

impl Default for EnhancedParams {
    fn default() -> Self {
        Self {
            search_type: "enhanced".to_string(),
            response_type: ResponseType::default(),
            top_k: DEFAULT_TOP_K,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SafetyParams {
    pub profile: PatientProfileInput,
}

#[derive(Debug, Clone, Default)]
pub struct ComplianceParams {
    pub urgency: Urgency,
}

pub struct Inner {
    pub client: GuidelinesClient,
    pub status: StatusStore,
    pub board: IngestionBoard,
    pub enhanced: Mutex<Page<SearchOutcome, EnhancedParams>>,
    pub search: Mutex<Page<SearchOutcome, SearchParams>>,
    pub safety: Mutex<Page<SafetyReport, SafetyParams>>,
    pub compliance: Mutex<Page<ComplianceReport, ComplianceParams>>,
    pub last_upload: Mutex<Option<UploadReport>>,
    /// Last rejected `POST /system/initialize`, shown in the banner.
    pub init_error: Mutex<Option<String>>,
    init_poller: Mutex<Option<PollerHandle>>,
    health_poller: Mutex<Option<PollerHandle>>,
}

#[derive(Clone)]
pub struct AppState(Arc<Inner>);

impl std::ops::Deref for AppState {
    type Target = Inner;

    fn deref(&self) -> &Inner {
        &self.0
    }
}

impl AppState {
    pub fn new(client: GuidelinesClient) -> Self {
        Self(Arc::new(Inner {
            client,
            status: StatusStore::new(),
            board: IngestionBoard::new(),
            enhanced: Page::new(FormKind::Search),
            search: Page::new(FormKind::Search),
            safety: Page::new(FormKind::Safety),
            compliance: Page::new(FormKind::Compliance),
            last_upload: Mutex::new(None),
            init_error: Mutex::new(None),
            init_poller: Mutex::new(None),
            health_poller: Mutex::new(None),
        }))
    }

    /// Start the background health poll. Calling again replaces the running poller.
    pub async fn start_health_poller(&self) {
        let handle = poller::spawn_health_poller(self.client.clone(), self.status.clone());
        *self.health_poller.lock().await = Some(handle);
    }

    /// Ask the service to initialize. An accepted request replaces any running
    /// initialization poller; a rejected one leaves it alone.
    pub async fn initialize(&self) -> Result<(), ApiError> {
        match poller::start_initialization(&self.client, &self.status).await {
            Ok(handle) => {
                if let Some(previous) = self.init_poller.lock().await.replace(handle) {
                    info!("replacing previous initialization poller");
                    previous.cancel();
                }
                *self.init_error.lock().await = None;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "initialization request failed");
                *self.init_error.lock().await = Some(format!("Initialization failed: {e}"));
                Err(e)
            }
        }
    }

    pub async fn is_init_polling(&self) -> bool {
        self.init_poller
            .lock()
            .await
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    pub async fn check_health(&self) {
        poller::check_health_once(&self.client, &self.status).await;
    }
}
