//! Router assembly and handlers.
//!
//! Query pages are plain HTML forms: `GET` renders the page's current state, `POST`
//! runs one submission through the form gate and renders the outcome. Action routes
//! (initialize, ingestion triggers, uploads) redirect back to the page they came from.

use std::future::Future;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use leptos::tachys::view::any_view::AnyView;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use cardio_common::api::{
    ComplianceRequest, PdfUpload, SafetyValidationRequest, SocietyFilter, Urgency,
};
use cardio_common::dispatch::{normalize_top_k, ResponseType, SearchMode, SearchRequest};
use cardio_common::error::ApiError;
use cardio_common::form::{PatientProfileInput, RequestId};
use cardio_common::ingest::{upload_all, IngestAction};
use cardio_common::status::{InitializationStatus, StatusSnapshot};

use crate::error::AppError;
use crate::html::{self, Chrome, Tab};
use crate::state::{
    AppState, ComplianceParams, EnhancedParams, Inner, Page, SafetyParams, SearchParams,
};
use crate::view::HeaderView;

const STATUS_PAGE_REFRESH_SECS: u64 = 30;

pub fn app(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(|| async { Redirect::to(Tab::Enhanced.path()) }))
        .route("/enhanced", get(enhanced_page).post(enhanced_submit))
        .route("/search", get(search_page).post(search_submit))
        .route("/safety", get(safety_page).post(safety_submit))
        .route("/compliance", get(compliance_page).post(compliance_submit))
        .route("/status", get(status_page))
        .route("/status/download", post(download))
        .route("/status/download-drive", post(download_from_drive))
        .route("/status/process", post(process))
        .route("/status/process-drive", post(process_drive))
        .route(
            "/status/upload",
            post(upload).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/system/initialize", post(initialize))
        .route("/system/health-check", post(health_check))
        .route("/api/status", get(api_status))
        .with_state(state)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Upload(_) => StatusCode::BAD_REQUEST,
            AppError::Api(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        warn!(error = %self, "request failed");
        (status, self.to_string()).into_response()
    }
}

// --- Rendering helpers ---

async fn chrome(state: &AppState, status: &StatusSnapshot, page_refresh: Option<u64>) -> Chrome {
    let init_refresh = (status.system.status == InitializationStatus::InProgress
        && !status.system.initialized)
        .then(|| state.client.config().init_poll_interval.as_secs().max(1));
    Chrome {
        header: HeaderView::new(status),
        init_error: state.init_error.lock().await.clone(),
        api_base: state.client.base_url().to_string(),
        refresh_secs: init_refresh.or(page_refresh),
    }
}

async fn render<T, P>(
    state: &AppState,
    tab: Tab,
    slot: &Mutex<Page<T, P>>,
    body: impl FnOnce(&Page<T, P>, bool) -> AnyView,
) -> Html<String> {
    let status = state.status.snapshot().await;
    let chrome = chrome(state, &status, None).await;
    let page = slot.lock().await;
    let can_submit = page.form.can_submit(&status);
    Html(html::document(&chrome, tab, body(&*page, can_submit)))
}

/// Picks one query page out of the shared state.
type Slot<T, P> = for<'a> fn(&'a Inner) -> &'a Mutex<Page<T, P>>;

/// Releases the page if the submission is dropped before it completes, which is what
/// happens when the browser goes away mid-request.
struct PendingSubmission<T: Send + 'static, P: Send + 'static> {
    state: AppState,
    slot: Slot<T, P>,
    id: Option<RequestId>,
}

impl<T: Send + 'static, P: Send + 'static> Drop for PendingSubmission<T, P> {
    fn drop(&mut self) {
        let Some(id) = self.id.take() else {
            return;
        };
        let slot = self.slot;
        if let Ok(mut page) = slot(&self.state).try_lock() {
            page.form.abandon(id);
            return;
        }
        let state = self.state.clone();
        tokio::spawn(async move {
            slot(&state).lock().await.form.abandon(id);
        });
    }
}

/// Runs one submission: gate, call, then record the completion if it is still current.
async fn submit<T, P, F, Fut>(
    state: &AppState,
    slot: Slot<T, P>,
    status: &StatusSnapshot,
    input: &str,
    params: P,
    call: F,
) where
    T: Send + 'static,
    P: Send + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let begun = {
        let mut page = slot(state).lock().await;
        page.params = params;
        page.form.begin(input, status)
    };
    let id = match begun {
        Ok(id) => id,
        Err(blocked) => {
            debug!(reason = %blocked, "submission blocked");
            return;
        }
    };
    let mut pending = PendingSubmission {
        state: state.clone(),
        slot,
        id: Some(id),
    };
    let outcome = call().await;
    slot(state).lock().await.form.finish(id, outcome);
    pending.id = None;
}

/// The page's dismiss control: clears the error banner, or gives up on a request that
/// is still pending so the form can be used again.
async fn release<T, P>(slot: &Mutex<Page<T, P>>) {
    let mut page = slot.lock().await;
    page.form.dismiss_error();
    page.form.cancel();
}

// --- Enhanced search ---

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EnhancedInput {
    query: String,
    search_type: String,
    response_type: String,
    top_k: u32,
    dismiss: Option<String>,
}

async fn enhanced_page(State(state): State<AppState>) -> Html<String> {
    render(&state, Tab::Enhanced, &state.enhanced, html::render_enhanced).await
}

async fn enhanced_submit(State(state): State<AppState>, Form(input): Form<EnhancedInput>) -> Html<String> {
    if input.dismiss.is_some() {
        release(&state.enhanced).await;
        return enhanced_page(State(state)).await;
    }
    let response_type = ResponseType::parse(&input.response_type).unwrap_or_default();
    let mode = SearchMode::enhanced(&input.search_type, response_type)
        .unwrap_or(SearchMode::Enhanced(response_type));
    let params = EnhancedParams {
        search_type: enhanced_key(mode).to_string(),
        response_type,
        top_k: normalize_top_k(input.top_k),
    };
    let request = SearchRequest::new(mode, &input.query, params.top_k);
    let status = state.status.snapshot().await;
    submit(&state, |s| &s.enhanced, &status, &input.query, params, || state.client.search(&request)).await;
    enhanced_page(State(state)).await
}

fn enhanced_key(mode: SearchMode) -> &'static str {
    match mode {
        SearchMode::ClinicalEnhanced(_) => "clinical",
        SearchMode::Standard => "standard",
        _ => "enhanced",
    }
}

// --- Standard search ---

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchInput {
    query: String,
    search_type: String,
    top_k: u32,
    dismiss: Option<String>,
}

async fn search_page(State(state): State<AppState>) -> Html<String> {
    render(&state, Tab::Search, &state.search, html::render_search).await
}

async fn search_submit(State(state): State<AppState>, Form(input): Form<SearchInput>) -> Html<String> {
    if input.dismiss.is_some() {
        release(&state.search).await;
        return search_page(State(state)).await;
    }
    let (mode, key) = match SearchMode::standard(&input.search_type) {
        Some(mode) => (mode, input.search_type.trim().to_string()),
        None => (SearchMode::Semantic, "semantic".to_string()),
    };
    let params = SearchParams {
        search_type: key,
        top_k: normalize_top_k(input.top_k),
    };
    let request = SearchRequest::new(mode, &input.query, params.top_k);
    let status = state.status.snapshot().await;
    submit(&state, |s| &s.search, &status, &input.query, params, || state.client.search(&request)).await;
    search_page(State(state)).await
}

// --- Safety ---

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SafetyInput {
    recommendation: String,
    #[serde(flatten)]
    profile: PatientProfileInput,
    dismiss: Option<String>,
}

async fn safety_page(State(state): State<AppState>) -> Html<String> {
    render(&state, Tab::Safety, &state.safety, html::render_safety).await
}

async fn safety_submit(State(state): State<AppState>, Form(input): Form<SafetyInput>) -> Html<String> {
    if input.dismiss.is_some() {
        release(&state.safety).await;
        return safety_page(State(state)).await;
    }
    let request = SafetyValidationRequest {
        recommendation: input.recommendation.trim().to_string(),
        patient_profile: input.profile.parse(),
        include_guidelines: true,
    };
    let params = SafetyParams {
        profile: input.profile,
    };
    let status = state.status.snapshot().await;
    submit(&state, |s| &s.safety, &status, &input.recommendation, params, || {
        state.client.validate_safety(&request)
    })
    .await;
    safety_page(State(state)).await
}

// --- Compliance ---

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ComplianceInput {
    patient_note: String,
    urgency: String,
    dismiss: Option<String>,
}

async fn compliance_page(State(state): State<AppState>) -> Html<String> {
    render(&state, Tab::Compliance, &state.compliance, html::render_compliance).await
}

async fn compliance_submit(
    State(state): State<AppState>,
    Form(input): Form<ComplianceInput>,
) -> Html<String> {
    if input.dismiss.is_some() {
        release(&state.compliance).await;
        return compliance_page(State(state)).await;
    }
    let urgency = Urgency::parse(&input.urgency).unwrap_or_default();
    let request = ComplianceRequest {
        patient_note: input.patient_note.trim().to_string(),
        check_safety: true,
        urgency,
    };
    let status = state.status.snapshot().await;
    submit(
        &state,
        |s| &s.compliance,
        &status,
        &input.patient_note,
        ComplianceParams { urgency },
        || state.client.check_compliance(&request),
    )
    .await;
    compliance_page(State(state)).await
}

// --- System status and ingestion ---

async fn status_page(State(state): State<AppState>) -> Html<String> {
    state.board.refresh(&state.client).await;
    let board = state.board.state().await;
    let refresh = if board.refresh_pending {
        state.client.config().refresh_delay.as_secs() + 1
    } else {
        STATUS_PAGE_REFRESH_SECS
    };
    let status = state.status.snapshot().await;
    let chrome = chrome(&state, &status, Some(refresh)).await;
    let last_upload = state.last_upload.lock().await.clone();
    Html(html::document(
        &chrome,
        Tab::Status,
        html::render_status(&board, last_upload.as_ref()),
    ))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DownloadInput {
    society: String,
    force_redownload: Option<String>,
}

impl DownloadInput {
    fn society(&self) -> SocietyFilter {
        SocietyFilter::parse(&self.society).unwrap_or_default()
    }

    fn force(&self) -> bool {
        self.force_redownload.is_some()
    }
}

async fn run_action(state: &AppState, action: IngestAction) -> Redirect {
    // The outcome lands on the board as a notice; the status page shows it.
    let _ = state.board.trigger(&state.client, action).await;
    Redirect::to(Tab::Status.path())
}

async fn download(State(state): State<AppState>, Form(input): Form<DownloadInput>) -> Redirect {
    let action = IngestAction::Download {
        society: input.society(),
        force_redownload: input.force(),
    };
    run_action(&state, action).await
}

async fn download_from_drive(State(state): State<AppState>, Form(input): Form<DownloadInput>) -> Redirect {
    let action = IngestAction::DownloadFromDrive {
        society: input.society(),
        force_redownload: input.force(),
    };
    run_action(&state, action).await
}

async fn process(State(state): State<AppState>) -> Redirect {
    run_action(&state, IngestAction::Process).await
}

async fn process_drive(State(state): State<AppState>) -> Redirect {
    run_action(&state, IngestAction::ProcessDrive).await
}

async fn upload(State(state): State<AppState>, multipart: Multipart) -> Result<Redirect, AppError> {
    let uploads = read_uploads(multipart).await?;
    if uploads.is_empty() {
        state.board.set_notice(false, "Select at least one PDF to upload").await;
        return Ok(Redirect::to(Tab::Status.path()));
    }
    info!(files = uploads.len(), "uploading guideline pdfs");
    let report = upload_all(&state.client, &uploads).await;
    state
        .board
        .set_notice(report.failed() == 0, report.message())
        .await;
    *state.last_upload.lock().await = Some(report);
    state.board.schedule_refresh(&state.client).await;
    Ok(Redirect::to(Tab::Status.path()))
}

/// Collects the upload form. A typed guideline name only applies to a single file;
/// with several files each one is named after its file stem.
async fn read_uploads(mut multipart: Multipart) -> Result<Vec<PdfUpload>, AppError> {
    let mut files = Vec::new();
    let mut society = SocietyFilter::default();
    let mut year = None;
    let mut guideline_name = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Upload(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(|e| AppError::Upload(e.to_string()))?;
                if !file_name.is_empty() && !bytes.is_empty() {
                    files.push((file_name, bytes.to_vec()));
                }
            }
            "society" | "year" | "guideline_name" => {
                let value = field.text().await.map_err(|e| AppError::Upload(e.to_string()))?;
                let value = value.trim();
                match name.as_str() {
                    "society" => society = SocietyFilter::parse(value).unwrap_or_default(),
                    "year" => year = value.parse::<u16>().ok(),
                    _ => guideline_name = Some(value.to_string()).filter(|v| !v.is_empty()),
                }
            }
            _ => {}
        }
    }

    let single = files.len() == 1;
    Ok(files
        .into_iter()
        .map(|(file_name, bytes)| {
            let mut upload = PdfUpload::new(&file_name, bytes, society, year);
            if let (true, Some(name)) = (single, &guideline_name) {
                upload.guideline_name = name.clone();
            }
            upload
        })
        .collect())
}

// --- System actions ---

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NextInput {
    next: String,
}

impl NextInput {
    fn redirect(&self) -> Redirect {
        Redirect::to(Tab::from_path(&self.next).unwrap_or(Tab::Enhanced).path())
    }
}

async fn initialize(State(state): State<AppState>, Form(input): Form<NextInput>) -> Redirect {
    // A rejection is kept on the state and shown in the banner.
    let _ = state.initialize().await;
    input.redirect()
}

async fn health_check(State(state): State<AppState>, Form(input): Form<NextInput>) -> Redirect {
    state.check_health().await;
    input.redirect()
}

async fn api_status(State(state): State<AppState>) -> Json<serde_json::Value> {
    let status = state.status.snapshot().await;
    let board = state.board.state().await;
    Json(serde_json::json!({
        "status": status,
        "initialization_polling": state.is_init_polling().await,
        "guidelines": board,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardio_common::dispatch::SearchOutcome;
    use cardio_common::mock::MockBackend;
    use serde_json::json;
    use std::time::Duration;

    async fn serve(backend: &MockBackend) -> (AppState, String) {
        let state = AppState::new(backend.client());
        let app = app(state.clone(), 1024 * 1024);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (state, format!("http://{addr}"))
    }

    fn browser() -> reqwest::Client {
        reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap()
    }

    fn ready_backend(backend: &MockBackend) {
        backend.respond(
            "/health",
            200,
            json!({"system_initialized": true, "initialization_status": "completed", "initialization_progress": 100}),
        );
    }

    #[tokio::test]
    async fn root_redirects_to_enhanced() {
        let backend = MockBackend::start().await;
        let (_state, base) = serve(&backend).await;
        let resp = browser().get(format!("{base}/")).send().await.unwrap();
        assert!(resp.status().is_redirection());
        assert_eq!(resp.headers()["location"], "/enhanced");
    }

    #[tokio::test]
    async fn blank_query_sends_nothing_upstream() {
        let backend = MockBackend::start().await;
        ready_backend(&backend);
        let (state, base) = serve(&backend).await;
        state.check_health().await;

        let body = browser()
            .post(format!("{base}/search"))
            .form(&[("query", "   "), ("search_type", "clinical"), ("top_k", "10")])
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.contains("Please enter a search query"));
        assert_eq!(backend.hits("/search/clinical"), 0);
        assert_eq!(backend.hits("/search"), 0);
    }

    #[tokio::test]
    async fn clinical_search_renders_results() {
        let backend = MockBackend::start().await;
        ready_backend(&backend);
        backend.respond(
            "/search/clinical",
            200,
            json!({"results": [{"text": "Rate control with beta blockers", "score": 0.7}], "total_results": 1}),
        );
        let (state, base) = serve(&backend).await;
        state.check_health().await;

        let body = browser()
            .post(format!("{base}/search"))
            .form(&[("query", "rate control"), ("search_type", "clinical"), ("top_k", "5")])
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.contains("<mark>Rate</mark>"));
        assert!(body.contains("<mark>control</mark>"));
        assert!(body.contains(" with beta blockers"));
        assert!(body.contains("Relevance: 70.0%"));
        let seen = backend.requests("/search/clinical");
        assert_eq!(seen, vec![json!({"question": "rate control", "top_k": 5})]);
    }

    #[tokio::test]
    async fn dropped_submission_releases_the_form() {
        let backend = MockBackend::start().await;
        ready_backend(&backend);
        backend.respond("/search", 200, json!({"results": [], "total_results": 0}));
        let (state, _base) = serve(&backend).await;
        state.check_health().await;
        let status = state.status.snapshot().await;

        let hung = tokio::spawn({
            let state = state.clone();
            async move {
                submit(&state, |s| &s.search, &status, "AF", SearchParams::default(), || {
                    std::future::pending::<Result<SearchOutcome, ApiError>>()
                })
                .await;
            }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(state.search.lock().await.form.is_in_flight());

        hung.abort();
        let _ = hung.await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!state.search.lock().await.form.is_in_flight());

        let request = SearchRequest::new(SearchMode::Semantic, "AF", 10);
        submit(&state, |s| &s.search, &status, "AF", SearchParams::default(), || {
            state.client.search(&request)
        })
        .await;
        let page = state.search.lock().await;
        assert!(page.form.error().is_none());
        assert!(page.form.result().is_some());
        assert_eq!(backend.hits("/search"), 1);
    }

    #[tokio::test]
    async fn dismiss_cancels_a_pending_search() {
        let backend = MockBackend::start().await;
        ready_backend(&backend);
        let (state, base) = serve(&backend).await;
        state.check_health().await;
        let status = state.status.snapshot().await;
        state.search.lock().await.form.begin("AF", &status).unwrap();

        let pending = browser().get(format!("{base}/search")).send().await.unwrap().text().await.unwrap();
        assert!(pending.contains(">Cancel<"));

        let body = browser()
            .post(format!("{base}/search"))
            .form(&[("dismiss", "1")])
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(!body.contains(">Cancel<"));
        assert!(!state.search.lock().await.form.is_in_flight());
    }

    #[tokio::test]
    async fn search_blocked_until_initialized() {
        let backend = MockBackend::start().await;
        backend.respond("/health", 200, json!({"system_initialized": false}));
        let (state, base) = serve(&backend).await;
        state.check_health().await;

        let body = browser()
            .post(format!("{base}/enhanced"))
            .form(&[("query", "AF"), ("search_type", "enhanced")])
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.contains("System not initialized. Please initialize the system first."));
        assert!(body.contains("Initialize System"));
        assert_eq!(backend.hits("/search/enhanced"), 0);
    }

    #[tokio::test]
    async fn safety_form_posts_parsed_profile() {
        let backend = MockBackend::start().await;
        ready_backend(&backend);
        backend.respond(
            "/safety/validate",
            200,
            json!({"is_safe": false, "confidence_score": 0.42, "alerts": [{"severity": "critical", "message": "Bleeding"}]}),
        );
        let (state, base) = serve(&backend).await;
        state.check_health().await;

        let body = browser()
            .post(format!("{base}/safety"))
            .form(&[
                ("recommendation", "Start warfarin"),
                ("age", "80"),
                ("comorbidities", "CKD, AF"),
                ("renal_function", ""),
            ])
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.contains("UNSAFE"));
        assert!(body.contains("42.0%"));

        let sent = &backend.requests("/safety/validate")[0];
        assert_eq!(sent["include_guidelines"], true);
        assert_eq!(sent["patient_profile"]["age"], 80);
        assert_eq!(sent["patient_profile"]["comorbidities"], json!(["CKD", "AF"]));
        assert!(sent["patient_profile"]["renal_function"].is_null());
    }

    #[tokio::test]
    async fn initialize_then_poll_to_ready() {
        let backend = MockBackend::start().await;
        backend.respond("/health", 200, json!({"system_initialized": false, "initialization_status": "not_started"}));
        backend.respond("/system/initialize", 200, json!({"message": "started"}));
        backend.respond(
            "/system/initialization-status",
            200,
            json!({"is_initialized": true, "status": "completed", "progress": 100}),
        );
        let (state, base) = serve(&backend).await;
        state.check_health().await;

        let resp = browser()
            .post(format!("{base}/system/initialize"))
            .form(&[("next", "/compliance")])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.headers()["location"], "/compliance");

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!state.is_init_polling().await);
        assert_eq!(backend.hits("/system/initialization-status"), 1);
        let snap = state.status.snapshot().await;
        assert!(snap.system.initialized);

        let status: serde_json::Value = browser()
            .get(format!("{base}/api/status"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(status["status"]["system"]["status"], "completed");
    }

    #[tokio::test]
    async fn upload_reports_each_file() {
        let backend = MockBackend::start().await;
        backend.respond_sequence(
            "/guidelines/upload-pdf",
            vec![(500, json!({"detail": "bad pdf"})), (200, json!({"message": "ok"}))],
        );
        let (state, base) = serve(&backend).await;

        let part = |name: &str| {
            reqwest::multipart::Part::bytes(b"%PDF-1.7".to_vec())
                .file_name(name.to_string())
                .mime_str("application/pdf")
                .unwrap()
        };
        let form = reqwest::multipart::Form::new()
            .part("file", part("one.pdf"))
            .part("file", part("two.pdf"))
            .text("society", "esc")
            .text("year", "2024")
            .text("guideline_name", "ignored for many files");
        let resp = browser()
            .post(format!("{base}/status/upload"))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.headers()["location"], "/status");
        assert_eq!(backend.hits("/guidelines/upload-pdf"), 2);

        let report = state.last_upload.lock().await.clone().unwrap();
        assert_eq!(report.message(), "Upload complete: 1 of 2 files uploaded, 1 failed");
        let second = String::from_utf8_lossy(&backend.raw_requests("/guidelines/upload-pdf")[1]).to_string();
        assert!(second.contains("two\r\n"));
    }
}
