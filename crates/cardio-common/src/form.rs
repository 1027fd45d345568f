//! Query form state: submit gating, in-flight tracking and late-response fencing.

use serde::Deserialize;
use tracing::debug;

use crate::api::PatientProfile;
use crate::error::ApiError;
use crate::status::StatusSnapshot;

pub type RequestId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    Search,
    Safety,
    Compliance,
}

impl FormKind {
    fn empty_message(self) -> &'static str {
        match self {
            FormKind::Search => "Please enter a search query",
            FormKind::Safety => "Please enter a clinical recommendation",
            FormKind::Compliance => "Please enter a clinical note",
        }
    }

    /// User-facing text for a failed call.
    pub fn failure_message(self, err: &ApiError) -> String {
        match (self, err) {
            (_, ApiError::Domain(message)) => message.clone(),
            (FormKind::Search, ApiError::Upstream { status, .. })
            | (FormKind::Search, ApiError::UpstreamBody { status, .. }) => {
                format!(
                    "Search failed: {} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or_default()
                )
                .trim_end()
                .to_string()
            }
            (FormKind::Search, _) => "Search failed. Please try again.".to_string(),
            (FormKind::Safety, _) => "Validation failed".to_string(),
            (FormKind::Compliance, _) => "Compliance check failed".to_string(),
        }
    }
}

/// Why a submission was refused before any request went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Blocked {
    #[error("{}", .0.empty_message())]
    EmptyInput(FormKind),
    #[error("API connection not available")]
    Disconnected,
    #[error("System not initialized. Please initialize the system first.")]
    NotInitialized,
    #[error("A request is already in progress")]
    InFlight,
}

/// Decides whether a form may submit. Checked in the order the messages are shown.
pub fn check_submit(
    kind: FormKind,
    input: &str,
    status: &StatusSnapshot,
    in_flight: bool,
) -> Result<(), Blocked> {
    if input.trim().is_empty() {
        return Err(Blocked::EmptyInput(kind));
    }
    if !status.connected {
        return Err(Blocked::Disconnected);
    }
    if !status.system.initialized {
        return Err(Blocked::NotInitialized);
    }
    if in_flight {
        return Err(Blocked::InFlight);
    }
    Ok(())
}

/// State behind one query page.
///
/// Every accepted submission gets a fresh [`RequestId`]; [`finish`](Self::finish) only
/// accepts the completion of the latest one.
#[derive(Debug, Clone)]
pub struct QueryForm<T> {
    kind: FormKind,
    input: String,
    result: Option<T>,
    error: Option<String>,
    in_flight: Option<RequestId>,
    latest: RequestId,
}

impl<T> QueryForm<T> {
    pub fn new(kind: FormKind) -> Self {
        Self {
            kind,
            input: String::new(),
            result: None,
            error: None,
            in_flight: None,
            latest: 0,
        }
    }

    pub fn kind(&self) -> FormKind {
        self.kind
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn result(&self) -> Option<&T> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Whether the submit control should be enabled right now.
    pub fn can_submit(&self, status: &StatusSnapshot) -> bool {
        check_submit(self.kind, &self.input, status, self.is_in_flight()).is_ok()
    }

    /// Start a submission. A refusal is surfaced as the form's error and leaves any
    /// shown result alone; an accepted submission clears both.
    pub fn begin(&mut self, input: &str, status: &StatusSnapshot) -> Result<RequestId, Blocked> {
        self.input = input.to_string();
        if let Err(blocked) = check_submit(self.kind, input, status, self.is_in_flight()) {
            self.error = Some(blocked.to_string());
            return Err(blocked);
        }
        self.latest += 1;
        self.in_flight = Some(self.latest);
        self.result = None;
        self.error = None;
        Ok(self.latest)
    }

    /// Record a completion. Returns false, changing nothing, when `id` is not the latest
    /// submission. On failure the previous result stays cleared.
    pub fn finish(&mut self, id: RequestId, outcome: Result<T, ApiError>) -> bool {
        if id != self.latest || self.in_flight != Some(id) {
            debug!(id, latest = self.latest, "discarding late response");
            return false;
        }
        self.in_flight = None;
        match outcome {
            Ok(result) => self.result = Some(result),
            Err(e) => {
                self.result = None;
                self.error = Some(self.kind.failure_message(&e));
            }
        }
        true
    }

    /// Release the form from submission `id` if it is still the one in flight. Its
    /// completion, should it ever arrive, is discarded.
    pub fn abandon(&mut self, id: RequestId) -> bool {
        if self.in_flight != Some(id) {
            return false;
        }
        debug!(id, "abandoning submission");
        self.in_flight = None;
        true
    }

    /// Manual escape from a request that never returns: forget whatever is in flight.
    pub fn cancel(&mut self) {
        if let Some(id) = self.in_flight.take() {
            debug!(id, "submission cancelled");
        }
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }
}

// --- Patient profile ---

/// Patient profile fields as typed into the safety form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PatientProfileInput {
    pub age: String,
    pub gender: String,
    pub comorbidities: String,
    pub current_medications: String,
    pub allergies: String,
    pub renal_function: String,
    pub hepatic_function: String,
}

impl PatientProfileInput {
    /// Blank or unparseable scalars become `None`; lists split on commas.
    pub fn parse(&self) -> PatientProfile {
        PatientProfile {
            age: parse_age(&self.age),
            gender: non_blank(&self.gender),
            comorbidities: split_list(&self.comorbidities),
            current_medications: split_list(&self.current_medications),
            allergies: split_list(&self.allergies),
            renal_function: self
                .renal_function
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite()),
            hepatic_function: non_blank(&self.hepatic_function),
        }
    }
}

fn parse_age(s: &str) -> Option<u32> {
    let s = s.trim();
    s.parse::<u32>().ok().or_else(|| {
        s.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v.trunc() as u32)
    })
}

fn non_blank(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
