//! View models: everything the pages show, derived from the client's output.

use regex::RegexBuilder;

use cardio_common::api::{
    ComplianceReport, RelevantGuideline, SafetyAlert, SafetyReport, SearchResponse, Severity,
};
use cardio_common::dispatch::SearchOutcome;
use cardio_common::form::QueryForm;
use cardio_common::status::{InitializationStatus, StatusSnapshot};

pub const COMPLIANCE_GUIDELINE_LIMIT: usize = 5;
pub const ENHANCED_RESULT_LIMIT: usize = 5;

/// `0.42` -> `42.0%`; absent -> `N/A`.
pub fn percent(score: Option<f64>) -> String {
    match score {
        Some(s) if s.is_finite() => format!("{:.1}%", s * 100.0),
        _ => "N/A".to_string(),
    }
}

/// `0.87` -> `87%`.
pub fn whole_percent(score: f64) -> String {
    format!("{}%", (score * 100.0).round() as i64)
}

/// A run of result text, marked when it matches the query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Highlight {
    Plain(String),
    Marked(String),
}

/// Splits `text` around every case-insensitive occurrence of a query word longer than
/// two characters.
pub fn highlight(text: &str, query: &str) -> Vec<Highlight> {
    let words: Vec<String> = query
        .split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .map(regex::escape)
        .collect();
    let plain = || vec![Highlight::Plain(text.to_string())];
    if words.is_empty() {
        return plain();
    }
    let Ok(re) = RegexBuilder::new(&words.join("|")).case_insensitive(true).build() else {
        return plain();
    };

    let mut out = Vec::new();
    let mut last = 0;
    for m in re.find_iter(text) {
        if m.start() > last {
            out.push(Highlight::Plain(text[last..m.start()].to_string()));
        }
        out.push(Highlight::Marked(m.as_str().to_string()));
        last = m.end();
    }
    if last < text.len() || out.is_empty() {
        out.push(Highlight::Plain(text[last..].to_string()));
    }
    out
}

// --- Header ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitBanner {
    /// Nothing to show: the system is ready.
    None,
    Connecting,
    Disconnected,
    Initialize,
    Progress(u8),
    Retry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderView {
    pub api_label: &'static str,
    pub connected: bool,
    pub system_label: &'static str,
    pub banner: InitBanner,
}

impl HeaderView {
    pub fn new(status: &StatusSnapshot) -> Self {
        let system = &status.system;
        let system_label = if system.initialized {
            "System Ready"
        } else if system.status == InitializationStatus::InProgress {
            "Initializing..."
        } else {
            "Not Initialized"
        };
        let banner = if !status.checked {
            InitBanner::Connecting
        } else if !status.connected {
            InitBanner::Disconnected
        } else if system.initialized {
            InitBanner::None
        } else {
            match system.status {
                InitializationStatus::InProgress => InitBanner::Progress(system.progress),
                InitializationStatus::Failed => InitBanner::Retry,
                InitializationStatus::NotStarted | InitializationStatus::Completed => {
                    InitBanner::Initialize
                }
            }
        };
        Self {
            api_label: if status.connected { "API Connected" } else { "API Disconnected" },
            connected: status.connected,
            system_label,
            banner,
        }
    }
}

// --- Query pages ---

/// What a query page shows below its form.
#[derive(Debug)]
pub enum ResultState<'a, T> {
    Idle,
    Pending,
    Error(&'a str),
    /// The call succeeded with nothing to list.
    Empty,
    Ready(&'a T),
}

pub fn search_state(form: &QueryForm<SearchOutcome>) -> ResultState<'_, SearchOutcome> {
    result_state(form, SearchOutcome::is_empty)
}

pub fn result_state<'a, T>(form: &'a QueryForm<T>, is_empty: impl Fn(&T) -> bool) -> ResultState<'a, T> {
    if let Some(error) = form.error() {
        return ResultState::Error(error);
    }
    if form.is_in_flight() {
        return ResultState::Pending;
    }
    match form.result() {
        Some(result) if is_empty(result) => ResultState::Empty,
        Some(result) => ResultState::Ready(result),
        None => ResultState::Idle,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchStats {
    pub query: String,
    pub total: u64,
    pub search_time: Option<String>,
    pub medical_terms: Vec<String>,
}

impl SearchStats {
    pub fn new(resp: &SearchResponse, submitted: &str) -> Self {
        Self {
            query: resp.query.clone().unwrap_or_else(|| submitted.trim().to_string()),
            total: resp.total(),
            search_time: resp.search_time.map(|t| format!("{t:.2}s")),
            medical_terms: resp.medical_terms.clone(),
        }
    }
}

// --- Safety ---

#[derive(Debug, Clone)]
pub struct SafetyView<'a> {
    pub badge: &'static str,
    pub safe: bool,
    pub confidence: String,
    pub critical: usize,
    pub major: usize,
    pub moderate: usize,
    pub minor: usize,
    pub drug_interactions: usize,
    pub contraindications: usize,
    pub alerts: &'a [SafetyAlert],
}

impl<'a> SafetyView<'a> {
    pub fn new(report: &'a SafetyReport) -> Self {
        Self {
            badge: if report.is_safe { "SAFE" } else { "UNSAFE" },
            safe: report.is_safe,
            confidence: percent(Some(report.confidence_score)),
            critical: report.count_severity(Severity::Critical),
            major: report.count_severity(Severity::Major),
            moderate: report.count_severity(Severity::Moderate),
            minor: report.count_severity(Severity::Minor),
            drug_interactions: report.drug_interactions.len(),
            contraindications: report.contraindications.len(),
            alerts: &report.alerts,
        }
    }
}

// --- Compliance ---

#[derive(Debug, Clone)]
pub struct ComplianceView<'a> {
    pub report: &'a ComplianceReport,
    /// `SAFE` / `SAFETY CONCERNS`, when the report carries a safety summary.
    pub safety_badge: Option<&'static str>,
    pub shown: &'a [RelevantGuideline],
    pub hidden: usize,
}

impl<'a> ComplianceView<'a> {
    pub fn new(report: &'a ComplianceReport) -> Self {
        let guidelines = &report.relevant_guidelines;
        let shown = &guidelines[..guidelines.len().min(COMPLIANCE_GUIDELINE_LIMIT)];
        Self {
            report,
            safety_badge: report
                .safety_validation
                .as_ref()
                .map(|s| if s.is_safe { "SAFE" } else { "SAFETY CONCERNS" }),
            shown,
            hidden: guidelines.len() - shown.len(),
        }
    }

    pub fn more_label(&self) -> Option<String> {
        (self.hidden > 0).then(|| format!("+{} more guidelines", self.hidden))
    }
}

pub fn compliance_is_empty(report: &ComplianceReport) -> bool {
    report.relevant_guidelines.is_empty()
        && report.guideline_summary.total_guidelines == 0
        && report.safety_validation.is_none()
}
