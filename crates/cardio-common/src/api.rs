//! Wire types for the guidelines service.
//!
//! Responses are decoded leniently: every field defaults when absent or `null` so a
//! partial body renders blanks instead of failing the whole call. Only the structure the
//! dashboard actually reads is modelled; the rest is ignored.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Implemented by response bodies that can carry an application-level `error` field
/// on an otherwise successful (2xx) response.
pub trait DomainResult {
    fn domain_error(&self) -> Option<&str>;
}

macro_rules! domain_result {
    ($($ty:ty),* $(,)?) => {
        $(impl DomainResult for $ty {
            fn domain_error(&self) -> Option<&str> {
                self.error.as_deref().filter(|e| !e.trim().is_empty())
            }
        })*
    };
}

domain_result!(
    SearchResponse,
    SynthesizedResponse,
    SafetyReport,
    ComplianceReport,
    Ack,
);

// --- System status ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthResponse {
    #[serde(deserialize_with = "lenient::or_default")]
    pub system_initialized: bool,
    pub initialization_status: Option<String>,
    pub initialization_progress: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InitializationStatusResponse {
    #[serde(deserialize_with = "lenient::or_default")]
    pub is_initialized: bool,
    pub status: Option<String>,
    pub progress: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Ack {
    pub message: Option<String>,
    pub status: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemStats {
    #[serde(deserialize_with = "lenient::or_default")]
    pub system_status: StatsSystemStatus,
    #[serde(deserialize_with = "lenient::or_default")]
    pub guidelines: AvailableGuidelines,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsSystemStatus {
    #[serde(deserialize_with = "lenient::or_default")]
    pub initialized: bool,
    pub initialization_status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AvailableGuidelines {
    #[serde(deserialize_with = "lenient::or_default")]
    pub total_available: u64,
    #[serde(deserialize_with = "lenient::or_default")]
    pub esc_available: u64,
    #[serde(deserialize_with = "lenient::or_default")]
    pub acc_aha_available: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GuidelinesStatus {
    #[serde(deserialize_with = "lenient::or_default")]
    pub vector_store_exists: bool,
    #[serde(deserialize_with = "lenient::or_default")]
    pub downloaded: SocietyCounts,
    #[serde(deserialize_with = "lenient::or_default")]
    pub processed: SocietyCounts,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SocietyCounts {
    #[serde(deserialize_with = "lenient::or_default")]
    pub total: u64,
    #[serde(deserialize_with = "lenient::or_default")]
    pub esc: u64,
    #[serde(deserialize_with = "lenient::or_default")]
    pub acc_aha: u64,
}

impl GuidelinesStatus {
    /// `processed / downloaded` as a percentage; 0 when nothing has been downloaded.
    pub fn processing_percent(&self) -> f64 {
        if self.downloaded.total == 0 {
            return 0.0;
        }
        (self.processed.total as f64 / self.downloaded.total as f64 * 100.0).min(100.0)
    }

    pub fn can_process(&self) -> bool {
        self.downloaded.total > 0
    }
}

// --- Societies and evidence ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Society {
    #[serde(rename = "ESC")]
    Esc,
    #[serde(rename = "ACC_AHA")]
    AccAha,
    #[serde(other)]
    Other,
}

impl Society {
    pub fn label(self) -> &'static str {
        match self {
            Society::Esc => "ESC",
            Society::AccAha => "ACC/AHA",
            Society::Other => "Other",
        }
    }
}

/// Society selector for download triggers and uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocietyFilter {
    #[default]
    All,
    Esc,
    AccAha,
}

impl SocietyFilter {
    pub const ALL: [SocietyFilter; 3] = [SocietyFilter::All, SocietyFilter::Esc, SocietyFilter::AccAha];

    pub fn as_str(self) -> &'static str {
        match self {
            SocietyFilter::All => "all",
            SocietyFilter::Esc => "esc",
            SocietyFilter::AccAha => "acc_aha",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == s.trim())
    }
}

impl fmt::Display for SocietyFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Search ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResult {
    pub chunk_id: Option<String>,
    pub text: Option<String>,
    pub content: Option<String>,
    pub highlighted_text: Option<String>,
    pub score: Option<f64>,
    pub relevance_score: Option<f64>,
    pub society: Option<Society>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub year: Option<String>,
    pub evidence_class: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub page_number: Option<String>,
    pub section: Option<String>,
    pub section_title: Option<String>,
    pub document_name: Option<String>,
    pub source: Option<String>,
    pub guideline_name: Option<String>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl SearchResult {
    pub fn display_text(&self) -> &str {
        self.highlighted_text
            .as_deref()
            .or(self.text.as_deref())
            .or(self.content.as_deref())
            .unwrap_or("No content available")
    }

    pub fn relevance(&self) -> Option<f64> {
        self.relevance_score.or(self.score)
    }

    pub fn document(&self) -> &str {
        self.document_name
            .as_deref()
            .or(self.source.as_deref())
            .or(self.guideline_name.as_deref())
            .unwrap_or("Unknown Document")
    }

    pub fn section_label(&self) -> &str {
        self.section_title
            .as_deref()
            .or(self.section.as_deref())
            .unwrap_or("General")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResponse {
    pub query: Option<String>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub results: Vec<SearchResult>,
    pub total_results: Option<u64>,
    pub search_time: Option<f64>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub medical_terms: Vec<String>,
    pub error: Option<String>,
}

impl SearchResponse {
    pub fn total(&self) -> u64 {
        self.total_results.unwrap_or(self.results.len() as u64)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Citation {
    #[serde(deserialize_with = "lenient::opt_string")]
    pub id: Option<String>,
    pub guideline: Option<String>,
    pub society: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub year: Option<String>,
    pub evidence_class: Option<String>,
    pub text: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub page: Option<String>,
    pub section: Option<String>,
    pub pdf_link: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceSummary {
    #[serde(deserialize_with = "lenient::or_default")]
    pub societies: BTreeMap<String, u64>,
    pub quality_score: Option<f64>,
}

/// Body of `/search/enhanced` and `/clinical-search/enhanced`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesizedResponse {
    pub query: Option<String>,
    pub question: Option<String>,
    pub synthesized_answer: Option<String>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub citations: Vec<Citation>,
    pub evidence_summary: Option<EvidenceSummary>,
    pub confidence: Option<f64>,
    pub response_type: Option<String>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub results: Vec<SearchResult>,
    pub error: Option<String>,
}

// --- Safety ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub comorbidities: Vec<String>,
    pub current_medications: Vec<String>,
    pub allergies: Vec<String>,
    /// eGFR in mL/min/1.73m².
    pub renal_function: Option<f64>,
    pub hepatic_function: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SafetyValidationRequest {
    pub recommendation: String,
    pub patient_profile: PatientProfile,
    pub include_guidelines: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Major,
    Moderate,
    Minor,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Major => "major",
            Severity::Moderate => "moderate",
            Severity::Minor => "minor",
            Severity::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyAlert {
    #[serde(deserialize_with = "lenient::or_default")]
    pub severity: Severity,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub message: Option<String>,
    pub recommendation: Option<String>,
    pub evidence: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyReport {
    #[serde(deserialize_with = "lenient::or_default")]
    pub is_safe: bool,
    #[serde(deserialize_with = "lenient::or_default")]
    pub confidence_score: f64,
    #[serde(deserialize_with = "lenient::or_default")]
    pub alerts: Vec<SafetyAlert>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub drug_interactions: Vec<serde_json::Value>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub contraindications: Vec<serde_json::Value>,
    pub error: Option<String>,
}

impl SafetyReport {
    pub fn count_severity(&self, severity: Severity) -> usize {
        self.alerts.iter().filter(|a| a.severity == severity).count()
    }
}

// --- Compliance ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    #[default]
    Routine,
    Urgent,
    Emergency,
}

impl Urgency {
    pub const ALL: [Urgency; 3] = [Urgency::Routine, Urgency::Urgent, Urgency::Emergency];

    pub fn as_str(self) -> &'static str {
        match self {
            Urgency::Routine => "routine",
            Urgency::Urgent => "urgent",
            Urgency::Emergency => "emergency",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|u| u.as_str() == s.trim())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ComplianceRequest {
    pub patient_note: String,
    pub check_safety: bool,
    pub urgency: Urgency,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicalContext {
    #[serde(deserialize_with = "lenient::or_default")]
    pub diseases: Vec<String>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub drugs: Vec<String>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub procedures: Vec<String>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub symptoms: Vec<String>,
    pub urgency_level: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceLevels {
    #[serde(deserialize_with = "lenient::or_default")]
    pub class_i: u64,
    #[serde(deserialize_with = "lenient::or_default")]
    pub class_iia: u64,
    #[serde(deserialize_with = "lenient::or_default")]
    pub class_iib: u64,
    #[serde(deserialize_with = "lenient::or_default")]
    pub class_iii: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GuidelineSummary {
    #[serde(deserialize_with = "lenient::or_default")]
    pub total_guidelines: u64,
    #[serde(deserialize_with = "lenient::or_default")]
    pub esc_guidelines: u64,
    #[serde(deserialize_with = "lenient::or_default")]
    pub acc_aha_guidelines: u64,
    #[serde(deserialize_with = "lenient::or_default")]
    pub evidence_levels: EvidenceLevels,
}

/// Compact safety summary embedded in a compliance report (counts, not lists).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetySummary {
    #[serde(deserialize_with = "lenient::or_default")]
    pub is_safe: bool,
    #[serde(deserialize_with = "lenient::or_default")]
    pub confidence_score: f64,
    #[serde(deserialize_with = "lenient::or_default")]
    pub critical_alerts: u64,
    #[serde(deserialize_with = "lenient::or_default")]
    pub major_alerts: u64,
    #[serde(deserialize_with = "lenient::or_default")]
    pub drug_interactions: u64,
    #[serde(deserialize_with = "lenient::or_default")]
    pub contraindications: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelevantGuideline {
    #[serde(deserialize_with = "lenient::opt_string")]
    pub chunk_id: Option<String>,
    pub society: Option<Society>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub year: Option<String>,
    pub evidence_class: Option<String>,
    pub score: Option<f64>,
    pub guideline_name: Option<String>,
    pub text: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub page_number: Option<String>,
    pub section_type: Option<String>,
    pub retrieval_method: Option<String>,
}

impl RelevantGuideline {
    /// Guideline name with underscores shown as spaces.
    pub fn display_name(&self) -> String {
        self.guideline_name
            .as_deref()
            .unwrap_or("Unnamed guideline")
            .replace('_', " ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceReport {
    #[serde(deserialize_with = "lenient::or_default")]
    pub clinical_context: ClinicalContext,
    #[serde(deserialize_with = "lenient::or_default")]
    pub guideline_summary: GuidelineSummary,
    pub safety_validation: Option<SafetySummary>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub relevant_guidelines: Vec<RelevantGuideline>,
    pub error: Option<String>,
}

impl ComplianceReport {
    /// Summary counts that disagree with the `relevant_guidelines` array.
    ///
    /// The service is expected to keep these equal; the dashboard only reports the
    /// disagreement and still renders the counts as sent.
    pub fn summary_mismatches(&self) -> Vec<String> {
        let guidelines = &self.relevant_guidelines;
        let summary = &self.guideline_summary;
        let esc = guidelines
            .iter()
            .filter(|g| g.society == Some(Society::Esc))
            .count() as u64;
        let acc_aha = guidelines
            .iter()
            .filter(|g| g.society == Some(Society::AccAha))
            .count() as u64;

        let mut out = Vec::new();
        for (name, claimed, actual) in [
            ("total_guidelines", summary.total_guidelines, guidelines.len() as u64),
            ("esc_guidelines", summary.esc_guidelines, esc),
            ("acc_aha_guidelines", summary.acc_aha_guidelines, acc_aha),
        ] {
            if claimed != actual {
                out.push(format!("{name}: summary says {claimed}, list has {actual}"));
            }
        }
        out
    }
}

// --- Ingestion ---

#[derive(Debug, Clone, Serialize)]
pub struct DownloadRequest {
    pub society: SocietyFilter,
    pub force_redownload: bool,
}

/// One PDF queued for `/guidelines/upload-pdf`.
#[derive(Debug, Clone)]
pub struct PdfUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub society: SocietyFilter,
    pub year: Option<u16>,
    pub guideline_name: String,
}

impl PdfUpload {
    /// Builds an upload whose guideline name defaults to the file stem.
    pub fn new(file_name: &str, bytes: Vec<u8>, society: SocietyFilter, year: Option<u16>) -> Self {
        let stem = file_name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(file_name);
        Self {
            file_name: file_name.to_string(),
            bytes,
            society,
            year,
            guideline_name: stem.to_string(),
        }
    }
}

mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// An explicit `null` decodes like a missing field.
    pub fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + Default,
    {
        Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
    }

    /// Accepts a string or a number (the service is inconsistent about years and pages).
    pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) if !s.is_empty() => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_result_accepts_numeric_year_and_page() {
        let json = r#"{"text":"Anticoagulate","score":0.91,"society":"ESC","year":2023,"page_number":"41","section":"Recommendations"}"#;
        let r: SearchResult = serde_json::from_str(json).unwrap();
        assert_eq!(r.year.as_deref(), Some("2023"));
        assert_eq!(r.page_number.as_deref(), Some("41"));
        assert_eq!(r.society, Some(Society::Esc));
        assert_eq!(r.relevance(), Some(0.91));
    }

    #[test]
    fn search_result_fallback_chains() {
        let r: SearchResult = serde_json::from_str(r#"{"content":"body","source":"esc_af.pdf"}"#).unwrap();
        assert_eq!(r.display_text(), "body");
        assert_eq!(r.document(), "esc_af.pdf");
        assert_eq!(r.section_label(), "General");

        let empty = SearchResult::default();
        assert_eq!(empty.display_text(), "No content available");
        assert_eq!(empty.document(), "Unknown Document");
        assert!(empty.relevance().is_none());
    }

    #[test]
    fn unknown_society_and_severity_do_not_fail_decoding() {
        let r: SearchResult = serde_json::from_str(r#"{"society":"NICE"}"#).unwrap();
        assert_eq!(r.society, Some(Society::Other));

        let a: SafetyAlert = serde_json::from_str(r#"{"severity":"catastrophic","message":"x"}"#).unwrap();
        assert_eq!(a.severity, Severity::Unknown);
    }

    #[test]
    fn safety_report_counts_by_severity() {
        let json = r#"{
            "is_safe": false,
            "confidence_score": 0.42,
            "alerts": [
                {"severity": "critical", "type": "interaction", "message": "Bleeding risk"},
                {"severity": "major", "message": "Renal dosing"},
                {"severity": "critical", "message": "Allergy"}
            ],
            "drug_interactions": [{"drugs": ["warfarin", "aspirin"]}],
            "contraindications": []
        }"#;
        let report: SafetyReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.count_severity(Severity::Critical), 2);
        assert_eq!(report.count_severity(Severity::Major), 1);
        assert_eq!(report.alerts[0].kind.as_deref(), Some("interaction"));
        assert!(report.domain_error().is_none());
    }

    #[test]
    fn explicit_nulls_decode_as_defaults() {
        let health: HealthResponse = serde_json::from_str(
            r#"{"system_initialized": null, "initialization_status": null, "initialization_progress": null}"#,
        )
        .unwrap();
        assert!(!health.system_initialized);

        let report: SafetyReport = serde_json::from_str(
            r#"{"is_safe": null, "confidence_score": null, "alerts": null, "drug_interactions": null}"#,
        )
        .unwrap();
        assert!(report.alerts.is_empty());
        assert_eq!(report.confidence_score, 0.0);

        let alert: SafetyAlert = serde_json::from_str(r#"{"severity": null, "message": "x"}"#).unwrap();
        assert_eq!(alert.severity, Severity::Unknown);

        let compliance: ComplianceReport = serde_json::from_str(
            r#"{"clinical_context": {"diseases": null}, "guideline_summary": null, "relevant_guidelines": null}"#,
        )
        .unwrap();
        assert!(compliance.clinical_context.diseases.is_empty());
        assert_eq!(compliance.guideline_summary.total_guidelines, 0);

        let search: SearchResponse =
            serde_json::from_str(r#"{"results": null, "medical_terms": null, "total_results": null}"#).unwrap();
        assert_eq!(search.total(), 0);

        let status: GuidelinesStatus =
            serde_json::from_str(r#"{"vector_store_exists": null, "downloaded": {"total": null, "esc": 2}}"#).unwrap();
        assert_eq!(status.downloaded.esc, 2);
        assert!(!status.can_process());
    }

    #[test]
    fn domain_error_ignores_blank_messages() {
        let r: SearchResponse = serde_json::from_str(r#"{"results":[],"error":"  "}"#).unwrap();
        assert!(r.domain_error().is_none());
        let r: SearchResponse = serde_json::from_str(r#"{"error":"index missing"}"#).unwrap();
        assert_eq!(r.domain_error(), Some("index missing"));
    }

    #[test]
    fn patient_profile_serializes_nulls_and_lists() {
        let profile = PatientProfile {
            age: Some(72),
            comorbidities: vec!["diabetes".into()],
            ..Default::default()
        };
        let v = serde_json::to_value(&profile).unwrap();
        assert_eq!(v["age"], 72);
        assert!(v["gender"].is_null());
        assert_eq!(v["comorbidities"][0], "diabetes");
        assert_eq!(v["allergies"].as_array().map(Vec::len), Some(0));
    }

    #[test]
    fn compliance_mismatch_detection() {
        let json = r#"{
            "guideline_summary": {"total_guidelines": 3, "esc_guidelines": 1, "acc_aha_guidelines": 1},
            "relevant_guidelines": [
                {"society": "ESC", "guideline_name": "af_2020"},
                {"society": "ACC_AHA", "guideline_name": "hf_2022"}
            ]
        }"#;
        let report: ComplianceReport = serde_json::from_str(json).unwrap();
        let mismatches = report.summary_mismatches();
        assert_eq!(mismatches.len(), 1);
        assert!(mismatches[0].starts_with("total_guidelines"));
        assert_eq!(report.relevant_guidelines[0].display_name(), "af 2020");
    }

    #[test]
    fn processing_percent_handles_empty_download() {
        let mut status = GuidelinesStatus::default();
        assert_eq!(status.processing_percent(), 0.0);
        assert!(!status.can_process());

        status.downloaded.total = 4;
        status.processed.total = 1;
        assert_eq!(status.processing_percent(), 25.0);
        assert!(status.can_process());
    }

    #[test]
    fn pdf_upload_defaults_guideline_name_to_stem() {
        let upload = PdfUpload::new("2023_ESC_Endocarditis.pdf", vec![1, 2], SocietyFilter::Esc, Some(2023));
        assert_eq!(upload.guideline_name, "2023_ESC_Endocarditis");
        let upload = PdfUpload::new("noext", vec![], SocietyFilter::All, None);
        assert_eq!(upload.guideline_name, "noext");
    }

    #[test]
    fn filters_round_trip_through_strings() {
        assert_eq!(SocietyFilter::parse("acc_aha"), Some(SocietyFilter::AccAha));
        assert_eq!(Urgency::parse("emergency"), Some(Urgency::Emergency));
        assert_eq!(Urgency::parse("whenever"), None);
        assert_eq!(serde_json::to_value(Urgency::Routine).unwrap(), "routine");
    }
}
