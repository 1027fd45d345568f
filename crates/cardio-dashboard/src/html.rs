//! Server-rendered pages, built as leptos views and rendered to a string per request.
//!
//! Every page is a pure function of the state it is handed. There is no client-side
//! hydration: forms post back to the dashboard and the response is the next page.

use leptos::prelude::*;
use leptos::tachys::view::any_view::{AnyView, IntoAny};
use leptos::tachys::view::RenderHtml;

use cardio_common::api::{
    Citation, ComplianceReport, RelevantGuideline, SafetyAlert, SafetyReport, SearchResult,
    SocietyFilter, Urgency,
};
use cardio_common::dispatch::{ResponseType, SearchMode, SearchOutcome, TOP_K_CHOICES};
use cardio_common::ingest::{BoardState, UploadReport};

use crate::state::{ComplianceParams, EnhancedParams, Page, SafetyParams, SearchParams};
use crate::view::{
    compliance_is_empty, highlight, percent, result_state, search_state, whole_percent,
    ComplianceView, HeaderView, Highlight, InitBanner, ResultState, SafetyView, SearchStats,
    ENHANCED_RESULT_LIMIT,
};

const SEP: &str = " · ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Enhanced,
    Search,
    Safety,
    Compliance,
    Status,
}

impl Tab {
    pub const ALL: [Tab; 5] = [Tab::Enhanced, Tab::Search, Tab::Safety, Tab::Compliance, Tab::Status];

    pub fn path(self) -> &'static str {
        match self {
            Tab::Enhanced => "/enhanced",
            Tab::Search => "/search",
            Tab::Safety => "/safety",
            Tab::Compliance => "/compliance",
            Tab::Status => "/status",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Tab::Enhanced => "Enhanced Search",
            Tab::Search => "Standard Search",
            Tab::Safety => "Safety Validation",
            Tab::Compliance => "Compliance Check",
            Tab::Status => "System Status",
        }
    }

    /// Maps a posted `next` field back to a tab, so redirects stay on the dashboard.
    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.path() == path)
    }
}

/// Page furniture shared by every tab.
#[derive(Debug, Clone)]
pub struct Chrome {
    pub header: HeaderView,
    pub init_error: Option<String>,
    pub api_base: String,
    /// Seconds until the browser reloads the page, if it should.
    pub refresh_secs: Option<u64>,
}

/// Renders a full HTML document: header, banner, tab bar, `body` and footer.
pub fn document(chrome: &Chrome, tab: Tab, body: AnyView) -> String {
    let header = chrome.header.clone();
    let refresh = chrome
        .refresh_secs
        .map(|secs| view! { <meta http-equiv="refresh" content={secs.to_string()}/> });
    let init_error = chrome
        .init_error
        .clone()
        .map(|err| view! { <div class="alert error">{err}</div> });
    let api_class = if header.connected { "badge ok" } else { "badge bad" };
    let nav = Tab::ALL
        .into_iter()
        .map(|t| view! { <a href={t.path()} aria-current={(t == tab).then_some("page")}>{t.label()}</a> })
        .collect_view();

    view! {
        <!DOCTYPE html>
        <html lang="en">
            <head>
                <meta charset="utf-8"/>
                {refresh}
                <title>{format!("{} | Cardiovascular Guidelines", tab.label())}</title>
            </head>
            <body>
                <header>
                    <h1>"Cardiovascular Guidelines"</h1>
                    <span class={api_class}>{header.api_label}</span>
                    <span class="badge">{header.system_label}</span>
                </header>
                {banner(header.banner, tab)}
                {init_error}
                <nav>{nav}</nav>
                <main>{body}</main>
                <footer>
                    <p>{format!("Cardiovascular Guidelines Compliance System v{}", env!("CARGO_PKG_VERSION"))}</p>
                    <p>
                        "For educational and research purposes only. Always consult qualified "
                        "healthcare professionals for clinical decisions."
                    </p>
                    <p>{format!("API: {}", chrome.api_base)}</p>
                </footer>
            </body>
        </html>
    }
    .to_html()
}

fn banner(banner: InitBanner, tab: Tab) -> AnyView {
    let next = tab.path();
    match banner {
        InitBanner::None => ().into_any(),
        InitBanner::Connecting => view! { <div class="alert">"Connecting to API server..."</div> }.into_any(),
        InitBanner::Disconnected => view! {
            <div class="alert error">
                "Cannot connect to API server. Please check if the backend is running."
                {system_action("/system/health-check", next, "Retry Connection")}
            </div>
        }
        .into_any(),
        InitBanner::Initialize => view! {
            <div class="alert">
                "System needs to be initialized before use. This will download and process cardiovascular guidelines."
                {system_action("/system/initialize", next, "Initialize System")}
            </div>
        }
        .into_any(),
        InitBanner::Progress(progress) => view! {
            <div class="alert">
                {format!("Initializing system components... {progress}%")}
                <progress max="100" value={progress.to_string()}></progress>
            </div>
        }
        .into_any(),
        InitBanner::Retry => view! {
            <div class="alert error">
                "System initialization failed. Please try again."
                {system_action("/system/initialize", next, "Retry Initialization")}
            </div>
        }
        .into_any(),
    }
}

fn system_action(action: &'static str, next: &'static str, label: &'static str) -> impl IntoView {
    view! {
        <form method="post" action={action}>
            <input type="hidden" name="next" value={next}/>
            <button type="submit">{label}</button>
        </form>
    }
}

fn submit_button(label: &'static str, enabled: bool, in_flight: bool) -> impl IntoView {
    let label = if in_flight { "Working..." } else { label };
    view! { <button type="submit" disabled={!enabled}>{label}</button> }
}

fn options(choices: Vec<(&'static str, &'static str)>, selected: &str) -> impl IntoView {
    choices
        .into_iter()
        .map(|(value, label)| {
            let is_selected = value == selected;
            view! { <option value={value} selected={is_selected}>{label}</option> }
        })
        .collect_view()
}

fn top_k_options(selected: u32) -> impl IntoView {
    TOP_K_CHOICES
        .into_iter()
        .map(|k| view! { <option value={k.to_string()} selected={k == selected}>{format!("{k} results")}</option> })
        .collect_view()
}

fn error_banner(message: &str, action: &'static str) -> AnyView {
    view! {
        <div class="alert error" role="alert">
            {message.to_string()}
            <form method="post" action={action}>
                <input type="hidden" name="dismiss" value="1"/>
                <button type="submit">"Dismiss"</button>
            </form>
        </div>
    }
    .into_any()
}

/// Shown while a submission is outstanding. Cancelling frees the form for a retry; the
/// late response, if any, is discarded.
fn pending_notice(action: &'static str) -> AnyView {
    view! {
        <div class="alert" role="status">
            "Waiting for the guidelines service..."
            <form method="post" action={action}>
                <input type="hidden" name="dismiss" value="1"/>
                <button type="submit">"Cancel"</button>
            </form>
        </div>
    }
    .into_any()
}

fn no_results(examples: &[&'static str]) -> AnyView {
    let tries = examples
        .iter()
        .take(3)
        .map(|example| view! { <li>{format!("Try: {example}")}</li> })
        .collect_view();
    view! {
        <section class="empty">
            <h3>"No Results Found"</h3>
            <p>"Try different keywords or one of these:"</p>
            <ul>{tries}</ul>
        </section>
    }
    .into_any()
}

// --- Search ---

const SEARCH_EXAMPLES: [&str; 3] = [
    "Atrial fibrillation anticoagulation guidelines",
    "Heart failure with reduced ejection fraction treatment",
    "Acute coronary syndrome management",
];

const ENHANCED_EXAMPLES: [&str; 3] = [
    "What is the treatment for atrial fibrillation?",
    "How should heart failure with reduced ejection fraction be managed?",
    "What are the anticoagulation guidelines for acute coronary syndrome?",
];

fn highlighted(text: &str, query: &str) -> impl IntoView {
    highlight(text, query)
        .into_iter()
        .map(|span| match span {
            Highlight::Plain(text) => text.into_any(),
            Highlight::Marked(text) => view! { <mark>{text}</mark> }.into_any(),
        })
        .collect_view()
}

fn result_card(result: &SearchResult, query: &str) -> impl IntoView {
    let mut meta = Vec::new();
    if let Some(society) = result.society {
        meta.push(society.label().to_string());
    }
    meta.extend(result.year.clone());
    if let Some(class) = &result.evidence_class {
        meta.push(format!("Class {class}"));
    }
    meta.push(format!("Page {}", result.page_number.as_deref().unwrap_or("N/A")));
    meta.push(format!("Section: {}", result.section_label()));
    meta.push(format!("Relevance: {}", percent(result.relevance())));

    let metadata = (!result.metadata.is_empty()).then(|| {
        let rows = result
            .metadata
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                view! { <dt>{key.clone()}</dt><dd>{value}</dd> }
            })
            .collect_view();
        view! { <dl class="metadata">{rows}</dl> }
    });

    view! {
        <article class="result">
            <h4>{result.document().to_string()}</h4>
            <p class="meta">{meta.join(SEP)}</p>
            <p>{highlighted(result.display_text(), query)}</p>
            {metadata}
        </article>
    }
}

fn citation_card(c: &Citation) -> impl IntoView {
    let title = format!(
        "[{}] {}",
        c.id.as_deref().unwrap_or(""),
        c.guideline.as_deref().unwrap_or("Unknown guideline")
    );
    let mut meta: Vec<String> = [c.society.as_deref(), c.year.as_deref()]
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect();
    if let Some(class) = &c.evidence_class {
        meta.push(format!("Class {class}"));
    }
    meta.push(format!("Page {}", c.page.as_deref().unwrap_or("N/A")));
    meta.extend(c.section.clone());

    let quote = c.text.clone().map(|text| view! { <blockquote>{text}</blockquote> });
    let link = c
        .pdf_link
        .clone()
        .filter(|l| is_http_link(l))
        .map(|href| view! { <a href={href} target="_blank" rel="noopener">"View source PDF"</a> });

    view! {
        <article class="citation">
            <h4>{title}</h4>
            <p class="meta">{meta.join(SEP)}</p>
            {quote}
            {link}
        </article>
    }
}

fn is_http_link(link: &str) -> bool {
    link.starts_with("https://") || link.starts_with("http://") || link.starts_with('/')
}

fn results_section(outcome: &SearchOutcome, query: &str, limit: Option<usize>) -> AnyView {
    match outcome {
        SearchOutcome::Results(resp) => {
            let stats = SearchStats::new(resp, query);
            let mut line = vec![
                format!("Query: \"{}\"", stats.query),
                format!("Results: {}", stats.total),
            ];
            line.extend(stats.search_time.map(|t| format!("Search Time: {t}")));
            if !stats.medical_terms.is_empty() {
                line.push(format!("Medical terms: {}", stats.medical_terms.join(", ")));
            }
            let cards = resp
                .results
                .iter()
                .take(limit.unwrap_or(resp.results.len()))
                .map(|r| result_card(r, query))
                .collect_view();
            view! {
                <section class="stats">{line.join(SEP)}</section>
                {cards}
            }
            .into_any()
        }
        SearchOutcome::Synthesized(s) => {
            let confidence = s
                .confidence
                .map(|c| view! { <p class="meta">{format!("Confidence: {}", whole_percent(c))}</p> });
            let answer = s.synthesized_answer.as_deref().map(|answer| {
                answer
                    .lines()
                    .filter(|l| !l.trim().is_empty())
                    .map(|l| view! { <p>{l.to_string()}</p> })
                    .collect_view()
            });
            let evidence = s.evidence_summary.as_ref().map(|summary| {
                let mut line: Vec<String> = summary
                    .societies
                    .iter()
                    .map(|(society, count)| format!("{society}: {count}"))
                    .collect();
                line.extend(summary.quality_score.map(|q| format!("Quality Score: {}", whole_percent(q))));
                view! { <p class="meta">{format!("Evidence: {}", line.join(SEP))}</p> }
            });
            let citations = (!s.citations.is_empty()).then(|| {
                let cards = s.citations.iter().map(citation_card).collect_view();
                view! {
                    <section class="citations">
                        <h3>"Citations & References"</h3>
                        {cards}
                    </section>
                }
            });
            let supporting = (!s.results.is_empty()).then(|| {
                let cards = s
                    .results
                    .iter()
                    .take(limit.unwrap_or(s.results.len()))
                    .map(|r| result_card(r, query))
                    .collect_view();
                view! {
                    <section>
                        <h3>"Supporting Results"</h3>
                        {cards}
                    </section>
                }
            });
            view! {
                <section class="answer">
                    <h3>"Synthesized Answer"</h3>
                    {confidence}
                    <div>{answer}</div>
                    {evidence}
                </section>
                {citations}
                {supporting}
            }
            .into_any()
        }
    }
}

fn search_results(form_state: ResultState<'_, SearchOutcome>, query: &str, action: &'static str, limit: Option<usize>, examples: &[&'static str]) -> AnyView {
    match form_state {
        ResultState::Idle => ().into_any(),
        ResultState::Pending => pending_notice(action),
        ResultState::Error(message) => error_banner(message, action),
        ResultState::Empty => no_results(examples),
        ResultState::Ready(outcome) => results_section(outcome, query, limit),
    }
}

pub fn render_enhanced(page: &Page<SearchOutcome, EnhancedParams>, can_submit: bool) -> AnyView {
    let params = &page.params;
    let form = &page.form;
    let modes = SearchMode::ENHANCED_KEYS
        .into_iter()
        .zip(["Enhanced (synthesized)", "Clinical question", "Standard"])
        .collect();
    let response_types = ResponseType::ALL.into_iter().map(|r| (r.as_str(), r.as_str())).collect();
    let results = search_results(
        search_state(form),
        form.input(),
        "/enhanced",
        Some(ENHANCED_RESULT_LIMIT),
        &ENHANCED_EXAMPLES,
    );

    view! {
        <h2>"Enhanced Search"</h2>
        <p>"AI-powered search with synthesis"</p>
        <form method="post" action="/enhanced">
            <textarea name="query" rows="3" placeholder="Ask a clinical question">{form.input().to_string()}</textarea>
            <select name="search_type">{options(modes, &params.search_type)}</select>
            <select name="response_type">{options(response_types, params.response_type.as_str())}</select>
            <select name="top_k">{top_k_options(params.top_k)}</select>
            {submit_button("Search", can_submit, form.is_in_flight())}
        </form>
        {results}
    }
    .into_any()
}

pub fn render_search(page: &Page<SearchOutcome, SearchParams>, can_submit: bool) -> AnyView {
    let params = &page.params;
    let form = &page.form;
    let modes = SearchMode::STANDARD_KEYS
        .into_iter()
        .zip(["Semantic", "Keyword", "Hybrid", "Clinical"])
        .collect();
    let results = search_results(search_state(form), form.input(), "/search", None, &SEARCH_EXAMPLES);

    view! {
        <h2>"Standard Search"</h2>
        <p>"Traditional guideline search"</p>
        <form method="post" action="/search">
            <input type="text" name="query" value={form.input().to_string()} placeholder="Search cardiovascular guidelines"/>
            <select name="search_type">{options(modes, &params.search_type)}</select>
            <select name="top_k">{top_k_options(params.top_k)}</select>
            {submit_button("Search", can_submit, form.is_in_flight())}
        </form>
        {results}
    }
    .into_any()
}

// --- Safety ---

fn alert_card(alert: &SafetyAlert) -> impl IntoView {
    let severity = alert.severity.as_str();
    let mut meta = severity.to_uppercase();
    if let Some(kind) = &alert.kind {
        meta.push_str(SEP);
        meta.push_str(&kind.replace('_', " "));
    }
    let recommendation = alert
        .recommendation
        .clone()
        .map(|rec| view! { <p><strong>"Recommendation: "</strong>{rec}</p> });
    let evidence = alert
        .evidence
        .clone()
        .map(|ev| view! { <p><strong>"Evidence: "</strong>{ev}</p> });

    view! {
        <article class={format!("alert-card severity-{severity}")}>
            <h4>{alert.message.clone().unwrap_or_else(|| "Safety alert".to_string())}</h4>
            <p class="meta">{meta}</p>
            {recommendation}
            {evidence}
        </article>
    }
}

fn safety_report(report: &SafetyReport) -> AnyView {
    let view = SafetyView::new(report);
    let badge_class = if view.safe { "badge ok" } else { "badge bad" };
    let counts = [
        ("Critical", view.critical),
        ("Major", view.major),
        ("Moderate", view.moderate),
        ("Minor", view.minor),
        ("Drug interactions", view.drug_interactions),
        ("Contraindications", view.contraindications),
    ]
    .into_iter()
    .map(|(label, n)| view! { <li>{format!("{label}: {n}")}</li> })
    .collect_view();
    let alerts = if view.alerts.is_empty() {
        view! { <p>"No safety alerts."</p> }.into_any()
    } else {
        view.alerts.iter().map(alert_card).collect_view().into_any()
    };

    view! {
        <section class="report">
            <p>
                <span class={badge_class}>{view.badge}</span>
                {format!(" Confidence: {}", view.confidence)}
            </p>
            <ul class="counts">{counts}</ul>
            {alerts}
        </section>
    }
    .into_any()
}

fn text_input(name: &'static str, value: &str, placeholder: &'static str) -> impl IntoView {
    view! { <input type="text" name={name} value={value.to_string()} placeholder={placeholder}/> }
}

pub fn render_safety(page: &Page<SafetyReport, SafetyParams>, can_submit: bool) -> AnyView {
    let p = &page.params.profile;
    let form = &page.form;
    let results = match result_state(form, |_| false) {
        ResultState::Idle | ResultState::Empty => ().into_any(),
        ResultState::Pending => pending_notice("/safety"),
        ResultState::Error(message) => error_banner(message, "/safety"),
        ResultState::Ready(report) => safety_report(report),
    };

    view! {
        <h2>"Safety Validation"</h2>
        <p>"Validate clinical recommendations"</p>
        <form method="post" action="/safety">
            <textarea name="recommendation" rows="3" placeholder="Enter a clinical recommendation">{form.input().to_string()}</textarea>
            <fieldset>
                <legend>"Patient profile"</legend>
                {text_input("age", &p.age, "Patient age")}
                {text_input("gender", &p.gender, "Gender")}
                {text_input("comorbidities", &p.comorbidities, "Comorbidities (comma separated)")}
                {text_input("current_medications", &p.current_medications, "Current medications (comma separated)")}
                {text_input("allergies", &p.allergies, "Allergies (comma separated)")}
                {text_input("renal_function", &p.renal_function, "eGFR (mL/min/1.73m²)")}
                {text_input("hepatic_function", &p.hepatic_function, "Hepatic function")}
            </fieldset>
            {submit_button("Validate Safety", can_submit, form.is_in_flight())}
        </form>
        {results}
    }
    .into_any()
}

// --- Compliance ---

fn tag_list(label: &'static str, items: &[String]) -> Option<impl IntoView> {
    (!items.is_empty()).then(|| {
        view! { <p><strong>{format!("{label}: ")}</strong>{items.join(", ")}</p> }
    })
}

fn guideline_card(guideline: &RelevantGuideline) -> impl IntoView {
    let mut meta = Vec::new();
    if let Some(society) = guideline.society {
        meta.push(society.label().to_string());
    }
    meta.extend(guideline.year.clone());
    if let Some(class) = &guideline.evidence_class {
        meta.push(format!("Class {class}"));
    }
    meta.push(format!("Score: {}", percent(guideline.score)));
    let text = guideline.text.clone().map(|text| view! { <p>{text}</p> });

    view! {
        <article class="result">
            <h4>{guideline.display_name()}</h4>
            <p class="meta">{meta.join(SEP)}</p>
            {text}
        </article>
    }
}

fn compliance_report(report: &ComplianceReport) -> AnyView {
    let view = ComplianceView::new(report);
    let ctx = &report.clinical_context;
    let urgency = ctx
        .urgency_level
        .clone()
        .map(|u| view! { <p><strong>"Urgency: "</strong>{u}</p> });

    let summary = &report.guideline_summary;
    let levels = &summary.evidence_levels;
    let totals = [
        ("Total", summary.total_guidelines),
        ("ESC", summary.esc_guidelines),
        ("ACC/AHA", summary.acc_aha_guidelines),
    ]
    .into_iter()
    .map(|(label, n)| view! { <li>{format!("{label}: {n}")}</li> })
    .collect_view();
    let classes = [
        ("Class I", levels.class_i),
        ("Class IIa", levels.class_iia),
        ("Class IIb", levels.class_iib),
        ("Class III", levels.class_iii),
    ]
    .into_iter()
    .map(|(label, n)| view! { <li>{format!("{label}: {n}")}</li> })
    .collect_view();

    let safety = report
        .safety_validation
        .as_ref()
        .zip(view.safety_badge)
        .map(|(safety, badge)| {
            let badge_class = if safety.is_safe { "badge ok" } else { "badge bad" };
            let counts = [
                ("Critical alerts", safety.critical_alerts),
                ("Major alerts", safety.major_alerts),
                ("Drug interactions", safety.drug_interactions),
                ("Contraindications", safety.contraindications),
            ]
            .into_iter()
            .map(|(label, n)| view! { <li>{format!("{label}: {n}")}</li> })
            .collect_view();
            view! {
                <h3>"Safety"</h3>
                <p>
                    <span class={badge_class}>{badge}</span>
                    {format!(" Confidence: {}", percent(Some(safety.confidence_score)))}
                </p>
                <ul class="counts">{counts}</ul>
            }
        });

    let guidelines = (!view.shown.is_empty()).then(|| {
        let cards = view.shown.iter().map(guideline_card).collect_view();
        view! {
            <h3>"Relevant Guidelines"</h3>
            {cards}
        }
    });
    let more = view.more_label().map(|more| view! { <p class="more">{more}</p> });

    view! {
        <section class="report">
            <h3>"Clinical Context"</h3>
            {tag_list("Diseases", &ctx.diseases)}
            {tag_list("Drugs", &ctx.drugs)}
            {tag_list("Procedures", &ctx.procedures)}
            {tag_list("Symptoms", &ctx.symptoms)}
            {urgency}
            <h3>"Guideline Summary"</h3>
            <ul class="counts">{totals}</ul>
            <ul class="counts">{classes}</ul>
            {safety}
            {guidelines}
            {more}
        </section>
    }
    .into_any()
}

pub fn render_compliance(page: &Page<ComplianceReport, ComplianceParams>, can_submit: bool) -> AnyView {
    let form = &page.form;
    let urgencies = Urgency::ALL.into_iter().map(|u| (u.as_str(), u.as_str())).collect();
    let results = match result_state(form, compliance_is_empty) {
        ResultState::Idle => ().into_any(),
        ResultState::Pending => pending_notice("/compliance"),
        ResultState::Error(message) => error_banner(message, "/compliance"),
        ResultState::Empty => no_results(&[]),
        ResultState::Ready(report) => compliance_report(report),
    };

    view! {
        <h2>"Compliance Check"</h2>
        <p>"Check guideline compliance"</p>
        <form method="post" action="/compliance">
            <textarea name="patient_note" rows="6" placeholder="Paste a clinical note">{form.input().to_string()}</textarea>
            <select name="urgency">{options(urgencies, page.params.urgency.as_str())}</select>
            {submit_button("Check Compliance", can_submit, form.is_in_flight())}
        </form>
        {results}
    }
    .into_any()
}

// --- Status ---

fn society_select() -> impl IntoView {
    let choices = SocietyFilter::ALL
        .into_iter()
        .map(SocietyFilter::as_str)
        .zip(["All societies", "ESC", "ACC/AHA"])
        .collect();
    view! { <select name="society">{options(choices, SocietyFilter::All.as_str())}</select> }
}

fn download_form(action: &'static str, label: &'static str) -> impl IntoView {
    view! {
        <form method="post" action={action}>
            {society_select()}
            <label>
                <input type="checkbox" name="force_redownload" value="true"/>
                " Force re-download"
            </label>
            <button type="submit">{label}</button>
        </form>
    }
}

fn counts_row(label: &'static str, counts: [u64; 3]) -> impl IntoView {
    let [total, esc, acc_aha] = counts.map(|n| n.to_string());
    view! { <tr><td>{label}</td><td>{total}</td><td>{esc}</td><td>{acc_aha}</td></tr> }
}

pub fn render_status(board: &BoardState, last_upload: Option<&UploadReport>) -> AnyView {
    let snapshot = &board.snapshot;
    let notice = board.notice.clone().map(|notice| {
        let class = if notice.ok { "alert ok" } else { "alert error" };
        view! { <div class={class}>{notice.text}</div> }
    });
    let fetch_error = snapshot
        .error
        .clone()
        .map(|err| view! { <div class="alert error">{format!("Failed to fetch system status: {err}")}</div> });

    let health = snapshot.stats.as_ref().map(|stats| {
        let operational = if stats.system_status.initialized { "Operational" } else { "Initializing" };
        let g = &stats.guidelines;
        view! {
            <section>
                <h3>"System Health"</h3>
                <p>"System Status: "<span class="badge">{operational}</span></p>
                <p>{format!(
                    "Available guidelines: {} (ESC {}, ACC/AHA {})",
                    g.total_available, g.esc_available, g.acc_aha_available
                )}</p>
            </section>
        }
    });

    let guidelines = snapshot.guidelines.as_ref().map(|gs| {
        let store = if gs.vector_store_exists { "Available" } else { "Not Available" };
        let pct = gs.processing_percent();
        let d = gs.downloaded;
        let p = gs.processed;
        view! {
            <section>
                <h3>"Guidelines"</h3>
                <p>{format!("Vector store: {store}")}</p>
                <table>
                    <tr><th></th><th>"Total"</th><th>"ESC"</th><th>"ACC/AHA"</th></tr>
                    {counts_row("Downloaded", [d.total, d.esc, d.acc_aha])}
                    {counts_row("Processed", [p.total, p.esc, p.acc_aha])}
                </table>
                <p>
                    {format!("Processing progress: {pct:.0}%")}
                    <progress max="100" value={format!("{pct:.0}")}></progress>
                </p>
            </section>
        }
    });

    let upload = last_upload.map(|report| {
        let rows = report
            .outcomes
            .iter()
            .map(|outcome| {
                let line = match &outcome.error {
                    None => format!("{}: uploaded", outcome.file_name),
                    Some(err) => format!("{}: failed ({err})", outcome.file_name),
                };
                view! { <li>{line}</li> }
            })
            .collect_view();
        view! {
            <section>
                <h3>"Last Upload"</h3>
                <p>{report.message()}</p>
                <ul>{rows}</ul>
            </section>
        }
    });

    view! {
        <h2>"System Status"</h2>
        <p>"Monitor system health and manage guidelines"</p>
        <form method="get" action="/status">
            <button type="submit">"Refresh"</button>
        </form>
        {notice}
        {fetch_error}
        {health}
        {guidelines}
        <section>
            <h3>"Guideline Management"</h3>
            {download_form("/status/download", "Download Guidelines")}
            {download_form("/status/download-drive", "Download from Drive")}
            <form method="post" action="/status/process">
                <button type="submit" id="process-guidelines" disabled={!snapshot.can_process()}>"Process Guidelines"</button>
            </form>
            <form method="post" action="/status/process-drive">
                <button type="submit">"Process Drive PDFs"</button>
            </form>
            <form method="post" action="/status/upload" enctype="multipart/form-data">
                <input type="file" name="file" accept="application/pdf" multiple=true/>
                {society_select()}
                <input type="number" name="year" placeholder="Year"/>
                <input type="text" name="guideline_name" placeholder="Guideline name (defaults to file name)"/>
                <button type="submit">"Upload PDFs"</button>
            </form>
        </section>
        {upload}
    }
    .into_any()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardio_common::api::SearchResponse;
    use cardio_common::error::ApiError;
    use cardio_common::form::{FormKind, QueryForm};
    use cardio_common::status::{InitializationStatus, StatusSnapshot, SystemStatus};
    use serde_json::json;

    fn ready() -> StatusSnapshot {
        StatusSnapshot {
            connected: true,
            checked: true,
            system: SystemStatus {
                initialized: true,
                status: InitializationStatus::Completed,
                progress: 100,
            },
        }
    }

    fn page<T, P: Default>(kind: FormKind) -> Page<T, P> {
        Page {
            form: QueryForm::new(kind),
            params: P::default(),
        }
    }

    #[test]
    fn unsafe_report_renders_badge_percent_and_one_critical_card() {
        let mut page: Page<SafetyReport, SafetyParams> = page(FormKind::Safety);
        let id = page.form.begin("Start warfarin 10mg", &ready()).unwrap();
        let report: SafetyReport = serde_json::from_value(json!({
            "is_safe": false,
            "confidence_score": 0.42,
            "alerts": [{"severity": "critical", "type": "drug_interaction", "message": "Major bleeding risk"}],
            "drug_interactions": [],
            "contraindications": []
        }))
        .unwrap();
        page.form.finish(id, Ok(report));

        let html = render_safety(&page, true).to_html();
        assert!(html.contains(">UNSAFE<"));
        assert!(html.contains("Confidence: 42.0%"));
        assert!(html.contains("<li>Critical: 1</li>"));
        assert_eq!(html.matches("severity-critical").count(), 1);
        assert!(html.contains("Major bleeding risk"));
        assert!(html.contains("drug interaction"));
    }

    #[test]
    fn empty_search_renders_no_results_not_error() {
        let mut page: Page<SearchOutcome, SearchParams> = page(FormKind::Search);
        let id = page.form.begin("zzz", &ready()).unwrap();
        page.form.finish(id, Ok(SearchOutcome::Results(SearchResponse::default())));
        let html = render_search(&page, true).to_html();
        assert!(html.contains("No Results Found"));
        assert!(!html.contains("role=\"alert\""));
    }

    #[test]
    fn search_error_renders_banner_without_results() {
        let mut page: Page<SearchOutcome, SearchParams> = page(FormKind::Search);
        let id = page.form.begin("AF", &ready()).unwrap();
        page.form.finish(id, Err(ApiError::Domain("Vector store <missing>".into())));
        let html = render_search(&page, true).to_html();
        assert!(html.contains("role=\"alert\""));
        assert!(html.contains("Vector store &lt;missing"));
        assert!(!html.contains("<missing>"));
        assert!(!html.contains("No Results Found"));
    }

    #[test]
    fn pending_submission_offers_cancel() {
        let mut page: Page<SearchOutcome, SearchParams> = page(FormKind::Search);
        page.form.begin("AF", &ready()).unwrap();
        let html = render_search(&page, false).to_html();
        assert!(html.contains("Waiting for the guidelines service..."));
        assert!(html.contains(">Cancel<"));
        assert!(html.contains("Working..."));
    }

    #[test]
    fn user_input_is_escaped() {
        let mut page: Page<SearchOutcome, EnhancedParams> = page(FormKind::Search);
        page.form.begin("<script>alert(1)</script>", &ready()).unwrap();
        let html = render_enhanced(&page, true).to_html();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script"));
    }

    #[test]
    fn search_results_are_highlighted_and_scored() {
        let mut page: Page<SearchOutcome, SearchParams> = page(FormKind::Search);
        let id = page.form.begin("anticoagulation", &ready()).unwrap();
        let resp: SearchResponse = serde_json::from_value(json!({
            "results": [{"text": "Oral anticoagulation is recommended", "score": 0.913, "society": "ESC", "page_number": 12}],
            "total_results": 1,
            "search_time": 0.1234
        }))
        .unwrap();
        page.form.finish(id, Ok(SearchOutcome::Results(resp)));
        let html = render_search(&page, true).to_html();
        assert!(html.contains("<mark>anticoagulation</mark>"));
        assert!(html.contains("Relevance: 91.3%"));
        assert!(html.contains("Page 12"));
        assert!(html.contains("Search Time: 0.12s"));
    }

    #[test]
    fn synthesized_answer_renders_citations() {
        let mut page: Page<SearchOutcome, EnhancedParams> = page(FormKind::Search);
        let id = page.form.begin("AF?", &ready()).unwrap();
        let synthesized = serde_json::from_value(json!({
            "synthesized_answer": "Use DOACs.\nAvoid aspirin alone.",
            "citations": [{"id": 1, "guideline": "ESC AF 2020", "page": 7, "pdf_link": "javascript:alert(1)"}],
            "confidence": 0.874
        }))
        .unwrap();
        page.form.finish(id, Ok(SearchOutcome::Synthesized(synthesized)));
        let html = render_enhanced(&page, true).to_html();
        assert!(html.contains("<p>Use DOACs.</p>"));
        assert!(html.contains("<p>Avoid aspirin alone.</p>"));
        assert!(html.contains("Confidence: 87%"));
        assert!(html.contains("[1] ESC AF 2020"));
        assert!(!html.contains("javascript:"));
    }

    #[test]
    fn compliance_lists_five_and_counts_rest() {
        let mut page: Page<ComplianceReport, ComplianceParams> = page(FormKind::Compliance);
        let id = page.form.begin("72yo with AF", &ready()).unwrap();
        let guidelines: Vec<_> = (0..7)
            .map(|i| json!({"guideline_name": format!("AF_Guideline_{i}"), "score": 0.5}))
            .collect();
        let report = serde_json::from_value(json!({
            "guideline_summary": {"total_guidelines": 7},
            "safety_validation": {"is_safe": true, "confidence_score": 0.9},
            "relevant_guidelines": guidelines
        }))
        .unwrap();
        page.form.finish(id, Ok(report));
        let html = render_compliance(&page, true).to_html();
        assert_eq!(html.matches("<h4>AF Guideline ").count(), 5);
        assert!(html.contains("+2 more guidelines"));
        assert!(html.contains(">SAFE<"));
        assert!(html.contains("<li>Total: 7</li>"));
    }

    #[test]
    fn submit_disabled_when_gated() {
        let page: Page<SearchOutcome, SearchParams> = page(FormKind::Search);
        let html = render_search(&page, false).to_html();
        assert!(html.contains("<button type=\"submit\" disabled"));
        let html = render_search(&page, true).to_html();
        assert!(html.contains("<button type=\"submit\">"));
    }

    #[test]
    fn document_shows_banner_and_footer() {
        let chrome = Chrome {
            header: HeaderView::new(&StatusSnapshot {
                connected: true,
                checked: true,
                system: SystemStatus::default(),
            }),
            init_error: Some("Initialization failed: <busy>".into()),
            api_base: "http://localhost:8000".into(),
            refresh_secs: Some(2),
        };
        let html = document(&chrome, Tab::Safety, view! { <p>"body"</p> }.into_any());
        assert!(html.to_ascii_lowercase().starts_with("<!doctype html>"));
        assert!(html.contains("content=\"2\""));
        assert!(html.contains("API Connected"));
        assert!(html.contains("Not Initialized"));
        assert!(html.contains("Initialize System"));
        assert!(html.contains("name=\"next\" value=\"/safety\""));
        assert!(html.contains("aria-current=\"page\""));
        assert!(html.contains("API: http://localhost:8000"));
        assert!(html.contains("Initialization failed: &lt;busy"));
        assert!(html.contains("<p>body</p>"));
    }

    #[test]
    fn status_page_disables_process_until_downloaded() {
        let html = render_status(&BoardState::default(), None).to_html();
        assert!(html.contains("id=\"process-guidelines\" disabled"));

        let mut board = BoardState::default();
        board.snapshot.guidelines = Some(
            serde_json::from_value(json!({"downloaded": {"total": 4, "esc": 4}, "processed": {"total": 1}}))
                .unwrap(),
        );
        let html = render_status(&board, None).to_html();
        assert!(html.contains("id=\"process-guidelines\">"));
        assert!(html.contains("Processing progress: 25%"));
    }
}
