//! Search dispatch table.
//!
//! The selected search mode decides both the endpoint and the request body schema, and
//! the endpoint in turn decides how the response is decoded. Nothing here inspects the
//! response to guess its shape.

use std::fmt;

use serde::Serialize;

use crate::api::{SearchResponse, SynthesizedResponse};

pub const TOP_K_CHOICES: [u32; 4] = [5, 10, 15, 20];
pub const DEFAULT_TOP_K: u32 = 10;

/// Snap a requested result count to one of the offered choices.
pub fn normalize_top_k(top_k: u32) -> u32 {
    if TOP_K_CHOICES.contains(&top_k) {
        top_k
    } else {
        DEFAULT_TOP_K
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    #[default]
    Comprehensive,
    Brief,
    Detailed,
}

impl ResponseType {
    pub const ALL: [ResponseType; 3] = [
        ResponseType::Comprehensive,
        ResponseType::Brief,
        ResponseType::Detailed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResponseType::Comprehensive => "comprehensive",
            ResponseType::Brief => "brief",
            ResponseType::Detailed => "detailed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == s.trim())
    }
}

/// Every search the dashboard can issue. The first four belong to the standard search
/// page, the last three to the enhanced page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Semantic,
    Keyword,
    Hybrid,
    Clinical,
    Enhanced(ResponseType),
    ClinicalEnhanced(ResponseType),
    Standard,
}

impl SearchMode {
    pub const STANDARD_KEYS: [&'static str; 4] = ["semantic", "keyword", "hybrid", "clinical"];
    pub const ENHANCED_KEYS: [&'static str; 3] = ["enhanced", "clinical", "standard"];

    /// Mode for a `search_type` value on the standard search page.
    pub fn standard(key: &str) -> Option<Self> {
        match key.trim() {
            "semantic" => Some(SearchMode::Semantic),
            "keyword" => Some(SearchMode::Keyword),
            "hybrid" => Some(SearchMode::Hybrid),
            "clinical" => Some(SearchMode::Clinical),
            _ => None,
        }
    }

    /// Mode for a search type on the enhanced page.
    pub fn enhanced(key: &str, response_type: ResponseType) -> Option<Self> {
        match key.trim() {
            "enhanced" => Some(SearchMode::Enhanced(response_type)),
            "clinical" => Some(SearchMode::ClinicalEnhanced(response_type)),
            "standard" => Some(SearchMode::Standard),
            _ => None,
        }
    }

    pub fn endpoint(self) -> Endpoint {
        match self {
            SearchMode::Semantic | SearchMode::Keyword | SearchMode::Hybrid | SearchMode::Standard => {
                Endpoint::Search
            }
            SearchMode::Clinical => Endpoint::SearchClinical,
            SearchMode::Enhanced(_) => Endpoint::SearchEnhanced,
            SearchMode::ClinicalEnhanced(_) => Endpoint::ClinicalSearchEnhanced,
        }
    }

    fn search_type(self) -> Option<&'static str> {
        match self {
            SearchMode::Semantic => Some("semantic"),
            SearchMode::Keyword => Some("keyword"),
            SearchMode::Hybrid => Some("hybrid"),
            _ => None,
        }
    }

    /// Request body for this mode.
    pub fn body(self, query: &str, top_k: u32) -> SearchBody {
        let query = query.trim().to_string();
        match self {
            SearchMode::Semantic | SearchMode::Keyword | SearchMode::Hybrid | SearchMode::Standard => {
                SearchBody::Query {
                    query,
                    search_type: self.search_type(),
                    top_k,
                }
            }
            SearchMode::Clinical => SearchBody::Question {
                question: query,
                top_k,
            },
            SearchMode::Enhanced(response_type) => SearchBody::EnhancedQuery {
                query,
                top_k,
                response_type,
            },
            SearchMode::ClinicalEnhanced(response_type) => SearchBody::EnhancedQuestion {
                question: query,
                top_k,
                response_type,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Search,
    SearchClinical,
    SearchEnhanced,
    ClinicalSearchEnhanced,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Search => "/search",
            Endpoint::SearchClinical => "/search/clinical",
            Endpoint::SearchEnhanced => "/search/enhanced",
            Endpoint::ClinicalSearchEnhanced => "/clinical-search/enhanced",
        }
    }

    /// Whether this endpoint answers with a synthesized answer rather than a result list.
    pub fn is_synthesized(self) -> bool {
        matches!(self, Endpoint::SearchEnhanced | Endpoint::ClinicalSearchEnhanced)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SearchBody {
    Query {
        query: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        search_type: Option<&'static str>,
        top_k: u32,
    },
    Question {
        question: String,
        top_k: u32,
    },
    EnhancedQuery {
        query: String,
        top_k: u32,
        response_type: ResponseType,
    },
    EnhancedQuestion {
        question: String,
        top_k: u32,
        response_type: ResponseType,
    },
}

/// A fully resolved search call.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub mode: SearchMode,
    pub query: String,
    pub top_k: u32,
}

impl SearchRequest {
    pub fn new(mode: SearchMode, query: &str, top_k: u32) -> Self {
        Self {
            mode,
            query: query.to_string(),
            top_k: normalize_top_k(top_k),
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        self.mode.endpoint()
    }

    pub fn body(&self) -> SearchBody {
        self.mode.body(&self.query, self.top_k)
    }
}

/// Decoded search response, tagged by the endpoint that produced it.
#[derive(Debug, Clone)]
pub enum SearchOutcome {
    Results(SearchResponse),
    Synthesized(SynthesizedResponse),
}

impl SearchOutcome {
    /// Number of items the page will list (citations for synthesized answers).
    pub fn item_count(&self) -> usize {
        match self {
            SearchOutcome::Results(r) => r.results.len(),
            SearchOutcome::Synthesized(s) => {
                if s.citations.is_empty() {
                    s.results.len()
                } else {
                    s.citations.len()
                }
            }
        }
    }

    /// True when the call succeeded but returned nothing to show.
    pub fn is_empty(&self) -> bool {
        match self {
            SearchOutcome::Results(r) => r.results.is_empty(),
            SearchOutcome::Synthesized(s) => {
                s.synthesized_answer.as_deref().map_or(true, |a| a.trim().is_empty())
                    && s.citations.is_empty()
                    && s.results.is_empty()
            }
        }
    }
}
