use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_top_k() -> usize {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    // Echoed by this service, but a minimal reply without it still parses
    #[serde(default)]
    pub query: String,
    pub summary: String,
    pub results: BTreeMap<String, Vec<PageMatch>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageMatch {
    pub page_no: usize,
    pub score: f64,
    pub text_snippet: String,
    // Convenience for direct consumers; the client derives links itself
    #[serde(default)]
    pub pdf_link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub indexed_pages: usize,
}

/// A reply body is either an error or a result set, never both; the error shape is tried
/// first so the renderer can short-circuit on it.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SearchReply {
    Error(ErrorResponse),
    Results(SearchResponse),
}
