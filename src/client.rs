use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

use crate::api::models::{SearchReply, SearchRequest, SearchResponse};
use crate::config::DocumentMap;
use crate::view::SearchView;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Request/response transport to the search service. The HTTP implementation is swapped out
/// for a stub in tests.
#[allow(async_fn_in_trait)]
pub trait SearchBackend {
    async fn search(&self, request: &SearchRequest) -> Result<SearchReply, TransportError>;
}

pub struct HttpBackend {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpBackend {
    pub fn new(endpoint: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
        }
    }
}

impl SearchBackend for HttpBackend {
    /// Posts the request and parses whatever body comes back, success status or not; the
    /// service reports its own errors through the `error` field.
    async fn search(&self, request: &SearchRequest) -> Result<SearchReply, TransportError> {
        let response = self.http.post(&self.endpoint).json(request).send().await?;
        let body = response.bytes().await?;
        let reply = serde_json::from_slice::<SearchReply>(&body)?;
        Ok(reply)
    }
}

/// Orchestrates one search interaction: validate input, call the service, render the outcome
/// through the injected view.
///
/// Re-entrant submissions are serialized by a generation counter: every submission bumps it,
/// and a submission that finds itself stale after its response arrives leaves the view alone,
/// so a slow earlier response can never overwrite a newer one.
pub struct QueryController<B: SearchBackend, V: SearchView> {
    backend: B,
    view: V,
    docs: DocumentMap,
    top_k: usize,
    generation: AtomicU64,
}

impl<B: SearchBackend, V: SearchView> QueryController<B, V> {
    pub fn new(backend: B, view: V, docs: DocumentMap, top_k: usize) -> Self {
        Self {
            backend,
            view,
            docs,
            top_k,
            generation: AtomicU64::new(0),
        }
    }

    pub async fn submit_query(&self, raw: &str) {
        let query = raw.trim();
        if query.is_empty() {
            self.view.alert("Please enter a query");
            return;
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.view.set_loading(true);
        self.view.clear_results();
        self.view.hide_summary();

        let request = SearchRequest {
            query: query.to_string(),
            top_k: self.top_k,
        };
        let outcome = self.backend.search(&request).await;

        // A newer submission owns the view now, loading indicator included
        if self.generation.load(Ordering::SeqCst) != generation {
            return;
        }

        match outcome {
            Ok(SearchReply::Error(err)) => {
                self.view.error_block(&format!("Error: {}", err.error));
            }
            Ok(SearchReply::Results(response)) => {
                self.render_results(&response);
            }
            Err(err) => {
                self.view.error_block(&format!("Request failed: {err}"));
            }
        }

        self.view.set_loading(false);
    }

    fn render_results(&self, response: &SearchResponse) {
        self.view.show_summary(&response.summary);
        for (doc_key, matches) in &response.results {
            self.view.begin_document(doc_key);
            if matches.is_empty() {
                self.view.no_matches();
                continue;
            }
            for m in matches {
                let label = format!("Open page {}", m.page_no);
                let href = self.docs.page_href(doc_key, m.page_no);
                self.view.match_entry(&m.text_snippet, &label, &href, m.score);
            }
        }
    }
}
