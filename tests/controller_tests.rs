use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use refsearch::api::models::{ErrorResponse, PageMatch, SearchReply, SearchRequest, SearchResponse};
use refsearch::client::{QueryController, SearchBackend, TransportError};
use refsearch::config::{DocumentMap, default_documents};
use refsearch::view::SearchView;

mod test_helpers {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Event {
        Alert(String),
        Loading(bool),
        ClearResults,
        ShowSummary(String),
        HideSummary,
        BeginDocument(String),
        NoMatches,
        MatchEntry {
            snippet: String,
            label: String,
            href: String,
            score: f64,
        },
        ErrorBlock(String),
    }

    /// Records every view call so tests can assert on the exact render sequence.
    #[derive(Clone, Default)]
    pub struct RecordingView {
        events: Arc<Mutex<Vec<Event>>>,
    }

    impl RecordingView {
        pub fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }

        fn push(&self, event: Event) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl SearchView for RecordingView {
        fn alert(&self, message: &str) {
            self.push(Event::Alert(message.to_string()));
        }

        fn set_loading(&self, visible: bool) {
            self.push(Event::Loading(visible));
        }

        fn clear_results(&self) {
            self.push(Event::ClearResults);
        }

        fn show_summary(&self, summary: &str) {
            self.push(Event::ShowSummary(summary.to_string()));
        }

        fn hide_summary(&self) {
            self.push(Event::HideSummary);
        }

        fn begin_document(&self, name: &str) {
            self.push(Event::BeginDocument(name.to_string()));
        }

        fn no_matches(&self) {
            self.push(Event::NoMatches);
        }

        fn match_entry(&self, snippet: &str, link_label: &str, href: &str, score: f64) {
            self.push(Event::MatchEntry {
                snippet: snippet.to_string(),
                label: link_label.to_string(),
                href: href.to_string(),
                score,
            });
        }

        fn error_block(&self, text: &str) {
            self.push(Event::ErrorBlock(text.to_string()));
        }
    }

    /// Hands out canned replies in order and counts calls.
    pub struct StubBackend {
        replies: Mutex<VecDeque<Result<SearchReply, TransportError>>>,
        pub calls: Arc<AtomicUsize>,
        pub last_request: Arc<Mutex<Option<SearchRequest>>>,
    }

    impl StubBackend {
        pub fn new(replies: Vec<Result<SearchReply, TransportError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().collect()),
                calls: Arc::new(AtomicUsize::new(0)),
                last_request: Arc::new(Mutex::new(None)),
            }
        }
    }

    impl SearchBackend for StubBackend {
        async fn search(&self, request: &SearchRequest) -> Result<SearchReply, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("no stubbed reply left")
        }
    }

    pub fn page_match(page_no: usize, score: f64, snippet: &str) -> PageMatch {
        PageMatch {
            page_no,
            score,
            text_snippet: snippet.to_string(),
            pdf_link: format!("ignored-by-client#page={page_no}"),
        }
    }

    pub fn results_reply(summary: &str, results: Vec<(&str, Vec<PageMatch>)>) -> SearchReply {
        let results: BTreeMap<String, Vec<PageMatch>> = results
            .into_iter()
            .map(|(doc, matches)| (doc.to_string(), matches))
            .collect();
        SearchReply::Results(SearchResponse {
            query: "q".to_string(),
            summary: summary.to_string(),
            results,
        })
    }

    pub fn error_reply(message: &str) -> SearchReply {
        SearchReply::Error(ErrorResponse {
            error: message.to_string(),
        })
    }

    pub fn decode_error() -> TransportError {
        TransportError::Decode(serde_json::from_str::<serde_json::Value>("<!doctype html>").unwrap_err())
    }

    pub fn default_map() -> DocumentMap {
        DocumentMap::from_specs(&default_documents())
    }
}

use test_helpers::*;

#[tokio::test]
async fn test_empty_query_never_calls_backend() {
    let backend = StubBackend::new(vec![]);
    let calls = backend.calls.clone();
    let view = RecordingView::default();
    let controller = QueryController::new(backend, view.clone(), default_map(), 3);

    controller.submit_query("").await;
    controller.submit_query("   \t\n  ").await;

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    let events = view.events();
    assert_eq!(
        events,
        vec![
            Event::Alert("Please enter a query".to_string()),
            Event::Alert("Please enter a query".to_string()),
        ]
    );
    // Loading indicator never touched
    assert!(!events.iter().any(|e| matches!(e, Event::Loading(_))));
}

#[tokio::test]
async fn test_successful_response_renders_summary_and_links() {
    let backend = StubBackend::new(vec![Ok(results_reply(
        "S",
        vec![("PMBOK", vec![page_match(12, 0.91, "Risk...")])],
    ))]);
    let last_request = backend.last_request.clone();
    let view = RecordingView::default();
    let controller = QueryController::new(backend, view.clone(), default_map(), 3);

    controller.submit_query("  risk management  ").await;

    let request = last_request.lock().unwrap().clone().unwrap();
    assert_eq!(request.query, "risk management");
    assert_eq!(request.top_k, 3);

    assert_eq!(
        view.events(),
        vec![
            Event::Loading(true),
            Event::ClearResults,
            Event::HideSummary,
            Event::ShowSummary("S".to_string()),
            Event::BeginDocument("PMBOK".to_string()),
            Event::MatchEntry {
                snippet: "Risk...".to_string(),
                label: "Open page 12".to_string(),
                href: "PMBOK7.pdf#page=12".to_string(),
                score: 0.91,
            },
            Event::Loading(false),
        ]
    );
}

#[tokio::test]
async fn test_empty_match_list_renders_placeholder_only() {
    let backend = StubBackend::new(vec![Ok(results_reply(
        "S",
        vec![("PRINCE2", vec![])],
    ))]);
    let view = RecordingView::default();
    let controller = QueryController::new(backend, view.clone(), default_map(), 3);

    controller.submit_query("themes").await;

    let events = view.events();
    assert!(events.contains(&Event::BeginDocument("PRINCE2".to_string())));
    assert!(events.contains(&Event::NoMatches));
    assert!(!events.iter().any(|e| matches!(e, Event::MatchEntry { .. })));
}

#[tokio::test]
async fn test_unknown_document_links_to_fallback_pdf() {
    let backend = StubBackend::new(vec![Ok(results_reply(
        "S",
        vec![("AGILEBOK", vec![page_match(7, 0.5, "snippet")])],
    ))]);
    let view = RecordingView::default();
    let controller = QueryController::new(backend, view.clone(), default_map(), 3);

    controller.submit_query("sprint").await;

    let href = view
        .events()
        .into_iter()
        .find_map(|e| match e {
            Event::MatchEntry { href, .. } => Some(href),
            _ => None,
        })
        .expect("expected a rendered match");
    assert_eq!(href, "ISO21500.pdf#page=7");
}

#[tokio::test]
async fn test_server_error_renders_single_block_and_no_summary() {
    let backend = StubBackend::new(vec![Ok(error_reply("backend down"))]);
    let view = RecordingView::default();
    let controller = QueryController::new(backend, view.clone(), default_map(), 3);

    controller.submit_query("risk").await;

    let events = view.events();
    let error_blocks: Vec<&Event> = events
        .iter()
        .filter(|e| matches!(e, Event::ErrorBlock(_)))
        .collect();
    assert_eq!(
        error_blocks,
        vec![&Event::ErrorBlock("Error: backend down".to_string())]
    );
    assert!(!events.iter().any(|e| matches!(e, Event::ShowSummary(_))));
    assert!(!events.iter().any(|e| matches!(e, Event::BeginDocument(_))));
    assert_eq!(events.last(), Some(&Event::Loading(false)));
}

#[tokio::test]
async fn test_transport_failure_renders_request_failed_block() {
    let backend = StubBackend::new(vec![Err(decode_error())]);
    let view = RecordingView::default();
    let controller = QueryController::new(backend, view.clone(), default_map(), 3);

    controller.submit_query("risk").await;

    let events = view.events();
    let message = events
        .iter()
        .find_map(|e| match e {
            Event::ErrorBlock(text) => Some(text.clone()),
            _ => None,
        })
        .expect("expected an error block");
    assert!(
        message.starts_with("Request failed:"),
        "unexpected message: {message}"
    );
    assert_eq!(events.last(), Some(&Event::Loading(false)));
}

#[tokio::test]
async fn test_loading_indicator_cleared_in_every_outcome() {
    let replies = vec![
        Ok(results_reply("S", vec![("PMBOK", vec![])])),
        Ok(error_reply("boom")),
        Err(decode_error()),
    ];
    let backend = StubBackend::new(replies);
    let view = RecordingView::default();
    let controller = QueryController::new(backend, view.clone(), default_map(), 3);

    controller.submit_query("one").await;
    controller.submit_query("two").await;
    controller.submit_query("three").await;

    let events = view.events();
    let shown = events.iter().filter(|e| **e == Event::Loading(true)).count();
    let hidden = events.iter().filter(|e| **e == Event::Loading(false)).count();
    assert_eq!(shown, 3);
    assert_eq!(hidden, 3);
}

mod racing {
    use super::*;
    use tokio::sync::Notify;

    /// First call parks until the second call has gone through, forcing the first response to
    /// arrive last.
    pub struct RacingBackend {
        gate: Notify,
        calls: AtomicUsize,
    }

    impl RacingBackend {
        pub fn new() -> Self {
            Self {
                gate: Notify::new(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl SearchBackend for RacingBackend {
        async fn search(&self, request: &SearchRequest) -> Result<SearchReply, TransportError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == 0 {
                self.gate.notified().await;
            } else {
                self.gate.notify_one();
            }
            Ok(results_reply(&format!("summary for {}", request.query), vec![]))
        }
    }

    #[tokio::test]
    async fn test_stale_response_does_not_overwrite_newer_submission() {
        let view = RecordingView::default();
        let controller =
            QueryController::new(RacingBackend::new(), view.clone(), default_map(), 3);

        // Both submissions run concurrently; the first one's response resolves last
        tokio::join!(
            controller.submit_query("old query"),
            controller.submit_query("new query"),
        );

        let events = view.events();
        let summaries: Vec<&Event> = events
            .iter()
            .filter(|e| matches!(e, Event::ShowSummary(_)))
            .collect();
        assert_eq!(
            summaries,
            vec![&Event::ShowSummary("summary for new query".to_string())]
        );
        // The stale submission never clears the newer one's loading state either
        let hidden = events.iter().filter(|e| **e == Event::Loading(false)).count();
        assert_eq!(hidden, 1);
    }
}
