use anyhow::Result;
use std::collections::BTreeMap;
use std::collections::HashSet;

use crate::analyzer::TextAnalyzer;
use crate::config::DocumentMap;
use crate::indexer::TfIdfIndex;

const SNIPPET_CHARS: usize = 600;
const SUMMARY_EXCERPT_CHARS: usize = 200;

/// One retrieved page-level hit within a document.
#[derive(Debug, Clone)]
pub struct PageHit {
    pub page_no: usize,
    pub score: f64,
    pub text_snippet: String,
    pub pdf_link: String,
}

/// Per-document hits plus the synthesized comparative summary.
#[derive(Debug, Clone)]
pub struct SearchOutput {
    pub results: BTreeMap<String, Vec<PageHit>>,
    pub summary: String,
}

pub struct QueryEngine {
    index: TfIdfIndex,
    analyzer: TextAnalyzer,
    docs: DocumentMap,
}

impl QueryEngine {
    pub fn new(index: TfIdfIndex, analyzer: TextAnalyzer, docs: DocumentMap) -> Self {
        Self {
            index,
            analyzer,
            docs,
        }
    }

    pub fn indexed_pages(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Scores every page against the query and returns, for each registered document, its
    /// `top_k` best pages. Documents with no indexed pages get an empty hit list rather than
    /// disappearing from the response.
    pub fn search(&self, query: &str, top_k: usize) -> Result<SearchOutput> {
        let tokens = self.analyzer.analyze(query.to_string())?;
        let query_vector = self.index.query_vector(&tokens);
        let scores = self.index.score_pages(&query_vector);

        let mut results: BTreeMap<String, Vec<PageHit>> = BTreeMap::new();
        let mut summary_snippets: BTreeMap<String, String> = BTreeMap::new();

        for doc_key in self.docs.keys() {
            let page_indices = self.index.pages_of(doc_key);
            if page_indices.is_empty() {
                results.insert(doc_key.to_string(), Vec::new());
                continue;
            }

            let ranked = top_k_desc(&scores, page_indices, top_k);
            let hits: Vec<PageHit> = ranked
                .into_iter()
                .map(|page_idx| {
                    let page = self.index.page(page_idx);
                    PageHit {
                        page_no: page.page_no,
                        score: round4(scores[page_idx]),
                        text_snippet: truncate_chars(&page.text, SNIPPET_CHARS),
                        pdf_link: self.docs.page_href(doc_key, page.page_no),
                    }
                })
                .collect();

            let joined = hits
                .iter()
                .map(|h| h.text_snippet.as_str())
                .collect::<Vec<&str>>()
                .join(" ");
            summary_snippets.insert(doc_key.to_string(), joined);
            results.insert(doc_key.to_string(), hits);
        }

        let summary = synthesize_summary(query, &summary_snippets);
        Ok(SearchOutput { results, summary })
    }
}

/// Picks the `k` highest-scoring entries of `candidates`, ties broken by page order so the
/// ranking is deterministic.
fn top_k_desc(scores: &[f64], candidates: &[usize], k: usize) -> Vec<usize> {
    let mut ranked: Vec<usize> = candidates.to_vec();
    ranked.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.cmp(&b))
    });
    ranked.truncate(k);
    ranked
}

/// Char-boundary-safe truncation with a `...` marker, so multi-byte text never splits a
/// code point.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

fn round4(score: f64) -> f64 {
    (score * 10_000.0).round() / 10_000.0
}

/// Simple comparative summary: rank documents by how many query words their best snippets
/// contain, then quote a short excerpt from each.
fn synthesize_summary(query: &str, snippets_for_doc: &BTreeMap<String, String>) -> String {
    let query_tokens: HashSet<String> = query
        .split_whitespace()
        .filter(|t| t.len() > 2)
        .map(|t| t.to_lowercase())
        .collect();

    let mut ranked: Vec<(&String, usize)> = snippets_for_doc
        .iter()
        .map(|(doc, text)| {
            let overlap = text
                .split_whitespace()
                .map(|w| {
                    w.trim_matches(|c: char| matches!(c, '.' | ',' | '(' | ')'))
                        .to_lowercase()
                })
                .filter(|w| w.len() > 2)
                .collect::<HashSet<String>>()
                .intersection(&query_tokens)
                .count();
            (doc, overlap)
        })
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let mut lines = vec![format!("Comparative summary for query: \u{201c}{query}\u{201d}.")];
    if ranked.first().is_some_and(|(_, overlap)| *overlap > 0) {
        let doc_list = ranked
            .iter()
            .map(|(doc, _)| doc.as_str())
            .collect::<Vec<&str>>()
            .join(", ");
        lines.push(format!("Documents with strongest relevance: {doc_list}."));
    } else {
        lines.push(
            "No clear dominant document found; all provide contextual relevance.".to_string(),
        );
    }

    for (doc, _) in &ranked {
        let snippet = snippets_for_doc.get(*doc).map(String::as_str).unwrap_or("");
        if !snippet.trim().is_empty() {
            let short = truncate_chars(snippet, SUMMARY_EXCERPT_CHARS);
            lines.push(format!("{doc}: {short}"));
        }
    }

    lines.push("Note: Click on the document links to view the relevant PDF pages.".to_string());
    lines.join(" ")
}

#[test]
fn test_top_k_desc() {
    let scores = vec![0.1, 0.9, 0.0, 0.5, 0.9];
    {
        let got = top_k_desc(&scores, &[0, 1, 2, 3, 4], 3);
        // 1 before 4: equal scores fall back to page order
        assert_eq!(got, vec![1, 4, 3]);
    }
    {
        let got = top_k_desc(&scores, &[2, 3], 5);
        assert_eq!(got, vec![3, 2]);
    }
    {
        let got: Vec<usize> = top_k_desc(&scores, &[], 3);
        assert!(got.is_empty());
    }
}

#[test]
fn test_truncate_chars() {
    assert_eq!(truncate_chars("short", 600), "short");
    let long = "x".repeat(601);
    let cut = truncate_chars(&long, 600);
    assert_eq!(cut.chars().count(), 603);
    assert!(cut.ends_with("..."));

    // Multi-byte input must not panic on a char boundary
    let accented = "é".repeat(10);
    assert_eq!(truncate_chars(&accented, 4), format!("{}...", "é".repeat(4)));
}

#[test]
fn test_round4() {
    assert_eq!(round4(0.123456), 0.1235);
    assert_eq!(round4(0.0), 0.0);
    assert_eq!(round4(1.0), 1.0);
}
