use anyhow::Result;
use std::collections::{BTreeMap, HashMap};

use crate::analyzer::{TextAnalyzer, TextToken};
use crate::corpus::PageText;

/// Terms that appear in more than this share of pages carry no signal (boilerplate headers,
/// running footers) and are dropped from the vocabulary.
const MAX_DF_RATIO: f64 = 0.9;

/// One indexed page: its provenance plus an L2-normalized sparse tf-idf vector, sorted by
/// term id so scoring is a linear merge.
#[derive(Debug, Clone)]
pub struct IndexedPage {
    pub doc_key: String,
    pub page_no: usize,
    pub text: String,
    vector: Vec<(u32, f64)>,
}

/// In-memory tf-idf index over every page of every registered document.
///
/// Build:
/// ```text
///     for each page: analyze -> term counts
///     df[term] = number of pages containing term
///     vocabulary = terms with df / N <= MAX_DF_RATIO
///     idf[term] = ln((1 + N) / (1 + df)) + 1        (smoothed)
///     page vector = tf * idf, L2-normalized
/// ```
/// With normalized vectors, cosine similarity against a normalized query vector is a plain
/// dot product.
pub struct TfIdfIndex {
    vocabulary: HashMap<String, u32>,
    idf: Vec<f64>,
    pages: Vec<IndexedPage>,
    doc_pages: BTreeMap<String, Vec<usize>>,
}

impl TfIdfIndex {
    pub fn build(analyzer: &TextAnalyzer, pages: Vec<PageText>) -> Result<TfIdfIndex> {
        let total_pages = pages.len();
        log::info!("Building tf-idf index over {} pages", total_pages);

        // First pass: per-page term counts and corpus-wide document frequencies
        let mut page_counts: Vec<HashMap<String, usize>> = Vec::with_capacity(total_pages);
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        for page in &pages {
            let tokens = analyzer.analyze(page.text.clone())?;
            let counts = term_counts(&tokens);
            for term in counts.keys() {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            page_counts.push(counts);
        }

        // Vocabulary, minus terms present on nearly every page
        let mut vocabulary: HashMap<String, u32> = HashMap::new();
        let mut idf: Vec<f64> = Vec::new();
        let mut dropped = 0usize;
        for (term, df) in &doc_freq {
            if total_pages > 0 && *df as f64 / total_pages as f64 > MAX_DF_RATIO {
                dropped += 1;
                continue;
            }
            let term_id = vocabulary.len() as u32;
            vocabulary.insert(term.clone(), term_id);
            idf.push(smoothed_idf(total_pages, *df));
        }
        log::info!(
            "Vocabulary: {} terms ({} dropped by max-df cutoff)",
            vocabulary.len(),
            dropped
        );

        // Second pass: weighted, normalized page vectors
        let mut indexed = Vec::with_capacity(total_pages);
        let mut doc_pages: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (page, counts) in pages.into_iter().zip(page_counts) {
            let mut vector: Vec<(u32, f64)> = counts
                .iter()
                .filter_map(|(term, count)| {
                    vocabulary
                        .get(term)
                        .map(|&id| (id, *count as f64 * idf[id as usize]))
                })
                .collect();
            vector.sort_by_key(|&(id, _)| id);
            l2_normalize(&mut vector);

            doc_pages
                .entry(page.doc_key.clone())
                .or_default()
                .push(indexed.len());
            indexed.push(IndexedPage {
                doc_key: page.doc_key,
                page_no: page.page_no,
                text: page.text,
                vector,
            });
        }

        Ok(TfIdfIndex {
            vocabulary,
            idf,
            pages: indexed,
            doc_pages,
        })
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn page(&self, idx: usize) -> &IndexedPage {
        &self.pages[idx]
    }

    /// Page indices belonging to one document, in page order. Unknown documents own no pages.
    pub fn pages_of(&self, doc_key: &str) -> &[usize] {
        self.doc_pages
            .get(doc_key)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Weights query tokens with the corpus idf and normalizes, mirroring the page vectors.
    /// Terms outside the vocabulary contribute nothing.
    pub fn query_vector(&self, tokens: &[TextToken]) -> Vec<(u32, f64)> {
        let mut counts: HashMap<u32, usize> = HashMap::new();
        for token in tokens {
            if let Some(&id) = self.vocabulary.get(&token.term) {
                *counts.entry(id).or_insert(0) += 1;
            }
        }
        let mut vector: Vec<(u32, f64)> = counts
            .into_iter()
            .map(|(id, count)| (id, count as f64 * self.idf[id as usize]))
            .collect();
        vector.sort_by_key(|&(id, _)| id);
        l2_normalize(&mut vector);
        vector
    }

    /// Cosine similarity of the query vector against every page, indexed by page position.
    pub fn score_pages(&self, query_vector: &[(u32, f64)]) -> Vec<f64> {
        self.pages
            .iter()
            .map(|page| dot_sorted(query_vector, &page.vector))
            .collect()
    }
}

fn term_counts(tokens: &[TextToken]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for token in tokens {
        *counts.entry(token.term.clone()).or_insert(0) += 1;
    }
    counts
}

fn smoothed_idf(total_pages: usize, df: usize) -> f64 {
    ((1.0 + total_pages as f64) / (1.0 + df as f64)).ln() + 1.0
}

fn l2_normalize(vector: &mut [(u32, f64)]) {
    let norm = vector.iter().map(|&(_, w)| w * w).sum::<f64>().sqrt();
    if norm > 0.0 {
        for (_, w) in vector.iter_mut() {
            *w /= norm;
        }
    }
}

/// Dot product of two sparse vectors sorted by term id.
pub fn dot_sorted(a: &[(u32, f64)], b: &[(u32, f64)]) -> f64 {
    let (mut ai, mut bi) = (0usize, 0usize);
    let mut sum = 0.0;
    while ai < a.len() && bi < b.len() {
        match a[ai].0.cmp(&b[bi].0) {
            std::cmp::Ordering::Equal => {
                sum += a[ai].1 * b[bi].1;
                ai += 1;
                bi += 1;
            }
            std::cmp::Ordering::Less => ai += 1,
            std::cmp::Ordering::Greater => bi += 1,
        }
    }
    sum
}

#[test]
fn test_dot_sorted() {
    {
        let a = vec![(1u32, 0.5), (3, 0.5), (7, 0.5)];
        let b = vec![(3u32, 2.0), (8, 1.0)];
        assert!((dot_sorted(&a, &b) - 1.0).abs() < 1e-12);
    }

    {
        let a = vec![(1u32, 1.0), (2, 1.0)];
        let b = vec![(3u32, 1.0), (4, 1.0)];
        assert_eq!(dot_sorted(&a, &b), 0.0);
    }

    {
        let a: Vec<(u32, f64)> = vec![];
        let b = vec![(0u32, 1.0)];
        assert_eq!(dot_sorted(&a, &b), 0.0);
    }
}

#[test]
fn test_l2_normalize() {
    let mut v = vec![(0u32, 3.0), (1, 4.0)];
    l2_normalize(&mut v);
    assert!((v[0].1 - 0.6).abs() < 1e-12);
    assert!((v[1].1 - 0.8).abs() < 1e-12);

    // All-zero vectors stay untouched instead of dividing by zero
    let mut z = vec![(0u32, 0.0)];
    l2_normalize(&mut z);
    assert_eq!(z[0].1, 0.0);
}
