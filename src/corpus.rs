use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::DocumentSpec;

/// One page of extracted text from a reference document. Page numbers are 1-based so they can
/// be used directly in `#page=N` viewer fragments.
#[derive(Debug, Clone)]
pub struct PageText {
    pub doc_key: String,
    pub page_no: usize,
    pub text: String,
}

/// Extracted text for a document lives next to its PDF, with the same stem and a `.txt`
/// extension (`PMBOK7.pdf` -> `PMBOK7.txt`). Pages are separated by form feeds, which is what
/// `pdftotext` emits.
pub fn text_file_for(corpus_dir: &Path, spec: &DocumentSpec) -> PathBuf {
    let stem = Path::new(&spec.pdf_file)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| spec.pdf_file.clone());
    corpus_dir.join(format!("{stem}.txt"))
}

/// Splits extracted text into per-page strings and collapses whitespace within each page.
pub fn split_pages(raw: &str) -> Vec<String> {
    let mut pages: Vec<String> = raw
        .split('\u{c}')
        .map(|page| page.split_whitespace().collect::<Vec<&str>>().join(" "))
        .collect();
    // pdftotext terminates the last page with a form feed too, leaving a trailing empty chunk
    if pages.len() > 1 && pages.last().is_some_and(|p| p.is_empty()) {
        pages.pop();
    }
    pages
}

/// Loads every registered document's page text. A document whose text file is missing is kept
/// in the registry but contributes no pages, so searches report it with an empty match list
/// instead of failing outright.
pub fn load_corpus(corpus_dir: &Path, documents: &[DocumentSpec]) -> Result<Vec<PageText>> {
    let mut pages = Vec::new();
    for spec in documents {
        let path = text_file_for(corpus_dir, spec);
        if !path.exists() {
            tracing::warn!(doc = %spec.key, path = %path.display(), "corpus text not found");
            continue;
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read corpus text {}", path.display()))?;
        let doc_pages = split_pages(&raw);
        tracing::info!(doc = %spec.key, pages = doc_pages.len(), "loaded corpus text");
        for (i, text) in doc_pages.into_iter().enumerate() {
            pages.push(PageText {
                doc_key: spec.key.clone(),
                page_no: i + 1,
                text,
            });
        }
    }
    Ok(pages)
}
