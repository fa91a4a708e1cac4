use anyhow::{Context, Result};
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

/// One registered reference document: a stable key used in queries and responses, and the PDF
/// file (relative to the corpus directory) that page links point into.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentSpec {
    pub key: String,
    pub pdf_file: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub corpus_dir: PathBuf,
    pub search_endpoint: String,
    pub default_top_k: usize,
    pub documents: Vec<DocumentSpec>,
}

impl Config {
    pub fn from_env() -> Result<Config> {
        dotenv().ok(); // Load .env file if present

        let documents = match env::var("DOCS_MANIFEST") {
            Ok(path) => load_manifest(&path)?,
            Err(_) => default_documents(),
        };

        let default_top_k = get_env_or_default("TOP_K", "3")
            .parse::<usize>()
            .context("TOP_K must be a positive integer")?;

        Ok(Config {
            bind_addr: get_env_or_default("BIND_ADDR", "127.0.0.1:5000"),
            corpus_dir: PathBuf::from(get_env_or_default("CORPUS_DIR", "site")),
            search_endpoint: get_env_or_default(
                "SEARCH_ENDPOINT",
                "http://127.0.0.1:5000/api/search",
            ),
            default_top_k,
            documents,
        })
    }
}

/// The built-in registry: the three reference texts the tool ships with.
pub fn default_documents() -> Vec<DocumentSpec> {
    vec![
        DocumentSpec {
            key: "PMBOK".to_string(),
            pdf_file: "PMBOK7.pdf".to_string(),
        },
        DocumentSpec {
            key: "PRINCE2".to_string(),
            pdf_file: "PRINCE2.pdf".to_string(),
        },
        DocumentSpec {
            key: "ISO21500".to_string(),
            pdf_file: "ISO21500.pdf".to_string(),
        },
    ]
}

/// Loads a JSON manifest (`[{ "key": "...", "pdf_file": "..." }, ...]`) so new documents can be
/// registered without a code change.
fn load_manifest(path: &str) -> Result<Vec<DocumentSpec>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read document manifest {path}"))?;
    let documents: Vec<DocumentSpec> =
        serde_json::from_str(&raw).with_context(|| format!("invalid document manifest {path}"))?;
    anyhow::ensure!(!documents.is_empty(), "document manifest {path} is empty");
    Ok(documents)
}

fn get_env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Maps document keys to the PDF files that page links open. Keys that were never registered
/// fall back to the last registered document's file, which for the default registry means
/// `ISO21500.pdf`.
#[derive(Debug, Clone)]
pub struct DocumentMap {
    entries: Vec<DocumentSpec>,
    fallback: String,
}

impl DocumentMap {
    pub fn new(entries: Vec<DocumentSpec>, fallback: impl Into<String>) -> Self {
        Self {
            entries,
            fallback: fallback.into(),
        }
    }

    pub fn from_specs(specs: &[DocumentSpec]) -> Self {
        let fallback = specs
            .last()
            .map(|s| s.pdf_file.clone())
            .unwrap_or_else(|| "ISO21500.pdf".to_string());
        Self::new(specs.to_vec(), fallback)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|s| s.key.as_str())
    }

    pub fn pdf_for(&self, doc_key: &str) -> &str {
        self.entries
            .iter()
            .find(|s| s.key == doc_key)
            .map(|s| s.pdf_file.as_str())
            .unwrap_or(self.fallback.as_str())
    }

    /// Builds the `<file>#page=N` fragment link a PDF viewer understands.
    pub fn page_href(&self, doc_key: &str, page_no: usize) -> String {
        format!("{}#page={}", self.pdf_for(doc_key), page_no)
    }
}
