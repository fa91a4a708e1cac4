use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;

use refsearch::analyzer::TextAnalyzer;
use refsearch::api;
use refsearch::client::{HttpBackend, QueryController};
use refsearch::config::{Config, DocumentMap};
use refsearch::corpus;
use refsearch::indexer::TfIdfIndex;
use refsearch::query_engine::QueryEngine;
use refsearch::view::ConsoleView;

#[derive(Parser)]
#[command(name = "refsearch", about = "Page-level search across local reference PDFs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index the corpus and serve the search API
    Serve,
    /// Send one query to a running server and print the results
    Query {
        text: String,
        /// Matches to return per document
        #[arg(long)]
        top_k: Option<usize>,
        /// Search endpoint, overriding SEARCH_ENDPOINT
        #[arg(long)]
        endpoint: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber (handles both tracing and log crate)
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Command::Serve => serve(config).await,
        Command::Query {
            text,
            top_k,
            endpoint,
        } => run_query(config, text, top_k, endpoint).await,
    }
}

async fn serve(config: Config) -> Result<()> {
    let pages = corpus::load_corpus(&config.corpus_dir, &config.documents)?;
    let analyzer = TextAnalyzer::standard();
    let index = TfIdfIndex::build(&analyzer, pages)?;
    tracing::info!(
        "Indexed {} pages across {} documents",
        index.len(),
        config.documents.len()
    );

    let docs = DocumentMap::from_specs(&config.documents);
    let engine = Arc::new(QueryEngine::new(index, analyzer, docs));
    let router = api::create_router(engine, &config.corpus_dir);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Listening on {}", config.bind_addr);
    axum::serve(listener, router).await?;
    Ok(())
}

async fn run_query(
    config: Config,
    text: String,
    top_k: Option<usize>,
    endpoint: Option<String>,
) -> Result<()> {
    let backend = HttpBackend::new(endpoint.unwrap_or(config.search_endpoint));
    let docs = DocumentMap::from_specs(&config.documents);
    let controller = QueryController::new(
        backend,
        ConsoleView,
        docs,
        top_k.unwrap_or(config.default_top_k),
    );
    controller.submit_query(&text).await;
    Ok(())
}
