use axum::{
    Router,
    routing::{get, post},
};
use std::path::Path;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};

use crate::query_engine::QueryEngine;

pub mod handlers;
pub mod models;

pub fn create_router(query_engine: Arc<QueryEngine>, corpus_dir: &Path) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // API routes
        .route("/api/search", post(handlers::search_handler))
        .route("/api/health", get(handlers::health_handler))
        .with_state(query_engine)
        // The PDFs live in the corpus directory; serving it makes `#page=N` links resolve
        .nest_service("/", ServeDir::new(corpus_dir))
        .layer(cors)
}
